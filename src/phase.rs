//! Build / attack phases.
//!
//! Placement happens in `Build`; cannon fire, damage and the win check only
//! run in `Attack`.  Core code sees the phase through [`PhaseGate`] so it can
//! be driven from tests without a Bevy app.

use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GamePhase {
    #[default]
    Build,
    Attack,
}

/// Narrow view of the phase for damage gating.
pub trait PhaseGate {
    fn is_attack_phase_active(&self) -> bool;
}

impl PhaseGate for GamePhase {
    fn is_attack_phase_active(&self) -> bool {
        *self == GamePhase::Attack
    }
}

impl PhaseGate for bool {
    fn is_attack_phase_active(&self) -> bool {
        *self
    }
}

/// Player request to leave `Build` and start the attack.
#[derive(Message, Debug, Clone, Copy)]
pub struct StartAttack;

/// Moves to `Attack` on the first [`StartAttack`] received while building.
pub fn start_attack_system(
    mut requests: MessageReader<StartAttack>,
    phase: Res<State<GamePhase>>,
    mut next: ResMut<NextState<GamePhase>>,
) {
    if requests.read().count() == 0 || *phase.get() != GamePhase::Build {
        return;
    }
    info!("Build phase over; attack begins");
    next.set(GamePhase::Attack);
}
