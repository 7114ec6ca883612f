//! The defended goal and the win/lose decision.
//!
//! The goal loses health by the momentum of whatever hits it.  Once the attack
//! begins a [`WinCheck`] deadline is armed on the simulation clock; the goal
//! being destroyed before the deadline loses, surviving it wins.  Results are
//! pushed through an [`OutcomeSink`] so game-flow code never reaches into a
//! global manager.

use crate::config::DestructionConfig;
use crate::health::CollisionImpact;
use crate::phase::PhaseGate;
use bevy::prelude::*;

// ── Goal ──────────────────────────────────────────────────────────────────────

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Goal {
    pub health: f32,
    pub max_health: f32,
    /// Set by the first support contact of the attack phase.
    pub landed: bool,
}

/// What the goal touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSurface {
    /// Ground or a base structure it rests on.
    Support,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalHit {
    Ignored,
    Landed,
    Damaged { damage: f32, remaining: f32 },
    Destroyed,
}

impl Goal {
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            landed: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Resolve one contact.
    ///
    /// Support contacts are ignored while building, and the first one during
    /// the attack is the landing, which deals nothing.
    pub fn on_contact(
        &mut self,
        surface: ContactSurface,
        impact: &CollisionImpact,
        phase: &impl PhaseGate,
    ) -> GoalHit {
        if !self.is_alive() {
            return GoalHit::Ignored;
        }
        if surface == ContactSurface::Support {
            if !phase.is_attack_phase_active() {
                return GoalHit::Ignored;
            }
            if !self.landed {
                self.landed = true;
                return GoalHit::Landed;
            }
        }
        self.take_damage(impact.momentum())
    }

    pub fn take_damage(&mut self, damage: f32) -> GoalHit {
        self.health = (self.health - damage).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            GoalHit::Destroyed
        } else {
            GoalHit::Damaged {
                damage,
                remaining: self.health,
            }
        }
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        self.health / self.max_health
    }

    /// Green above half health, fading through yellow to red, half transparent.
    pub fn status_color(&self) -> Color {
        let p = self.health_fraction().clamp(0.0, 1.0);
        let (r, g) = if p > 0.5 {
            (1.0 - (p - 0.5) * 2.0, 1.0)
        } else {
            (1.0, p * 2.0)
        };
        Color::srgba(r, g, 0.0, 0.5)
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameOutcome {
    #[default]
    Pending,
    Won,
    Lost,
}

/// Emitted once when the round is decided.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalReport {
    pub goal: Entity,
    pub outcome: GameOutcome,
}

/// Where win/lose results go.
pub trait OutcomeSink {
    fn report_destroyed(&mut self, goal: Entity);
    fn report_survived(&mut self, goal: Entity);
}

impl OutcomeSink for MessageWriter<'_, GoalReport> {
    fn report_destroyed(&mut self, goal: Entity) {
        self.write(GoalReport {
            goal,
            outcome: GameOutcome::Lost,
        });
    }

    fn report_survived(&mut self, goal: Entity) {
        self.write(GoalReport {
            goal,
            outcome: GameOutcome::Won,
        });
    }
}

impl OutcomeSink for Vec<GoalReport> {
    fn report_destroyed(&mut self, goal: Entity) {
        self.push(GoalReport {
            goal,
            outcome: GameOutcome::Lost,
        });
    }

    fn report_survived(&mut self, goal: Entity) {
        self.push(GoalReport {
            goal,
            outcome: GameOutcome::Won,
        });
    }
}

// ── Win check ─────────────────────────────────────────────────────────────────

/// A single deferred decision on the simulation clock.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct WinCheck {
    pub deadline: Option<f32>,
    pub outcome: GameOutcome,
}

impl WinCheck {
    pub fn arm(&mut self, now: f32, delay: f32) {
        self.deadline = Some(now + delay);
        self.outcome = GameOutcome::Pending;
    }

    /// Decide if possible.  Returns the outcome only on the tick it is decided.
    pub fn poll(&mut self, now: f32, goal_alive: bool) -> Option<GameOutcome> {
        if self.outcome != GameOutcome::Pending {
            return None;
        }
        let deadline = self.deadline?;
        self.outcome = if !goal_alive {
            GameOutcome::Lost
        } else if now >= deadline {
            GameOutcome::Won
        } else {
            return None;
        };
        Some(self.outcome)
    }

    /// Poll and forward a decision about `goal` to `sink`.
    pub fn poll_into(
        &mut self,
        now: f32,
        goal: Entity,
        goal_alive: bool,
        sink: &mut impl OutcomeSink,
    ) -> Option<GameOutcome> {
        let outcome = self.poll(now, goal_alive)?;
        match outcome {
            GameOutcome::Lost => sink.report_destroyed(goal),
            GameOutcome::Won => sink.report_survived(goal),
            GameOutcome::Pending => {}
        }
        Some(outcome)
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// `OnEnter(Attack)`: start the countdown.
pub fn arm_win_check(time: Res<Time>, config: Res<DestructionConfig>, mut check: ResMut<WinCheck>) {
    check.arm(time.elapsed_secs(), config.win_check_delay_secs);
    info!(
        "Win check armed: goal must survive {:.1}s",
        config.win_check_delay_secs
    );
}

/// Polled every attack-phase tick.
pub fn poll_win_check(
    time: Res<Time>,
    mut check: ResMut<WinCheck>,
    goals: Query<(Entity, &Goal)>,
    mut reports: MessageWriter<GoalReport>,
) {
    let Some((entity, goal)) = goals
        .iter()
        .find(|(_, g)| !g.is_alive())
        .or_else(|| goals.iter().next())
    else {
        return;
    };
    match check.poll_into(time.elapsed_secs(), entity, goal.is_alive(), &mut reports) {
        Some(GameOutcome::Lost) => info!("Goal destroyed: round lost"),
        Some(GameOutcome::Won) => info!("Goal survived: round won"),
        _ => {}
    }
}

/// Tint every goal sprite by its health.
pub fn goal_color_system(mut goals: Query<(&Goal, &mut Sprite), Changed<Goal>>) {
    for (goal, mut sprite) in goals.iter_mut() {
        sprite.color = goal.status_color();
    }
}
