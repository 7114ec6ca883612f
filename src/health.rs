//! Damage formula and the per-solid health state machine.
//!
//! `Alive → Fragmenting → Destroyed`.  The `is_fragmenting` latch is the only
//! guard against two contacts in the same tick both depleting a solid; every
//! path into fragmentation goes through [`begin_fragmenting`].

use crate::solid::{Solid, SolidState};
use bevy::prelude::*;

/// What the physics backend reports about the other side of a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionImpact {
    pub other_mass: f32,
    pub relative_velocity: Vec2,
    pub other_has_physics: bool,
}

impl CollisionImpact {
    pub fn with_body(other_mass: f32, relative_velocity: Vec2) -> Self {
        Self {
            other_mass,
            relative_velocity,
            other_has_physics: true,
        }
    }

    /// Contact with something that has no rigid body (ground, static scenery).
    pub fn static_contact(relative_velocity: Vec2) -> Self {
        Self {
            other_mass: 0.0,
            relative_velocity,
            other_has_physics: false,
        }
    }

    /// `mass × |v| × factor`, zero without a rigid body, never negative.
    pub fn damage(&self, damage_factor: f32) -> f32 {
        if !self.other_has_physics {
            return 0.0;
        }
        (self.other_mass * self.relative_velocity.length() * damage_factor).max(0.0)
    }

    /// Linear momentum of the other body; the goal's damage measure.
    pub fn momentum(&self) -> f32 {
        if !self.other_has_physics {
            return 0.0;
        }
        (self.other_mass * self.relative_velocity.length()).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageResult {
    /// Not alive; nothing applied.
    Ignored,
    /// Health reduced but still positive.
    Absorbed { damage: f32, remaining: f32 },
    /// Health reached zero or below.
    Depleted { damage: f32 },
}

/// Subtract `impact` damage from a live solid.
pub fn apply_damage(solid: &mut Solid, impact: &CollisionImpact) -> DamageResult {
    if solid.state != SolidState::Alive {
        return DamageResult::Ignored;
    }
    let damage = impact.damage(solid.constants.damage_factor);
    solid.health -= damage;
    if solid.health <= 0.0 {
        DamageResult::Depleted { damage }
    } else {
        DamageResult::Absorbed {
            damage,
            remaining: solid.health,
        }
    }
}

/// Set the latch and move to `Fragmenting`.  Returns `false` if the latch was
/// already set or the solid is no longer alive.
pub fn begin_fragmenting(solid: &mut Solid) -> bool {
    if solid.is_fragmenting || solid.state != SolidState::Alive {
        return false;
    }
    solid.is_fragmenting = true;
    solid.state = SolidState::Fragmenting;
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepletionAction {
    Fragment,
    /// Terminal fragment: destroyed without children.
    DestroyTerminal,
}

pub fn depletion_action(solid: &Solid) -> DepletionAction {
    if solid.is_fragment() && solid.split_level >= solid.constants.max_split_level {
        DepletionAction::DestroyTerminal
    } else {
        DepletionAction::Fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Material, StructureCatalog, StructureKind};
    use crate::solid::SolidId;

    fn wood_wall() -> Solid {
        let constants = *StructureCatalog::default()
            .entry(Material::Wood, StructureKind::Wall)
            .expect("wood wall");
        Solid {
            id: SolidId(0),
            name: "Wood_Wall".into(),
            material: Material::Wood,
            kind: StructureKind::Wall,
            split_level: 0,
            health: constants.health,
            volume: 1.5,
            constants,
            is_fragmenting: false,
            state: SolidState::Alive,
            parent: None,
            children: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn damage_is_mass_times_speed_times_factor() {
        let impact = CollisionImpact::with_body(20.0, Vec2::new(0.0, -6.0));
        assert_eq!(impact.damage(1.0), 120.0);
        assert_eq!(impact.damage(0.5), 60.0);
        assert_eq!(impact.damage(-1.0), 0.0);
        assert_eq!(impact.momentum(), 120.0);
    }

    #[test]
    fn static_contact_deals_nothing() {
        let impact = CollisionImpact::static_contact(Vec2::new(50.0, 0.0));
        assert_eq!(impact.damage(1.0), 0.0);
        assert_eq!(impact.momentum(), 0.0);
    }

    #[test]
    fn lethal_hit_depletes() {
        let mut wall = wood_wall();
        let hit = CollisionImpact::with_body(20.0, Vec2::new(6.0, 0.0));
        assert_eq!(apply_damage(&mut wall, &hit), DamageResult::Depleted { damage: 120.0 });
        assert_eq!(wall.health, -20.0);
    }

    #[test]
    fn small_hits_accumulate() {
        let mut wall = wood_wall();
        let tap = CollisionImpact::with_body(10.0, Vec2::new(4.0, 0.0));
        assert_eq!(
            apply_damage(&mut wall, &tap),
            DamageResult::Absorbed { damage: 40.0, remaining: 60.0 }
        );
        assert!(matches!(apply_damage(&mut wall, &tap), DamageResult::Absorbed { .. }));
        assert!(matches!(apply_damage(&mut wall, &tap), DamageResult::Depleted { .. }));
    }

    #[test]
    fn latch_sets_once() {
        let mut wall = wood_wall();
        assert!(begin_fragmenting(&mut wall));
        assert!(!begin_fragmenting(&mut wall));
        assert_eq!(wall.state, SolidState::Fragmenting);
        let hit = CollisionImpact::with_body(1.0, Vec2::X);
        assert_eq!(apply_damage(&mut wall, &hit), DamageResult::Ignored);
    }

    #[test]
    fn only_max_level_fragments_are_terminal() {
        let mut solid = wood_wall();
        assert_eq!(depletion_action(&solid), DepletionAction::Fragment);
        solid.split_level = solid.constants.max_split_level - 1;
        assert_eq!(depletion_action(&solid), DepletionAction::Fragment);
        solid.split_level = solid.constants.max_split_level;
        assert_eq!(depletion_action(&solid), DepletionAction::DestroyTerminal);
    }
}
