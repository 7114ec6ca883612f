//! [`DestructionWorld`]: the in-process API the game talks to.
//!
//! Owns the solid arena, the active configuration, the slicing backend and
//! the shared random source.  Everything that changes a solid's health or
//! existence goes through here; the Bevy layer only mirrors the results.

use crate::catalog::{Material, StructureKind};
use crate::config::DestructionConfig;
use crate::error::{DestructionError, SimResult};
use crate::geometry::estimate_volume;
use crate::health::{
    apply_damage, begin_fragmenting, depletion_action, CollisionImpact, DamageResult,
    DepletionAction,
};
use crate::phase::PhaseGate;
use crate::placement::PlacementRequest;
use crate::scheduler::{FragmentReport, SplitScheduler};
use crate::slicing::{ConvexSlicer, Slicer};
use crate::solid::{
    Body, MotionConstraints, RigidBodyParams, Solid, SolidArena, SolidEvent, SolidId, SolidState,
    VisualMaterial,
};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownSolid,
    NotAlive,
    /// Placed structures take no damage until the attack starts.
    BuildPhase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImpactOutcome {
    Ignored(IgnoreReason),
    Damaged { damage: f32, remaining: f32 },
    Fragmented(FragmentReport),
    /// Destroyed without a fragmentation pass.
    Destroyed,
}

#[derive(Resource)]
pub struct DestructionWorld {
    arena: SolidArena,
    config: DestructionConfig,
    slicer: Box<dyn Slicer>,
    rng: StdRng,
}

impl DestructionWorld {
    pub fn new(config: DestructionConfig) -> Self {
        Self::with_slicer(config, ConvexSlicer)
    }

    pub fn with_slicer(config: DestructionConfig, slicer: impl Slicer + 'static) -> Self {
        Self {
            arena: SolidArena::default(),
            config,
            slicer: Box::new(slicer),
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the entropy-seeded random source.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &DestructionConfig {
        &self.config
    }

    // ── Placement ─────────────────────────────────────────────────────────────

    pub fn cost(&self, material: Material, kind: StructureKind) -> Option<f32> {
        self.config.catalog.cost(material, kind)
    }

    /// Create an intact structure from the catalog.
    pub fn place_structure(&mut self, request: &PlacementRequest) -> SimResult<SolidId> {
        let constants = *self
            .config
            .catalog
            .entry(request.material, request.kind)
            .ok_or(DestructionError::MissingCatalogEntry {
                material: request.material,
                kind: request.kind,
            })?;
        let mesh = request.kind.mesh();
        let volume = estimate_volume(&mesh, &request.transform);
        if volume <= self.config.min_piece_volume {
            return Err(DestructionError::DegenerateVolume { volume });
        }
        let physics = *self.config.catalog.physics(request.material);
        let body = Body {
            mesh,
            transform: request.transform,
            rigid_body: RigidBodyParams {
                mass: physics.mass,
                drag: physics.drag,
                angular_damping: physics.angular_damping,
                constraints: MotionConstraints::for_kind(request.kind),
            },
            visual: VisualMaterial::from(request.material),
            pending_impulse: None,
        };

        let id = self.arena.spawn(|id| Solid {
            id,
            name: format!("{}_{}", request.material.label(), request.kind.label()),
            material: request.material,
            kind: request.kind,
            split_level: 0,
            health: constants.health,
            volume,
            constants,
            is_fragmenting: false,
            state: SolidState::Alive,
            parent: None,
            children: Vec::new(),
            body: Some(body),
        });
        debug!(
            "Placed {} {} as {:?} (cost {})",
            request.material.label(),
            request.kind.label(),
            id,
            constants.cost
        );
        Ok(id)
    }

    /// Take back a placed structure during the build phase.  Debris and
    /// destroyed solids are left alone.
    pub fn remove_structure(&mut self, id: SolidId) -> bool {
        match self.arena.get(id) {
            Some(s) if s.is_alive() && !s.is_fragment() => self.arena.destroy(id),
            _ => false,
        }
    }

    // ── Damage ────────────────────────────────────────────────────────────────

    /// Apply one collision to a solid, fragmenting it if its health runs out.
    pub fn apply_impact(
        &mut self,
        id: SolidId,
        impact: &CollisionImpact,
        phase: &impl PhaseGate,
    ) -> ImpactOutcome {
        let Some(solid) = self.arena.get_mut(id) else {
            return ImpactOutcome::Ignored(IgnoreReason::UnknownSolid);
        };
        if !solid.is_alive() {
            return ImpactOutcome::Ignored(IgnoreReason::NotAlive);
        }
        if !solid.is_fragment() && !phase.is_attack_phase_active() {
            return ImpactOutcome::Ignored(IgnoreReason::BuildPhase);
        }
        match apply_damage(solid, impact) {
            DamageResult::Ignored => ImpactOutcome::Ignored(IgnoreReason::NotAlive),
            DamageResult::Absorbed { damage, remaining } => {
                debug!("{} took {:.1} damage, {:.1} left", solid.name, damage, remaining);
                ImpactOutcome::Damaged { damage, remaining }
            }
            DamageResult::Depleted { damage } => {
                debug!("{} took {:.1} damage and broke", solid.name, damage);
                self.trigger_depletion(id)
            }
        }
    }

    /// Run the depletion response once.  Later calls on the same solid are
    /// ignored.
    pub fn trigger_depletion(&mut self, id: SolidId) -> ImpactOutcome {
        let Some(solid) = self.arena.get_mut(id) else {
            return ImpactOutcome::Ignored(IgnoreReason::UnknownSolid);
        };
        if !begin_fragmenting(solid) {
            return ImpactOutcome::Ignored(IgnoreReason::NotAlive);
        }
        match depletion_action(solid) {
            DepletionAction::DestroyTerminal => {
                debug!("{} is terminal debris; destroying", solid.name);
                self.arena.destroy(id);
                ImpactOutcome::Destroyed
            }
            DepletionAction::Fragment => {
                let scheduler = SplitScheduler::new(&self.config, self.slicer.as_ref());
                match scheduler.fragment(&mut self.arena, id, &mut self.rng) {
                    Ok(report) => ImpactOutcome::Fragmented(report),
                    Err(e) => {
                        warn!("Fragmentation of {:?} aborted: {}", id, e);
                        self.arena.destroy(id);
                        ImpactOutcome::Destroyed
                    }
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn solid(&self, id: SolidId) -> Option<&Solid> {
        self.arena.get(id)
    }

    /// Health of a live solid; `None` once it is gone.
    pub fn current_health(&self, id: SolidId) -> Option<f32> {
        self.arena
            .get(id)
            .filter(|s| s.is_alive())
            .map(|s| s.health)
    }

    pub fn is_alive(&self, id: SolidId) -> bool {
        self.arena.get(id).is_some_and(|s| s.is_alive())
    }

    pub fn alive_solids(&self) -> impl Iterator<Item = &Solid> {
        self.arena.alive()
    }

    /// (material, kind) of every intact placed structure, for budgeting.
    pub fn placed_structures(&self) -> impl Iterator<Item = (Material, StructureKind)> + '_ {
        self.arena
            .alive()
            .filter(|s| !s.is_fragment())
            .map(|s| (s.material, s.kind))
    }

    // ── Engine sync ───────────────────────────────────────────────────────────

    /// Copy the physics backend's pose (metres) back into the solid.  Scale
    /// is owned by the solid and left untouched.
    pub fn update_pose(&mut self, id: SolidId, translation: Vec3, rotation: Quat) {
        if let Some(body) = self.arena.get_mut(id).and_then(|s| s.body.as_mut()) {
            body.transform.translation = translation;
            body.transform.rotation = rotation;
        }
    }

    pub fn take_pending_impulse(&mut self, id: SolidId) -> Option<Vec2> {
        self.arena
            .get_mut(id)
            .and_then(|s| s.body.as_mut())
            .and_then(|b| b.pending_impulse.take())
    }

    pub fn drain_events(&mut self) -> Vec<SolidEvent> {
        self.arena.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::GamePhase;
    use crate::slicing::{SlicePlane, SlicedHull};
    use crate::geometry::SolidMesh;

    struct NoSlice;

    impl Slicer for NoSlice {
        fn slice(&self, _: &SolidMesh, _: &SlicePlane) -> Option<SlicedHull> {
            None
        }
    }

    fn world() -> DestructionWorld {
        DestructionWorld::new(DestructionConfig::default()).seeded(21)
    }

    fn wood_wall(world: &mut DestructionWorld) -> SolidId {
        world
            .place_structure(&PlacementRequest::new(
                Material::Wood,
                StructureKind::Wall,
                Vec2::new(5.0, 1.5),
            ))
            .expect("placement")
    }

    #[test]
    fn placement_uses_catalog_and_material_physics() {
        let mut world = world();
        let id = wood_wall(&mut world);
        let wall = world.solid(id).expect("wall");
        assert_eq!(wall.name, "Wood_Wall");
        assert_eq!(wall.split_level, 0);
        assert_eq!(wall.health, 100.0);
        assert!((wall.volume - 1.5).abs() < 1e-4);
        assert_eq!(wall.mass(), Some(8.0));
        assert_eq!(world.current_health(id), Some(100.0));
        assert_eq!(world.drain_events(), vec![SolidEvent::Spawned(id)]);
    }

    #[test]
    fn build_phase_hits_are_ignored() {
        let mut world = world();
        let id = wood_wall(&mut world);
        let lethal = CollisionImpact::with_body(20.0, Vec2::new(6.0, 0.0));
        assert_eq!(
            world.apply_impact(id, &lethal, &GamePhase::Build),
            ImpactOutcome::Ignored(IgnoreReason::BuildPhase)
        );
        assert_eq!(world.current_health(id), Some(100.0));
        assert!(matches!(
            world.apply_impact(id, &lethal, &GamePhase::Attack),
            ImpactOutcome::Fragmented(_)
        ));
        assert!(!world.is_alive(id));
        assert_eq!(world.current_health(id), None);
    }

    #[test]
    fn fragments_are_not_phase_gated() {
        let mut world = world();
        let id = wood_wall(&mut world);
        let lethal = CollisionImpact::with_body(20.0, Vec2::new(6.0, 0.0));
        let ImpactOutcome::Fragmented(report) = world.apply_impact(id, &lethal, &GamePhase::Attack)
        else {
            panic!("wall should fragment");
        };
        let piece = report.fragments[0];
        let tap = CollisionImpact::with_body(1.0, Vec2::new(1.0, 0.0));
        assert_eq!(
            world.apply_impact(piece, &tap, &GamePhase::Build),
            ImpactOutcome::Damaged { damage: 1.0, remaining: 49.0 }
        );
    }

    #[test]
    fn second_trigger_is_ignored() {
        let mut world = DestructionWorld::with_slicer(DestructionConfig::default(), NoSlice);
        let id = wood_wall(&mut world);
        assert!(matches!(world.trigger_depletion(id), ImpactOutcome::Fragmented(_)));
        assert_eq!(
            world.trigger_depletion(id),
            ImpactOutcome::Ignored(IgnoreReason::NotAlive)
        );
        let solid = world.solid(id).expect("record");
        assert!(solid.is_fragmenting);
        assert_eq!(solid.state, SolidState::Destroyed);
    }

    #[test]
    fn unknown_solid_is_ignored() {
        let mut world = world();
        let hit = CollisionImpact::with_body(1.0, Vec2::X);
        assert_eq!(
            world.apply_impact(SolidId(99), &hit, &true),
            ImpactOutcome::Ignored(IgnoreReason::UnknownSolid)
        );
    }

    #[test]
    fn missing_catalog_entry_fails_placement() {
        let mut config = DestructionConfig::default();
        config.catalog.entries.retain(|r| r.material != Material::Stone);
        let mut world = DestructionWorld::new(config);
        let result = world.place_structure(&PlacementRequest::new(
            Material::Stone,
            StructureKind::Wall,
            Vec2::ZERO,
        ));
        assert_eq!(
            result,
            Err(DestructionError::MissingCatalogEntry {
                material: Material::Stone,
                kind: StructureKind::Wall
            })
        );
    }

    #[test]
    fn removal_only_applies_to_intact_structures() {
        let mut world = world();
        let id = wood_wall(&mut world);
        assert_eq!(world.placed_structures().count(), 1);
        assert!(world.remove_structure(id));
        assert!(!world.remove_structure(id));
        assert_eq!(world.placed_structures().count(), 0);
    }

    #[test]
    fn pose_updates_keep_scale() {
        let mut world = world();
        let mut request = PlacementRequest::new(Material::Stone, StructureKind::Slab, Vec2::ZERO);
        request.transform.scale = Vec3::new(2.0, 1.0, 1.0);
        let id = world.place_structure(&request).expect("placement");
        assert!((world.solid(id).map(|s| s.volume).unwrap_or(0.0) - 3.0).abs() < 1e-4);

        world.update_pose(id, Vec3::new(1.0, 2.0, 0.0), Quat::from_rotation_z(0.5));
        let body = world.solid(id).and_then(|s| s.body.as_ref()).expect("body");
        assert_eq!(body.transform.translation, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(body.transform.scale, Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn pending_impulse_is_taken_once() {
        let mut world = world();
        let id = wood_wall(&mut world);
        let lethal = CollisionImpact::with_body(20.0, Vec2::new(6.0, 0.0));
        let ImpactOutcome::Fragmented(report) = world.apply_impact(id, &lethal, &true) else {
            panic!("wall should fragment");
        };
        let piece = report.fragments[0];
        assert!(world.take_pending_impulse(piece).is_some());
        assert!(world.take_pending_impulse(piece).is_none());
    }
}
