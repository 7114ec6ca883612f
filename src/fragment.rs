//! Fragment construction.
//!
//! [`FragmentFactory::instantiate`] turns one half of a slice into a complete
//! debris [`Solid`]: validated geometry, volume, volume-scaled mass, damping,
//! constraints, inherited constants, health and the outward kick.  Nothing is
//! inserted into the arena until every field is known.

use crate::config::DestructionConfig;
use crate::error::{DestructionError, SimResult};
use crate::geometry::{estimate_volume, SolidMesh};
use crate::catalog::{CatalogEntry, Material, StructureKind};
use crate::solid::{
    Body, MotionConstraints, RigidBodyParams, Solid, SolidArena, SolidId, SolidState,
    VisualMaterial,
};
use bevy::prelude::*;
use rand::Rng;

/// Snapshot of the solid a fragmentation pass started from.
///
/// Captured before the pass so the parent's body can be released while its
/// pieces are still being built.
#[derive(Debug, Clone, Copy)]
pub struct ParentTemplate {
    pub id: SolidId,
    pub material: Material,
    pub kind: StructureKind,
    pub split_level: u32,
    pub constants: CatalogEntry,
    pub mass: f32,
    pub volume: f32,
    pub center: Vec3,
}

impl ParentTemplate {
    pub fn of(solid: &Solid) -> Option<Self> {
        let body = solid.body.as_ref()?;
        Some(Self {
            id: solid.id,
            material: solid.material,
            kind: solid.kind,
            split_level: solid.split_level,
            constants: solid.constants,
            mass: body.rigid_body.mass,
            volume: solid.volume,
            center: body.transform.translation,
        })
    }
}

pub fn debris_name(material: Material, kind: StructureKind, split_level: u32) -> String {
    format!(
        "{}_{}_Debris_Level_{}",
        material.label(),
        kind.label(),
        split_level
    )
}

pub struct FragmentFactory<'a> {
    config: &'a DestructionConfig,
}

impl<'a> FragmentFactory<'a> {
    pub fn new(config: &'a DestructionConfig) -> Self {
        Self { config }
    }

    /// Build a fragment of `parent` from world-space `geometry` and insert it.
    ///
    /// Rejected geometry is dropped here; the caller only sees the error.
    pub fn instantiate(
        &self,
        arena: &mut SolidArena,
        parent: &ParentTemplate,
        geometry: SolidMesh,
        rng: &mut impl Rng,
    ) -> SimResult<SolidId> {
        let triangle_count = geometry.triangle_count();
        if triangle_count == 0 {
            warn!(
                "Discarding fragment of solid {:?}: sub-mesh has no triangles",
                parent.id
            );
            return Err(DestructionError::InvalidGeometry {
                context: "fragment instantiate",
                triangle_count,
            });
        }

        let center = geometry.centroid();
        let mesh = geometry.translated(-center);
        let volume = estimate_volume(&mesh, &Transform::IDENTITY);
        if volume <= self.config.min_piece_volume {
            warn!(
                "Discarding fragment of solid {:?}: volume {:.2e} m³ is degenerate",
                parent.id, volume
            );
            return Err(DestructionError::DegenerateVolume { volume });
        }

        let parent_volume = if parent.volume > 0.0 {
            parent.volume
        } else {
            self.config.default_volume
        };
        let physics = self.config.catalog.physics(parent.material);
        let rigid_body = RigidBodyParams {
            mass: parent.mass * volume / parent_volume,
            drag: physics.drag,
            angular_damping: physics.debris_angular_damping,
            constraints: MotionConstraints::for_kind(parent.kind),
        };

        let j = self.config.fragment_position_jitter;
        let jitter = if j > 0.0 {
            Vec3::new(rng.gen_range(-j..=j), rng.gen_range(-j..=j), 0.0)
        } else {
            Vec3::ZERO
        };

        let impulse = (center - parent.center).with_z(0.0).normalize_or_zero().truncate()
            * parent.constants.explosion_force;

        let split_level = parent.split_level + 1;
        let health = parent.constants.fragment_health(split_level);
        let body = Body {
            mesh,
            transform: Transform::from_translation(center + jitter),
            rigid_body,
            visual: VisualMaterial::from(parent.material),
            pending_impulse: (impulse != Vec2::ZERO).then_some(impulse),
        };

        Ok(arena.spawn(|id| Solid {
            id,
            name: debris_name(parent.material, parent.kind, split_level),
            material: parent.material,
            kind: parent.kind,
            split_level,
            health,
            volume,
            constants: parent.constants,
            is_fragmenting: false,
            state: SolidState::Alive,
            parent: Some(parent.id),
            children: Vec::new(),
            body: Some(body),
        }))
    }
}
