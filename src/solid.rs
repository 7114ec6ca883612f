//! Solid records and the arena that owns them.
//!
//! Placed structures and debris share one [`Solid`] type; a fragment is a
//! solid with `split_level > 0` and a parent handle.  The arena never removes
//! records: destroying a solid releases its [`Body`] and keeps the record for
//! lineage queries.  Spawn and destroy notifications are queued for the
//! engine layer to mirror.

use crate::catalog::{CatalogEntry, Material, StructureKind};
use crate::geometry::SolidMesh;
use bevy::prelude::*;

// ── Handles and state ─────────────────────────────────────────────────────────

/// Stable handle into a [`SolidArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolidId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolidState {
    #[default]
    Alive,
    Fragmenting,
    Destroyed,
}

/// Render material slot; always derived from [`Material`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualMaterial {
    Wood,
    Stone,
}

impl From<Material> for VisualMaterial {
    fn from(material: Material) -> Self {
        match material {
            Material::Wood => VisualMaterial::Wood,
            Material::Stone => VisualMaterial::Stone,
        }
    }
}

/// Per-axis freeze flags in 3D terms.  Every solid is pinned to the gameplay
/// plane (Z translation frozen); kinds differ only in which rotations lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionConstraints {
    pub freeze_position_z: bool,
    pub freeze_rotation_x: bool,
    pub freeze_rotation_y: bool,
    pub freeze_rotation_z: bool,
}

impl MotionConstraints {
    pub fn for_kind(kind: StructureKind) -> Self {
        match kind {
            // Triangular colliders tumble unrealistically about Y; lock Z instead.
            StructureKind::RightTriangle => Self {
                freeze_position_z: true,
                freeze_rotation_x: true,
                freeze_rotation_y: false,
                freeze_rotation_z: true,
            },
            StructureKind::Wall | StructureKind::Square | StructureKind::Slab => Self {
                freeze_position_z: true,
                freeze_rotation_x: true,
                freeze_rotation_y: true,
                freeze_rotation_z: false,
            },
        }
    }

    /// Whether the in-plane (about Z) rotation is locked, the only rotation
    /// a 2D backend can express.
    pub fn locks_planar_rotation(&self) -> bool {
        self.freeze_rotation_z
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyParams {
    pub mass: f32,
    pub drag: f32,
    pub angular_damping: f32,
    pub constraints: MotionConstraints,
}

/// The physical representation a solid exclusively owns while it exists.
#[derive(Debug, Clone)]
pub struct Body {
    /// Local-space geometry.
    pub mesh: SolidMesh,
    /// World transform in metres.
    pub transform: Transform,
    pub rigid_body: RigidBodyParams,
    pub visual: VisualMaterial,
    /// Outward kick to apply once when the engine body is created.
    pub pending_impulse: Option<Vec2>,
}

// ── Solid ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Solid {
    pub id: SolidId,
    pub name: String,
    pub material: Material,
    pub kind: StructureKind,
    /// 0 for placed structures, parent + 1 for fragments.
    pub split_level: u32,
    pub health: f32,
    /// Enclosed volume at creation (m³).  Never recomputed.
    pub volume: f32,
    pub constants: CatalogEntry,
    pub is_fragmenting: bool,
    pub state: SolidState,
    pub parent: Option<SolidId>,
    pub children: Vec<SolidId>,
    /// `None` once destroyed.
    pub body: Option<Body>,
}

impl Solid {
    pub fn is_alive(&self) -> bool {
        self.state == SolidState::Alive
    }

    pub fn is_fragment(&self) -> bool {
        self.split_level > 0
    }

    pub fn mass(&self) -> Option<f32> {
        self.body.as_ref().map(|b| b.rigid_body.mass)
    }

    pub fn center(&self) -> Option<Vec3> {
        self.body.as_ref().map(|b| b.transform.translation)
    }

    /// Geometry with the current transform baked in.
    pub fn world_mesh(&self) -> Option<SolidMesh> {
        self.body.as_ref().map(|b| b.mesh.transformed(&b.transform))
    }

    /// World-space `(center, size)` of the axis-aligned bounds.
    pub fn world_bounds(&self) -> Option<(Vec3, Vec3)> {
        let (lo, hi) = self.world_mesh()?.bounds()?;
        Some(((lo + hi) * 0.5, hi - lo))
    }
}

// ── Arena ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidEvent {
    Spawned(SolidId),
    Destroyed(SolidId),
}

#[derive(Debug, Default)]
pub struct SolidArena {
    solids: Vec<Solid>,
    events: Vec<SolidEvent>,
}

impl SolidArena {
    /// Insert a fully built solid.  `build` receives the handle the solid will
    /// live under; the record is only visible once it returns.
    pub fn spawn(&mut self, build: impl FnOnce(SolidId) -> Solid) -> SolidId {
        let id = SolidId(self.solids.len() as u64);
        let solid = build(id);
        let parent = solid.parent;
        self.solids.push(solid);
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.push(id);
        }
        self.events.push(SolidEvent::Spawned(id));
        id
    }

    pub fn get(&self, id: SolidId) -> Option<&Solid> {
        self.solids.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: SolidId) -> Option<&mut Solid> {
        self.solids.get_mut(id.0 as usize)
    }

    /// Release the solid's body and mark it destroyed.  Returns `false` if it
    /// was already destroyed or unknown.
    ///
    /// A solid destroyed before its spawn was drained never reaches the
    /// engine: the pending `Spawned` is dropped instead of queuing `Destroyed`,
    /// and the parent forgets it, so lineage only lists pieces that existed
    /// outside a fragmentation pass.
    pub fn destroy(&mut self, id: SolidId) -> bool {
        let Some(solid) = self.get_mut(id) else {
            return false;
        };
        if solid.state == SolidState::Destroyed {
            return false;
        }
        solid.state = SolidState::Destroyed;
        solid.body = None;
        let parent = solid.parent;

        let pending = self
            .events
            .iter()
            .position(|e| *e == SolidEvent::Spawned(id));
        match pending {
            Some(index) => {
                self.events.remove(index);
                if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => self.events.push(SolidEvent::Destroyed(id)),
        }
        true
    }

    pub fn drain_events(&mut self) -> Vec<SolidEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn alive(&self) -> impl Iterator<Item = &Solid> {
        self.solids.iter().filter(|s| s.is_alive())
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }
}
