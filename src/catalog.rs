//! Structure catalog: per (material × kind) constants, material physics and
//! structure footprints.
//!
//! Every placed structure looks up its [`CatalogEntry`] once at placement.
//! Fragments never consult the catalog again; they carry a copy of their
//! ancestor's entry so a whole lineage shares the same constants even if the
//! catalog is reloaded mid-game.

use crate::geometry::SolidMesh;
use bevy::prelude::*;
use serde::Deserialize;

// ── Materials ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum Material {
    #[default]
    Wood,
    Stone,
}

impl Material {
    pub const ALL: [Material; 2] = [Material::Wood, Material::Stone];

    pub fn label(self) -> &'static str {
        match self {
            Material::Wood => "Wood",
            Material::Stone => "Stone",
        }
    }
}

/// Rigid-body parameters shared by every solid of one material.
///
/// `mass` applies to intact structures; fragments scale it by volume ratio.
/// Debris tumbles with `debris_angular_damping` instead of the structure value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MaterialPhysics {
    pub mass: f32,
    pub drag: f32,
    pub angular_damping: f32,
    pub debris_angular_damping: f32,
}

impl MaterialPhysics {
    pub const WOOD: MaterialPhysics = MaterialPhysics {
        mass: 8.0,
        drag: 0.1,
        angular_damping: 0.05,
        debris_angular_damping: 0.15,
    };

    pub const STONE: MaterialPhysics = MaterialPhysics {
        mass: 20.0,
        drag: 0.1,
        angular_damping: 1.0,
        debris_angular_damping: 1.0,
    };
}

// ── Structure kinds ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum StructureKind {
    #[default]
    Wall,
    Square,
    Slab,
    RightTriangle,
}

impl StructureKind {
    pub const ALL: [StructureKind; 4] = [
        StructureKind::Wall,
        StructureKind::Square,
        StructureKind::Slab,
        StructureKind::RightTriangle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StructureKind::Wall => "Wall",
            StructureKind::Square => "Square",
            StructureKind::Slab => "Slab",
            StructureKind::RightTriangle => "RightTriangle",
        }
    }

    /// Width × height × depth in metres.
    pub fn dimensions(self) -> Vec3 {
        match self {
            StructureKind::Wall => Vec3::new(0.5, 3.0, 1.0),
            StructureKind::Square => Vec3::new(1.5, 1.5, 1.0),
            StructureKind::Slab => Vec3::new(3.0, 0.5, 1.0),
            StructureKind::RightTriangle => Vec3::new(1.5, 1.5, 1.0),
        }
    }

    /// Local-space closed mesh centred on the origin.
    pub fn mesh(self) -> SolidMesh {
        let dims = self.dimensions();
        match self {
            StructureKind::RightTriangle => SolidMesh::right_triangle_prism(dims.x, dims.y, dims.z),
            _ => SolidMesh::cuboid(dims),
        }
    }
}

// ── Catalog entries ───────────────────────────────────────────────────────────

/// Constants a structure receives at placement and passes to every fragment.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub cost: f32,
    pub health: f32,
    pub damage_factor: f32,
    /// Inclusive lower bound of the fragment-count draw.
    pub min_fragments: u32,
    /// Exclusive upper bound of the fragment-count draw.
    pub max_fragments: u32,
    pub explosion_force: f32,
    pub base_fragment_health: f32,
    pub fragment_health_multiplier: f32,
    pub max_split_level: u32,
}

impl CatalogEntry {
    /// Health of a fragment at `split_level` (≥ 1).
    ///
    /// `base × multiplier^(level − 1)`: the first debris generation gets the
    /// base value, deeper generations scale geometrically.
    pub fn fragment_health(&self, split_level: u32) -> f32 {
        let exponent = split_level.saturating_sub(1) as i32;
        self.base_fragment_health * self.fragment_health_multiplier.powi(exponent)
    }
}

/// One catalog row as it appears in `assets/destruction.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CatalogRecord {
    pub material: Material,
    pub kind: StructureKind,
    #[serde(flatten)]
    pub entry: CatalogEntry,
}

/// The full set of per-structure constants plus per-material physics.
///
/// Eight rows at most, so lookups scan linearly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StructureCatalog {
    pub entries: Vec<CatalogRecord>,
    pub wood: MaterialPhysics,
    pub stone: MaterialPhysics,
}

impl StructureCatalog {
    pub fn entry(&self, material: Material, kind: StructureKind) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|r| r.material == material && r.kind == kind)
            .map(|r| &r.entry)
    }

    /// Placement cost, consumed by the budget tracker.
    pub fn cost(&self, material: Material, kind: StructureKind) -> Option<f32> {
        self.entry(material, kind).map(|e| e.cost)
    }

    pub fn physics(&self, material: Material) -> &MaterialPhysics {
        match material {
            Material::Wood => &self.wood,
            Material::Stone => &self.stone,
        }
    }
}

fn record(
    material: Material,
    kind: StructureKind,
    cost: f32,
    health: f32,
    fragments: (u32, u32),
) -> CatalogRecord {
    let (damage_factor, explosion_force, base_fragment_health, fragment_health_multiplier, max_split_level) =
        match material {
            Material::Wood => (1.0, 30.0, 50.0, 3.0, 3),
            Material::Stone => (0.5, 40.0, 120.0, 2.0, 2),
        };
    CatalogRecord {
        material,
        kind,
        entry: CatalogEntry {
            cost,
            health,
            damage_factor,
            min_fragments: fragments.0,
            max_fragments: fragments.1,
            explosion_force,
            base_fragment_health,
            fragment_health_multiplier,
            max_split_level,
        },
    }
}

impl Default for StructureCatalog {
    fn default() -> Self {
        use self::Material::*;
        use StructureKind::*;
        Self {
            entries: vec![
                record(Wood, Wall, 100.0, 100.0, (2, 9)),
                record(Wood, Square, 150.0, 150.0, (2, 7)),
                record(Wood, Slab, 120.0, 120.0, (2, 8)),
                record(Wood, RightTriangle, 80.0, 80.0, (2, 6)),
                record(Stone, Wall, 200.0, 250.0, (2, 7)),
                record(Stone, Square, 300.0, 375.0, (2, 6)),
                record(Stone, Slab, 240.0, 300.0, (2, 6)),
                record(Stone, RightTriangle, 160.0, 200.0, (2, 5)),
            ],
            wood: MaterialPhysics::WOOD,
            stone: MaterialPhysics::STONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_covers_every_pair() {
        let catalog = StructureCatalog::default();
        for material in Material::ALL {
            for kind in StructureKind::ALL {
                assert!(
                    catalog.entry(material, kind).is_some(),
                    "missing {} {}",
                    material.label(),
                    kind.label()
                );
            }
        }
    }

    #[test]
    fn wood_wall_matches_reference_constants() {
        let catalog = StructureCatalog::default();
        let wall = catalog
            .entry(Material::Wood, StructureKind::Wall)
            .expect("wood wall");
        assert_eq!(wall.health, 100.0);
        assert_eq!(wall.damage_factor, 1.0);
        assert_eq!((wall.min_fragments, wall.max_fragments), (2, 9));
        assert_eq!(catalog.physics(Material::Wood).mass, 8.0);
    }

    #[test]
    fn fragment_health_scales_geometrically() {
        let entry = StructureCatalog::default()
            .entry(Material::Wood, StructureKind::Wall)
            .copied()
            .expect("wood wall");
        assert_eq!(entry.fragment_health(1), 50.0);
        assert_eq!(entry.fragment_health(2), 150.0);
        assert_eq!(entry.fragment_health(3), 450.0);
    }

    #[test]
    fn cost_lookup_misses_on_sparse_catalog() {
        let catalog = StructureCatalog {
            entries: Vec::new(),
            ..Default::default()
        };
        assert_eq!(catalog.cost(Material::Stone, StructureKind::Slab), None);
        assert_eq!(
            StructureCatalog::default().cost(Material::Stone, StructureKind::Slab),
            Some(240.0)
        );
    }

    #[test]
    fn stone_debris_resists_tumbling_more_than_wood() {
        let catalog = StructureCatalog::default();
        assert!(
            catalog.physics(Material::Stone).debris_angular_damping
                > catalog.physics(Material::Wood).debris_angular_damping
        );
    }
}
