//! Structure placement requests and the build budget.

use crate::catalog::{Material, StructureCatalog, StructureKind};
use bevy::prelude::*;

/// The material the player is currently building with.
///
/// Passed into every [`PlacementRequest`]; nothing reads it implicitly.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialSelection(pub Material);

/// Sent by the placement UI; handled only during the build phase.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct PlacementRequest {
    pub material: Material,
    pub kind: StructureKind,
    /// World transform in metres.
    pub transform: Transform,
}

impl PlacementRequest {
    pub fn new(material: Material, kind: StructureKind, position: Vec2) -> Self {
        Self {
            material,
            kind,
            transform: Transform::from_translation(position.extend(0.0)),
        }
    }

    /// Place with whatever material is currently selected.
    pub fn with_selection(selection: MaterialSelection, kind: StructureKind, position: Vec2) -> Self {
        Self::new(selection.0, kind, position)
    }
}

/// Running total of placed-structure cost against the build allowance.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct BudgetTracker {
    pub max: f32,
    pub current: f32,
}

impl BudgetTracker {
    pub fn new(max: f32) -> Self {
        Self { max, current: 0.0 }
    }

    /// Replace the running total with the sum over `placed`.  Pairs missing
    /// from the catalog cost nothing.
    pub fn recompute(
        &mut self,
        catalog: &StructureCatalog,
        placed: impl IntoIterator<Item = (Material, StructureKind)>,
    ) {
        self.current = placed
            .into_iter()
            .filter_map(|(material, kind)| catalog.cost(material, kind))
            .sum();
    }

    pub fn is_exceeded(&self) -> bool {
        self.current > self.max
    }

    pub fn remaining(&self) -> f32 {
        self.max - self.current
    }

    pub fn can_afford(&self, cost: f32) -> bool {
        self.current + cost <= self.max
    }
}
