//! Mesh2d fills for solids and cannon balls.
//!
//! Every solid body receives a flat polygon fill the frame after it spawns,
//! via [`attach_solid_mesh_system`] (which queries `Added<SolidLink>`).  The
//! outline is stored in local space, so Rapier's pose on the entity's
//! `Transform` positions and rotates it with no extra work.

use crate::cannon::Cannonball;
use crate::config::DestructionConfig;
use crate::constants::CANNONBALL_RADIUS;
use crate::plugin::{SolidLink, SolidOutline, SolidVisual};
use crate::solid::VisualMaterial;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};

/// Shared material handles, one per visual material.
#[derive(Resource, Debug, Clone)]
pub struct SolidPalette {
    pub wood: Handle<ColorMaterial>,
    pub stone: Handle<ColorMaterial>,
    pub cannonball: Handle<ColorMaterial>,
}

impl SolidPalette {
    pub fn material(&self, visual: VisualMaterial) -> Handle<ColorMaterial> {
        match visual {
            VisualMaterial::Wood => self.wood.clone(),
            VisualMaterial::Stone => self.stone.clone(),
        }
    }
}

pub fn visual_color(visual: VisualMaterial) -> Color {
    match visual {
        VisualMaterial::Wood => Color::srgb(0.62, 0.42, 0.22),
        VisualMaterial::Stone => Color::srgb(0.55, 0.56, 0.58),
    }
}

pub fn setup_solid_palette(mut commands: Commands, mut materials: ResMut<Assets<ColorMaterial>>) {
    commands.insert_resource(SolidPalette {
        wood: materials.add(ColorMaterial::from_color(visual_color(VisualMaterial::Wood))),
        stone: materials.add(ColorMaterial::from_color(visual_color(VisualMaterial::Stone))),
        cannonball: materials.add(ColorMaterial::from_color(Color::srgb(0.15, 0.15, 0.17))),
    });
}

pub fn attach_solid_mesh_system(
    mut commands: Commands,
    query: Query<(Entity, &SolidOutline, &SolidVisual), Added<SolidLink>>,
    mut meshes: ResMut<Assets<Mesh>>,
    palette: Res<SolidPalette>,
) {
    for (entity, outline, visual) in query.iter() {
        if outline.0.len() < 3 {
            continue;
        }
        commands.entity(entity).insert((
            Mesh2d(meshes.add(filled_polygon_mesh(&outline.0))),
            MeshMaterial2d(palette.material(visual.0)),
        ));
    }
}

pub fn attach_cannonball_mesh_system(
    mut commands: Commands,
    query: Query<Entity, Added<Cannonball>>,
    mut meshes: ResMut<Assets<Mesh>>,
    palette: Res<SolidPalette>,
    config: Res<DestructionConfig>,
) {
    for entity in query.iter() {
        commands.entity(entity).insert((
            Mesh2d(meshes.add(Circle::new(CANNONBALL_RADIUS * config.pixels_per_meter))),
            MeshMaterial2d(palette.cannonball.clone()),
        ));
    }
}

/// Fan-triangulate a convex polygon into a renderable [`Mesh`].
pub fn filled_polygon_mesh(vertices: &[Vec2]) -> Mesh {
    let n = vertices.len();
    let positions: Vec<[f32; 3]> = vertices.iter().map(|v| [v.x, v.y, 0.0]).collect();
    let normals: Vec<[f32; 3]> = vec![[0.0, 0.0, 1.0]; n];
    let uvs: Vec<[f32; 2]> = vertices.iter().map(|v| [v.x / 100.0 + 0.5, v.y / 100.0 + 0.5]).collect();

    let mut indices: Vec<u32> = Vec::with_capacity(n.saturating_sub(2) * 3);
    for i in 1..(n as u32).saturating_sub(1) {
        indices.extend_from_slice(&[0, i, i + 1]);
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

pub struct DestructionRenderPlugin;

impl Plugin for DestructionRenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_solid_palette).add_systems(
            Update,
            (attach_solid_mesh_system, attach_cannonball_mesh_system),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_mesh_has_fan_indices() {
        let square = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];
        let mesh = filled_polygon_mesh(&square);
        assert_eq!(mesh.count_vertices(), 4);
        match mesh.indices() {
            Some(Indices::U32(indices)) => assert_eq!(indices, &vec![0, 1, 2, 0, 2, 3]),
            other => panic!("unexpected indices {other:?}"),
        }
    }

    #[test]
    fn wood_and_stone_differ() {
        assert_ne!(
            visual_color(VisualMaterial::Wood),
            visual_color(VisualMaterial::Stone)
        );
    }
}
