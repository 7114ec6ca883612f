//! Cutting-plane sampling and the plane-slicing primitive.
//!
//! [`sample_plane`] draws a near-horizontal plane through a candidate's
//! bounds.  [`Slicer`] is the seam for the slicing backend; [`ConvexSlicer`]
//! handles every convex solid, which covers all structure kinds and, since a
//! plane cut of a convex solid is convex, all of their descendants.

use crate::constants::SLICE_EPSILON;
use crate::geometry::SolidMesh;
use bevy::prelude::*;
use rand::Rng;

/// A cutting plane in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlane {
    pub point: Vec3,
    /// Unit normal.  The upper half lies on the side it points to.
    pub normal: Vec3,
}

impl SlicePlane {
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.point).dot(self.normal)
    }
}

/// Draw a cutting plane for a piece centred at `position` with world-space
/// size `extent`.
///
/// The normal is +Y tilted about the depth axis by up to `max_tilt_deg`
/// either way.  The point is offset within ±half the extent on X and Y and
/// never in depth.
pub fn sample_plane(rng: &mut impl Rng, position: Vec3, extent: Vec3, max_tilt_deg: f32) -> SlicePlane {
    let tilt = if max_tilt_deg > 0.0 {
        rng.gen_range(-max_tilt_deg..=max_tilt_deg)
    } else {
        0.0
    };
    let normal = Quat::from_rotation_z(tilt.to_radians()) * Vec3::Y;

    let half = extent.abs() * 0.5;
    let offset = Vec3::new(
        rng.gen_range(-half.x..=half.x),
        rng.gen_range(-half.y..=half.y),
        0.0,
    );
    SlicePlane {
        point: position + offset,
        normal,
    }
}

/// Both closed halves of a successful slice.
#[derive(Debug, Clone)]
pub struct SlicedHull {
    /// The half on the side the plane normal points to.
    pub upper: SolidMesh,
    pub lower: SolidMesh,
}

/// Splits one closed mesh into two closed meshes along a plane.
///
/// Returns `None` when the plane does not cross the mesh or either side would
/// be empty.  Implementations must be synchronous.
pub trait Slicer: Send + Sync {
    fn slice(&self, mesh: &SolidMesh, plane: &SlicePlane) -> Option<SlicedHull>;
}

/// Clip-and-cap slicer for convex meshes.
///
/// Each triangle is clipped against both half-spaces; the cut points are
/// joined into a single cross-section polygon per side.  Non-convex input
/// produces a wrong cap, not a panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvexSlicer;

impl Slicer for ConvexSlicer {
    fn slice(&self, mesh: &SolidMesh, plane: &SlicePlane) -> Option<SlicedHull> {
        let normal = plane.normal.try_normalize()?;
        let plane = SlicePlane {
            point: plane.point,
            normal,
        };

        let distance = |p: Vec3| {
            let d = plane.signed_distance(p);
            if d.abs() < SLICE_EPSILON {
                0.0
            } else {
                d
            }
        };

        let above = mesh.positions.iter().any(|p| distance(*p) > 0.0);
        let below = mesh.positions.iter().any(|p| distance(*p) < 0.0);
        if !above || !below {
            return None;
        }

        let mut upper = MeshBuilder::default();
        let mut lower = MeshBuilder::default();
        let mut section: Vec<Vec3> = Vec::new();

        for tri in mesh.triangles() {
            let d = tri.map(distance);
            upper.push_polygon(&clip_polygon(&tri, &d, 1.0));
            lower.push_polygon(&clip_polygon(&tri, &d, -1.0));

            for i in 0..3 {
                let j = (i + 1) % 3;
                if d[i] == 0.0 {
                    push_unique(&mut section, tri[i]);
                }
                if d[i] * d[j] < 0.0 {
                    push_unique(&mut section, edge_intersection(tri[i], tri[j], d[i], d[j]));
                }
            }
        }

        let cap = order_section(&section, normal)?;
        // Lower half's cap faces +normal; the upper half's faces −normal.
        lower.push_cap(&cap);
        let reversed: Vec<Vec3> = cap.iter().rev().copied().collect();
        upper.push_cap(&reversed);

        let upper = upper.build();
        let lower = lower.build();
        if upper.is_empty() || lower.is_empty() {
            return None;
        }
        Some(SlicedHull { upper, lower })
    }
}

/// Sutherland–Hodgman clip of one triangle, keeping points where
/// `side * d ≥ 0`.
fn clip_polygon(tri: &[Vec3; 3], d: &[f32; 3], side: f32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (di, dj) = (side * d[i], side * d[j]);
        if di >= 0.0 {
            out.push(tri[i]);
        }
        if (di > 0.0 && dj < 0.0) || (di < 0.0 && dj > 0.0) {
            out.push(edge_intersection(tri[i], tri[j], d[i], d[j]));
        }
    }
    out
}

fn edge_intersection(a: Vec3, b: Vec3, da: f32, db: f32) -> Vec3 {
    let t = da / (da - db);
    a.lerp(b, t)
}

fn push_unique(points: &mut Vec<Vec3>, p: Vec3) {
    if !points.iter().any(|q| q.distance_squared(p) < SLICE_EPSILON * SLICE_EPSILON) {
        points.push(p);
    }
}

/// Sort cross-section points counter-clockwise around `normal`.
fn order_section(points: &[Vec3], normal: Vec3) -> Option<Vec<Vec3>> {
    if points.len() < 3 {
        return None;
    }
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;

    let mut ordered: Vec<(f32, Vec3)> = points
        .iter()
        .map(|p| {
            let rel = *p - center;
            (rel.dot(v).atan2(rel.dot(u)), *p)
        })
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
    Some(ordered.into_iter().map(|(_, p)| p).collect())
}

#[derive(Default)]
struct MeshBuilder {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    cap_start: Option<usize>,
}

impl MeshBuilder {
    fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        if (b - a).cross(c - a).length_squared() <= f32::EPSILON * f32::EPSILON {
            return;
        }
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&[a, b, c]);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    fn push_polygon(&mut self, polygon: &[Vec3]) {
        for k in 1..polygon.len().saturating_sub(1) {
            self.push_triangle(polygon[0], polygon[k], polygon[k + 1]);
        }
    }

    fn push_cap(&mut self, polygon: &[Vec3]) {
        self.cap_start = Some(self.indices.len() / 3);
        self.push_polygon(polygon);
    }

    fn build(self) -> SolidMesh {
        SolidMesh {
            positions: self.positions,
            indices: self.indices,
            cap_start: self.cap_start,
        }
    }
}
