//! Closed triangle meshes for destructible solids.
//!
//! [`SolidMesh`] is the geometry a [`crate::solid::Solid`] owns: a triangle
//! list with outward (counter-clockwise) winding.  Everything here is plain
//! math on `Vec3`; Bevy `Mesh` assets are only built at render time.

use crate::constants::HULL_DEDUP_MIN_DIST;
use bevy::prelude::*;

/// A closed, outward-wound triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Index of the first cross-section (cap) triangle, if this mesh was
    /// produced by a slice.
    pub cap_start: Option<usize>,
}

impl SolidMesh {
    /// Iterate triangles as vertex triples.  Triangles with out-of-range
    /// indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles().next().is_none()
    }

    /// Extrude a counter-clockwise XY outline along Z, centred on z = 0.
    pub fn prism(outline: &[Vec2], depth: f32) -> SolidMesh {
        let n = outline.len();
        if n < 3 {
            return SolidMesh::default();
        }
        let half = depth * 0.5;
        let mut positions = Vec::with_capacity(n * 2);
        positions.extend(outline.iter().map(|p| p.extend(half)));
        positions.extend(outline.iter().map(|p| p.extend(-half)));

        let n = n as u32;
        let mut indices = Vec::with_capacity(((n as usize - 2) * 2 + n as usize * 2) * 3);
        // Front (+Z) and back (−Z) caps.
        for i in 1..n - 1 {
            indices.extend_from_slice(&[0, i, i + 1]);
            indices.extend_from_slice(&[n, n + i + 1, n + i]);
        }
        for i in 0..n {
            let j = (i + 1) % n;
            indices.extend_from_slice(&[n + i, n + j, j]);
            indices.extend_from_slice(&[n + i, j, i]);
        }
        SolidMesh {
            positions,
            indices,
            cap_start: None,
        }
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(dims: Vec3) -> SolidMesh {
        let h = dims.truncate() * 0.5;
        SolidMesh::prism(
            &[
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ],
            dims.z,
        )
    }

    /// Right-triangle prism with the right angle at the bottom-left corner of
    /// its origin-centred bounding box.
    pub fn right_triangle_prism(width: f32, height: f32, depth: f32) -> SolidMesh {
        let hw = width * 0.5;
        let hh = height * 0.5;
        SolidMesh::prism(
            &[
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(-hw, hh),
            ],
            depth,
        )
    }

    pub fn translated(&self, offset: Vec3) -> SolidMesh {
        SolidMesh {
            positions: self.positions.iter().map(|p| *p + offset).collect(),
            indices: self.indices.clone(),
            cap_start: self.cap_start,
        }
    }

    /// Bake a transform into the vertex positions.
    pub fn transformed(&self, transform: &Transform) -> SolidMesh {
        SolidMesh {
            positions: self
                .positions
                .iter()
                .map(|p| transform.transform_point(*p))
                .collect(),
            indices: self.indices.clone(),
            cap_start: self.cap_start,
        }
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }

    /// Volume-weighted centroid.  Falls back to the vertex mean when the mesh
    /// encloses no volume.
    pub fn centroid(&self) -> Vec3 {
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for [a, b, c] in self.triangles() {
            let v = signed_tetra_volume(a, b, c);
            weighted += v * (a + b + c) * 0.25;
            total += v;
        }
        if total.abs() > f32::EPSILON {
            return weighted / total;
        }
        if self.positions.is_empty() {
            return Vec3::ZERO;
        }
        self.positions.iter().copied().sum::<Vec3>() / self.positions.len() as f32
    }

    /// Convex outline of the mesh projected onto the XY gameplay plane.
    pub fn outline_2d(&self) -> Option<Vec<Vec2>> {
        let projected: Vec<Vec2> = self.positions.iter().map(|p| p.truncate()).collect();
        convex_hull_2d(&projected)
    }
}

fn signed_tetra_volume(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    a.cross(b).dot(c) / 6.0
}

/// Enclosed volume of `mesh` after applying `transform`.
///
/// Sums signed tetrahedra against the world origin and returns the absolute
/// total.  An empty mesh yields 0; open meshes yield a best-effort number.
pub fn estimate_volume(mesh: &SolidMesh, transform: &Transform) -> f32 {
    mesh.triangles()
        .map(|[a, b, c]| {
            signed_tetra_volume(
                transform.transform_point(a),
                transform.transform_point(b),
                transform.transform_point(c),
            )
        })
        .sum::<f32>()
        .abs()
}

fn cross_2d(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

/// Counter-clockwise convex hull (monotone chain).
///
/// Near-duplicate points (within [`HULL_DEDUP_MIN_DIST`]) are merged first.
/// Returns `None` when fewer than three non-collinear points remain.
pub fn convex_hull_2d(points: &[Vec2]) -> Option<Vec<Vec2>> {
    let mut deduped: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if !deduped.iter().any(|q| q.distance(p) < HULL_DEDUP_MIN_DIST) {
            deduped.push(p);
        }
    }
    if deduped.len() < 3 {
        return None;
    }
    deduped.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let mut lower: Vec<Vec2> = Vec::new();
    for &p in &deduped {
        while lower.len() >= 2 && cross_2d(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Vec2> = Vec::new();
    for &p in deduped.iter().rev() {
        while upper.len() >= 2 && cross_2d(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);

    (lower.len() >= 3).then_some(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_volume_matches_dimensions() {
        let mesh = SolidMesh::cuboid(Vec3::new(0.5, 3.0, 1.0));
        let v = estimate_volume(&mesh, &Transform::IDENTITY);
        assert!((v - 1.5).abs() < 1e-5, "got {v}");
    }

    #[test]
    fn prism_winding_is_outward() {
        // Signed (not absolute) sum is positive only for outward winding.
        let mesh = SolidMesh::right_triangle_prism(1.5, 1.5, 1.0);
        let signed: f32 = mesh
            .triangles()
            .map(|[a, b, c]| signed_tetra_volume(a, b, c))
            .sum();
        assert!((signed - 1.125).abs() < 1e-5, "got {signed}");
    }

    #[test]
    fn volume_is_translation_invariant_and_scales_cubically() {
        let mesh = SolidMesh::cuboid(Vec3::ONE);
        let moved = Transform::from_xyz(40.0, -12.0, 3.0);
        assert!((estimate_volume(&mesh, &moved) - 1.0).abs() < 1e-3);
        let scaled = Transform::from_scale(Vec3::splat(2.0));
        assert!((estimate_volume(&mesh, &scaled) - 8.0).abs() < 1e-4);
    }

    #[test]
    fn empty_mesh_has_zero_volume() {
        assert_eq!(estimate_volume(&SolidMesh::default(), &Transform::IDENTITY), 0.0);
        assert!(SolidMesh::default().is_empty());
        assert!(SolidMesh::prism(&[Vec2::ZERO, Vec2::X], 1.0).is_empty());
    }

    #[test]
    fn centroid_of_offset_box() {
        let mesh = SolidMesh::cuboid(Vec3::ONE).translated(Vec3::new(3.0, 1.0, 0.0));
        assert!(mesh.centroid().distance(Vec3::new(3.0, 1.0, 0.0)) < 1e-4);
    }

    #[test]
    fn triangle_centroid_sits_at_one_third() {
        let mesh = SolidMesh::right_triangle_prism(3.0, 3.0, 1.0);
        // Right angle at (-1.5, -1.5); centroid one third of the way along each leg.
        assert!(mesh.centroid().distance(Vec3::new(-0.5, -0.5, 0.0)) < 1e-4);
    }

    #[test]
    fn hull_drops_interior_and_duplicate_points() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 0.0),
        ];
        let hull = convex_hull_2d(&pts).expect("hull");
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn hull_rejects_collinear_input() {
        let pts = [Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(convex_hull_2d(&pts).is_none());
    }

    #[test]
    fn outline_of_box_is_rectangle() {
        let outline = SolidMesh::cuboid(Vec3::new(3.0, 0.5, 1.0))
            .outline_2d()
            .expect("outline");
        assert_eq!(outline.len(), 4);
        let (lo, hi) = SolidMesh::cuboid(Vec3::new(3.0, 0.5, 1.0))
            .bounds()
            .expect("bounds");
        assert!((hi - lo).distance(Vec3::new(3.0, 0.5, 1.0)) < 1e-6);
    }
}
