//! The fragmentation pass.
//!
//! [`SplitScheduler::fragment`] draws a target piece count, then repeatedly
//! picks a large-enough piece, samples a cutting plane through it and slices
//! it, until the target is met or the attempt budget runs out.  The original
//! solid is always destroyed at the end; whatever pieces remain are its
//! fragments.

use crate::config::DestructionConfig;
use crate::error::{DestructionError, SimResult};
use crate::fragment::{FragmentFactory, ParentTemplate};
use crate::slicing::{sample_plane, Slicer};
use crate::solid::{SolidArena, SolidId};
use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Outcome of one fragmentation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentReport {
    pub target_count: u32,
    /// Loop iterations consumed, including ones with no eligible candidate.
    pub attempts: u32,
    pub slices: u32,
    pub failed_slices: u32,
    /// Slice halves the fragment factory refused.
    pub rejected_pieces: u32,
    pub fragments: Vec<SolidId>,
}

pub struct SplitScheduler<'a> {
    config: &'a DestructionConfig,
    slicer: &'a dyn Slicer,
}

impl<'a> SplitScheduler<'a> {
    pub fn new(config: &'a DestructionConfig, slicer: &'a dyn Slicer) -> Self {
        Self { config, slicer }
    }

    /// Draw the piece count from the half-open `[min, max)` catalog range.
    pub fn target_count(&self, min: u32, max: u32, rng: &mut impl Rng) -> u32 {
        if max > min {
            rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Run one complete pass on `root` and destroy it.
    ///
    /// The caller owns the latch; this never checks `is_fragmenting`.
    pub fn fragment(
        &self,
        arena: &mut SolidArena,
        root: SolidId,
        rng: &mut impl Rng,
    ) -> SimResult<FragmentReport> {
        let solid = arena.get(root).ok_or(DestructionError::SolidNotFound {
            context: "fragment pass",
        })?;
        let name = solid.name.clone();
        let Some(template) = ParentTemplate::of(solid) else {
            arena.destroy(root);
            return Err(DestructionError::SolidNotFound {
                context: "fragment pass: body already released",
            });
        };

        let original_volume = if template.volume > 0.0 {
            template.volume
        } else {
            self.config.default_volume
        };
        let volume_floor = self.config.min_fragment_volume_fraction * original_volume;
        let factory = FragmentFactory::new(self.config);

        let mut report = FragmentReport {
            target_count: self.target_count(
                template.constants.min_fragments,
                template.constants.max_fragments,
                rng,
            ),
            ..Default::default()
        };
        let mut current = vec![root];
        let mut failures: HashMap<SolidId, u32> = HashMap::new();

        while (current.len() as u32) < report.target_count
            && report.attempts < self.config.max_slice_attempts
        {
            report.attempts += 1;

            let candidates: Vec<SolidId> = current
                .iter()
                .copied()
                .filter(|id| {
                    let large_enough = arena.get(*id).is_some_and(|s| s.volume >= volume_floor);
                    let excluded = self
                        .config
                        .max_failures_per_piece
                        .is_some_and(|limit| failures.get(id).copied().unwrap_or(0) >= limit);
                    large_enough && !excluded
                })
                .collect();
            let Some(&candidate) = candidates.choose(rng) else {
                continue;
            };

            let geometry = arena
                .get(candidate)
                .and_then(|s| Some((s.world_mesh()?, s.world_bounds()?)));
            let Some((mesh, (center, extent))) = geometry.filter(|(m, _)| !m.is_empty()) else {
                warn!("Dropping piece {:?} of {}: no usable geometry", candidate, name);
                current.retain(|id| *id != candidate);
                if candidate != root {
                    arena.destroy(candidate);
                }
                continue;
            };

            let plane = sample_plane(rng, center, extent, self.config.max_slice_tilt_deg);
            let Some(hull) = self.slicer.slice(&mesh, &plane) else {
                report.failed_slices += 1;
                *failures.entry(candidate).or_insert(0) += 1;
                debug!(
                    "Slice of piece {:?} of {} failed (attempt {})",
                    candidate, name, report.attempts
                );
                continue;
            };

            report.slices += 1;
            current.retain(|id| *id != candidate);
            for half in [hull.upper, hull.lower] {
                match factory.instantiate(arena, &template, half, rng) {
                    Ok(piece) => current.push(piece),
                    Err(_) => report.rejected_pieces += 1,
                }
            }
            if candidate != root {
                arena.destroy(candidate);
            }
        }

        arena.destroy(root);
        report.fragments = current.into_iter().filter(|id| *id != root).collect();

        if report.fragments.is_empty() {
            warn!(
                "{} destroyed without debris after {} attempts ({} failed slices)",
                name, report.attempts, report.failed_slices
            );
        } else {
            info!(
                "{} fragmented into {}/{} pieces ({} slices, {} failed, {} attempts)",
                name,
                report.fragments.len(),
                report.target_count,
                report.slices,
                report.failed_slices,
                report.attempts
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Material, StructureKind};
    use crate::geometry::{estimate_volume, SolidMesh};
    use crate::slicing::{ConvexSlicer, SlicePlane, SlicedHull};
    use crate::solid::{Body, MotionConstraints, RigidBodyParams, Solid, SolidState, VisualMaterial};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct NeverSlicer(AtomicU32);

    impl Slicer for NeverSlicer {
        fn slice(&self, _: &SolidMesh, _: &SlicePlane) -> Option<SlicedHull> {
            self.0.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Ignores the sampled plane and cuts a fixed share off the top of the
    /// piece, recording the volume of every piece it was asked to cut.
    struct TopShareSlicer {
        share: f32,
        seen: Mutex<Vec<f32>>,
    }

    impl Slicer for TopShareSlicer {
        fn slice(&self, mesh: &SolidMesh, _: &SlicePlane) -> Option<SlicedHull> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(estimate_volume(mesh, &Transform::IDENTITY));
            }
            let (lo, hi) = mesh.bounds()?;
            let y = hi.y - (hi.y - lo.y) * self.share;
            ConvexSlicer.slice(
                mesh,
                &SlicePlane {
                    point: Vec3::new(0.0, y, 0.0),
                    normal: Vec3::Y,
                },
            )
        }
    }

    fn place_wall(arena: &mut SolidArena, config: &DestructionConfig, kind: StructureKind) -> SolidId {
        let constants = *config.catalog.entry(Material::Wood, kind).expect("entry");
        let mesh = kind.mesh();
        let volume = estimate_volume(&mesh, &Transform::IDENTITY);
        arena.spawn(|id| Solid {
            id,
            name: format!("Wood_{}", kind.label()),
            material: Material::Wood,
            kind,
            split_level: 0,
            health: 0.0,
            volume,
            constants,
            is_fragmenting: true,
            state: SolidState::Fragmenting,
            parent: None,
            children: Vec::new(),
            body: Some(Body {
                mesh,
                transform: Transform::from_xyz(4.0, 1.5, 0.0),
                rigid_body: RigidBodyParams {
                    mass: 8.0,
                    drag: 0.1,
                    angular_damping: 0.05,
                    constraints: MotionConstraints::for_kind(kind),
                },
                visual: VisualMaterial::Wood,
                pending_impulse: None,
            }),
        })
    }

    #[test]
    fn target_count_is_half_open() {
        let config = DestructionConfig::default();
        let scheduler = SplitScheduler::new(&config, &ConvexSlicer);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let n = scheduler.target_count(2, 9, &mut rng);
            assert!((2..9).contains(&n));
        }
        assert_eq!(scheduler.target_count(3, 3, &mut rng), 3);
        assert_eq!(scheduler.target_count(4, 1, &mut rng), 4);
    }

    #[test]
    fn always_failing_slicer_terminates_with_no_debris() {
        let config = DestructionConfig::default();
        let slicer = NeverSlicer(AtomicU32::new(0));
        let scheduler = SplitScheduler::new(&config, &slicer);
        let mut arena = SolidArena::default();
        let root = place_wall(&mut arena, &config, StructureKind::Wall);
        let mut rng = StdRng::seed_from_u64(12);

        let report = scheduler.fragment(&mut arena, root, &mut rng).expect("pass");
        assert_eq!(report.attempts, config.max_slice_attempts);
        assert_eq!(report.failed_slices, config.max_slice_attempts);
        assert!(report.fragments.is_empty());
        assert_eq!(arena.get(root).map(|s| s.state), Some(SolidState::Destroyed));
        assert!(arena.get(root).is_some_and(|s| s.body.is_none()));
    }

    #[test]
    fn failure_limit_excludes_stuck_piece() {
        let config = DestructionConfig {
            max_failures_per_piece: Some(3),
            ..Default::default()
        };
        let slicer = NeverSlicer(AtomicU32::new(0));
        let scheduler = SplitScheduler::new(&config, &slicer);
        let mut arena = SolidArena::default();
        let root = place_wall(&mut arena, &config, StructureKind::Wall);
        let mut rng = StdRng::seed_from_u64(13);

        let report = scheduler.fragment(&mut arena, root, &mut rng).expect("pass");
        assert_eq!(slicer.0.load(Ordering::Relaxed), 3);
        assert_eq!(report.attempts, config.max_slice_attempts);
    }

    #[test]
    fn pieces_below_volume_floor_are_never_sliced() {
        let config = DestructionConfig::default();
        let slicer = TopShareSlicer {
            share: 0.1,
            seen: Mutex::new(Vec::new()),
        };
        let scheduler = SplitScheduler::new(&config, &slicer);
        let mut arena = SolidArena::default();
        let root = place_wall(&mut arena, &config, StructureKind::Wall);
        let mut rng = StdRng::seed_from_u64(14);

        let report = scheduler.fragment(&mut arena, root, &mut rng).expect("pass");
        let floor = config.min_fragment_volume_fraction * 1.5;
        let seen = slicer.seen.lock().expect("lock");
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|v| *v >= floor - 1e-4), "{seen:?}");
        assert_eq!(report.fragments.len() as u32, report.target_count);
    }

    #[test]
    fn pass_produces_target_children_of_root() {
        let config = DestructionConfig::default();
        let scheduler = SplitScheduler::new(&config, &ConvexSlicer);
        let mut arena = SolidArena::default();
        let root = place_wall(&mut arena, &config, StructureKind::Square);
        arena.drain_events();
        let mut rng = StdRng::seed_from_u64(15);

        let report = scheduler.fragment(&mut arena, root, &mut rng).expect("pass");
        assert!(!report.fragments.is_empty());
        let total: f32 = report
            .fragments
            .iter()
            .filter_map(|id| arena.get(*id))
            .map(|s| s.volume)
            .sum();
        assert!((total - 2.25).abs() < 1e-3, "total volume {total}");
        for id in &report.fragments {
            let frag = arena.get(*id).expect("fragment");
            assert_eq!(frag.parent, Some(root));
            assert_eq!(frag.split_level, 1);
            assert!(frag.is_alive());
        }

        // Intermediate pieces never reach the engine.
        let spawned: Vec<SolidId> = arena
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                crate::solid::SolidEvent::Spawned(id) => Some(id),
                crate::solid::SolidEvent::Destroyed(_) => None,
            })
            .collect();
        let mut expected = report.fragments.clone();
        expected.sort();
        let mut spawned_sorted = spawned;
        spawned_sorted.sort();
        assert_eq!(spawned_sorted, expected);

        let mut children = arena.get(root).expect("root").children.clone();
        children.sort();
        assert_eq!(children, expected, "root lineage lists only final pieces");
    }
}
