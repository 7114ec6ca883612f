//! Centralised destruction and gameplay constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place.  [`crate::config::DestructionConfig`] mirrors them
//! and may override any subset from `assets/destruction.toml`.
//!
//! ## Tuning guidance
//!
//! Each constant notes the observable consequence of changing it.  World units
//! are metres; the renderer and Rapier work in pixels (see [`PIXELS_PER_METER`]).

// ── Fragmentation: Retry Budget ───────────────────────────────────────────────

/// Upper bound on slice attempts in one fragmentation pass.
///
/// Every loop iteration consumes one attempt, including iterations where no
/// candidate was large enough to slice.  This is the termination guarantee.
pub const MAX_SLICE_ATTEMPTS: u32 = 200;

/// Pieces smaller than this fraction of the original solid's volume are never
/// sliced again within the same pass.
///
/// Raising it yields fewer, chunkier fragments; lowering it lets a lucky
/// sequence of cuts produce slivers.
pub const MIN_FRAGMENT_VOLUME_FRACTION: f32 = 0.15;

/// Maximum tilt of a cutting plane away from horizontal, in degrees.
pub const MAX_SLICE_TILT_DEG: f32 = 45.0;

/// Fragments are nudged by up to this distance on X and Y when instantiated
/// so coincident faces do not start in perfect contact.
pub const FRAGMENT_POSITION_JITTER: f32 = 0.01;

/// Substitute volume used when a parent's estimated volume is zero.
pub const DEFAULT_VOLUME: f32 = 1.0;

// ── Fragmentation: Geometry ───────────────────────────────────────────────────

/// Signed-distance band treated as lying on the cutting plane.
pub const SLICE_EPSILON: f32 = 1e-5;

/// Fragments at or below this volume (m³) are rejected as degenerate.
pub const MIN_PIECE_VOLUME: f32 = 1e-6;

// ── Goal ──────────────────────────────────────────────────────────────────────

/// Starting and maximum health of the defended goal.
pub const GOAL_MAX_HEALTH: f32 = 1000.0;

/// Seconds after the attack begins before a surviving goal counts as a win.
pub const WIN_CHECK_DELAY_SECS: f32 = 10.0;

// ── Economy ───────────────────────────────────────────────────────────────────

/// Total cost of placed structures allowed during the build phase.
pub const BUDGET_MAX: f32 = 2000.0;

// ── Rendering / Physics Bridge ────────────────────────────────────────────────

/// Pixels per world metre.  Passed to `RapierPhysicsPlugin::pixels_per_meter`
/// and used to scale solid meshes into entity space.
pub const PIXELS_PER_METER: f32 = 50.0;

/// Outline points closer than this (m) are merged before hull construction so
/// Rapier's `Collider::convex_hull` never receives coincident vertices.
pub const HULL_DEDUP_MIN_DIST: f32 = 1e-3;

// ── Projectiles ───────────────────────────────────────────────────────────────

/// Mass of one cannon ball (kg).  Damage scales linearly with it.
pub const CANNONBALL_MASS: f32 = 20.0;

/// Cannon ball radius (m).
pub const CANNONBALL_RADIUS: f32 = 0.2;

/// Seconds before a cannon ball that hit nothing is despawned.
pub const CANNONBALL_LIFETIME_SECS: f32 = 8.0;

/// Mass of the goal body (kg), used when it strikes a structure.
pub const GOAL_MASS: f32 = 5.0;
