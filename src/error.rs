//! Destruction-specific error types.
//!
//! Geometry and lookup failures surface as [`DestructionError`] values so a
//! fragmentation pass can log, drop the offending piece, and keep going
//! instead of panicking mid-frame.
//!
//! ## Usage
//!
//! ```rust
//! use siegeworks::error::{DestructionError, SimResult};
//!
//! fn checked_volume(volume: f32) -> SimResult<f32> {
//!     if volume <= 0.0 {
//!         return Err(DestructionError::DegenerateVolume { volume });
//!     }
//!     Ok(volume)
//! }
//! # assert!(checked_volume(0.0).is_err());
//! ```

use crate::catalog::{Material, StructureKind};
use std::fmt;

/// Top-level error enum for the destruction engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DestructionError {
    /// A mesh handed to the fragment factory or slicer had no usable triangles.
    InvalidGeometry {
        /// Where the mesh came from (for logging).
        context: &'static str,
        /// Triangle count that was found.
        triangle_count: usize,
    },

    /// A piece's estimated volume fell at or below the degenerate floor.
    DegenerateVolume {
        /// The rejected volume in m³.
        volume: f32,
    },

    /// A solid handle did not resolve to a live record in the arena.
    SolidNotFound {
        /// Human-readable description of where the lookup occurred.
        context: &'static str,
    },

    /// The catalog has no constants for a (material, kind) pair.
    MissingCatalogEntry { material: Material, kind: StructureKind },

    /// Configuration constant is outside its safe operating range.
    UnsafeConstant {
        /// Name of the constant (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },

    /// A catalog entry's fragment-count range is unusable.
    InvalidFragmentRange { min: u32, max: u32 },
}

impl fmt::Display for DestructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestructionError::InvalidGeometry {
                context,
                triangle_count,
            } => write!(
                f,
                "invalid geometry from '{}': {} triangles",
                context, triangle_count
            ),
            DestructionError::DegenerateVolume { volume } => {
                write!(f, "degenerate piece volume {:.3e} m³", volume)
            }
            DestructionError::SolidNotFound { context } => {
                write!(f, "solid not found during '{}'", context)
            }
            DestructionError::MissingCatalogEntry { material, kind } => write!(
                f,
                "no catalog entry for {} {}",
                material.label(),
                kind.label()
            ),
            DestructionError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "constant '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
            DestructionError::InvalidFragmentRange { min, max } => write!(
                f,
                "fragment range [{}, {}) must have min ≥ 1 and max ≥ min",
                min, max
            ),
        }
    }
}

impl std::error::Error for DestructionError {}

/// Convenience alias: a `Result` using `DestructionError` as the error type.
pub type SimResult<T> = Result<T, DestructionError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error if `fraction` is not within `[0, 1)`.
///
/// A floor of 1.0 or more would exclude the intact solid itself and no slice
/// would ever run.
pub fn validate_volume_fraction(value: f32) -> SimResult<()> {
    if !(0.0..1.0).contains(&value) {
        Err(DestructionError::UnsafeConstant {
            name: "MIN_FRAGMENT_VOLUME_FRACTION",
            value,
            safe_range: "[0.0, 1.0)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if the plane tilt is outside `[0, 90)` degrees.
pub fn validate_slice_tilt(value: f32) -> SimResult<()> {
    if !(0.0..90.0).contains(&value) {
        Err(DestructionError::UnsafeConstant {
            name: "MAX_SLICE_TILT_DEG",
            value,
            safe_range: "[0.0, 90.0)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if `value` is not strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> SimResult<()> {
    if value <= 0.0 || !value.is_finite() {
        Err(DestructionError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if `value` is negative or not finite.
pub fn validate_non_negative(name: &'static str, value: f32) -> SimResult<()> {
    if value < 0.0 || !value.is_finite() {
        Err(DestructionError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, ∞)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if a lineage may not split at all.
pub fn validate_split_level(max_split_level: u32) -> SimResult<()> {
    if max_split_level == 0 {
        Err(DestructionError::UnsafeConstant {
            name: "MAX_SPLIT_LEVEL",
            value: 0.0,
            safe_range: "[1, ∞)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error unless `1 ≤ min ≤ max`.
pub fn validate_fragment_range(min: u32, max: u32) -> SimResult<()> {
    if min == 0 || max < min {
        Err(DestructionError::InvalidFragmentRange { min, max })
    } else {
        Ok(())
    }
}
