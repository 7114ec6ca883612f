//! Runtime destruction configuration loaded from `assets/destruction.toml`.
//!
//! [`DestructionConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`] plus the [`StructureCatalog`].  At startup,
//! [`load_destruction_config`] reads `assets/destruction.toml` and overwrites
//! the defaults with any values present in the file.  Missing keys fall back to
//! the compile-time defaults, so a minimal TOML can override just the values
//! you care about.
//!
//! ## Tuning workflow
//!
//! 1. Edit `assets/destruction.toml`.
//! 2. Restart the game.  No recompilation required.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `DestructionConfig::default()`.

use crate::catalog::{Material, StructureCatalog, StructureKind};
use crate::constants::*;
use crate::error::{
    validate_fragment_range, validate_non_negative, validate_positive, validate_slice_tilt,
    validate_split_level, validate_volume_fraction, DestructionError, SimResult,
};
use bevy::prelude::*;
use serde::Deserialize;

pub const CONFIG_PATH: &str = "assets/destruction.toml";

/// Runtime-tunable destruction and gameplay configuration.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DestructionConfig {
    // ── Fragmentation ─────────────────────────────────────────────────────────
    pub max_slice_attempts: u32,
    pub min_fragment_volume_fraction: f32,
    pub max_slice_tilt_deg: f32,
    pub fragment_position_jitter: f32,
    pub default_volume: f32,
    /// Exclude a piece from the current pass after this many failed slices.
    /// `None` keeps retrying it until the attempt budget runs out.
    pub max_failures_per_piece: Option<u32>,

    // ── Geometry ──────────────────────────────────────────────────────────────
    pub min_piece_volume: f32,

    // ── Goal / Win Check ──────────────────────────────────────────────────────
    pub goal_max_health: f32,
    pub win_check_delay_secs: f32,

    // ── Economy ───────────────────────────────────────────────────────────────
    pub budget_max: f32,

    // ── Engine Bridge ─────────────────────────────────────────────────────────
    pub pixels_per_meter: f32,

    // ── Catalog ───────────────────────────────────────────────────────────────
    pub catalog: StructureCatalog,
}

impl Default for DestructionConfig {
    fn default() -> Self {
        Self {
            max_slice_attempts: MAX_SLICE_ATTEMPTS,
            min_fragment_volume_fraction: MIN_FRAGMENT_VOLUME_FRACTION,
            max_slice_tilt_deg: MAX_SLICE_TILT_DEG,
            fragment_position_jitter: FRAGMENT_POSITION_JITTER,
            default_volume: DEFAULT_VOLUME,
            max_failures_per_piece: None,
            min_piece_volume: MIN_PIECE_VOLUME,
            goal_max_health: GOAL_MAX_HEALTH,
            win_check_delay_secs: WIN_CHECK_DELAY_SECS,
            budget_max: BUDGET_MAX,
            pixels_per_meter: PIXELS_PER_METER,
            catalog: StructureCatalog::default(),
        }
    }
}

impl DestructionConfig {
    /// Check every value against its safe range.
    ///
    /// Catalog rows are validated too; a missing (material, kind) pair is an
    /// error because placement would fail for it.
    pub fn validate(&self) -> SimResult<()> {
        validate_volume_fraction(self.min_fragment_volume_fraction)?;
        validate_slice_tilt(self.max_slice_tilt_deg)?;
        validate_positive("DEFAULT_VOLUME", self.default_volume)?;
        validate_positive("MIN_PIECE_VOLUME", self.min_piece_volume)?;
        validate_positive("GOAL_MAX_HEALTH", self.goal_max_health)?;
        validate_positive("PIXELS_PER_METER", self.pixels_per_meter)?;
        if self.max_slice_attempts == 0 {
            return Err(DestructionError::UnsafeConstant {
                name: "MAX_SLICE_ATTEMPTS",
                value: 0.0,
                safe_range: "[1, ∞)",
            });
        }
        for material in Material::ALL {
            for kind in StructureKind::ALL {
                let entry = self
                    .catalog
                    .entry(material, kind)
                    .ok_or(DestructionError::MissingCatalogEntry { material, kind })?;
                validate_fragment_range(entry.min_fragments, entry.max_fragments)?;
                validate_split_level(entry.max_split_level)?;
                validate_positive("HEALTH", entry.health)?;
                validate_positive("BASE_FRAGMENT_HEALTH", entry.base_fragment_health)?;
                validate_positive("FRAGMENT_HEALTH_MULTIPLIER", entry.fragment_health_multiplier)?;
                validate_non_negative("DAMAGE_FACTOR", entry.damage_factor)?;
                validate_non_negative("EXPLOSION_FORCE", entry.explosion_force)?;
                validate_non_negative("COST", entry.cost)?;
            }
        }
        Ok(())
    }
}

/// Startup system: overwrite the default config with `assets/destruction.toml`.
pub fn load_destruction_config(mut config: ResMut<DestructionConfig>) {
    if let Some(loaded) = read_config_file(CONFIG_PATH) {
        *config = loaded;
    }
}

/// Read and validate a config file.  Returns `None` (keep defaults) when the
/// file is absent, unparsable, or out of range.
pub fn read_config_file(path: &str) -> Option<DestructionConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => {
            // Not an error: defaults are already in place.
            info!("No {path} found; using compiled defaults");
            return None;
        }
    };
    parse_config(&contents)
        .map_err(|e| warn!("Failed to load {path}: {e}; using defaults"))
        .ok()
        .inspect(|_| info!("Loaded destruction config from {path}"))
}

/// Parse and validate config text.
pub fn parse_config(contents: &str) -> Result<DestructionConfig, String> {
    let config: DestructionConfig = toml::from_str(contents).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DestructionConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = parse_config("max_slice_attempts = 50\nmax_failures_per_piece = 4\n")
            .expect("parse");
        assert_eq!(config.max_slice_attempts, 50);
        assert_eq!(config.max_failures_per_piece, Some(4));
        assert_eq!(config.budget_max, BUDGET_MAX);
        assert_eq!(config.catalog, StructureCatalog::default());
    }

    /// Eight catalog rows with the given split ceiling and fragment health.
    fn catalog_toml(max_split_level: u32, base_fragment_health: f32) -> String {
        let mut text = String::new();
        for material in ["Wood", "Stone"] {
            for kind in ["Wall", "Square", "Slab", "RightTriangle"] {
                text.push_str(&format!(
                    "[[catalog.entries]]\nmaterial = \"{material}\"\nkind = \"{kind}\"\n\
                     cost = 10.0\nhealth = 40.0\ndamage_factor = 1.0\nmin_fragments = 2\n\
                     max_fragments = 4\nexplosion_force = 5.0\n\
                     base_fragment_health = {base_fragment_health:.1}\n\
                     fragment_health_multiplier = 2.0\nmax_split_level = {max_split_level}\n\n"
                ));
            }
        }
        text
    }

    #[test]
    fn catalog_rows_parse_from_toml() {
        let config = parse_config(&catalog_toml(1, 20.0)).expect("parse");
        let entry = config
            .catalog
            .entry(Material::Stone, StructureKind::Slab)
            .expect("row");
        assert_eq!(entry.cost, 10.0);
        assert_eq!(entry.max_split_level, 1);
        // Material physics were not given and keep their defaults.
        assert_eq!(config.catalog.stone.mass, 20.0);
    }

    #[test]
    fn catalog_rows_that_cannot_split_or_survive_are_rejected() {
        assert!(parse_config(&catalog_toml(0, 20.0)).is_err());
        assert!(parse_config(&catalog_toml(1, 0.0)).is_err());
        assert!(parse_config(&catalog_toml(1, -5.0)).is_err());

        let mut config = DestructionConfig::default();
        for record in config.catalog.entries.iter_mut() {
            record.entry.damage_factor = -1.0;
        }
        assert!(config.validate().is_err());

        let mut config = DestructionConfig::default();
        config.catalog.entries[0].entry.explosion_force = -10.0;
        assert!(config.validate().is_err());

        let mut config = DestructionConfig::default();
        config.catalog.entries[3].entry.health = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(parse_config("min_fragment_volume_fraction = 1.5").is_err());
        assert!(parse_config("max_slice_attempts = 0").is_err());
        assert!(parse_config("[catalog]\nentries = []").is_err());
        assert!(parse_config("not toml at all [").is_err());
    }
}
