use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Env var naming an optional JSON config file
pub const CONFIG_PATH_ENV: &str = "CELL_ARENA_CONFIG";

/// Rectangular world border (y grows downwards: top < bottom)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: 6000.0,
            bottom: 6000.0,
        }
    }
}

impl Border {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Guard against large cells farming tiny "feeder" cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntiFeederConfig {
    pub enabled: bool,
    /// Consumer mass at or above which the guard applies
    pub consumer_min_mass: f64,
    /// Consumed mass at or below which the guard applies
    pub consumed_max_mass: f64,
}

impl Default for AntiFeederConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            consumer_min_mass: 625.0,
            consumed_max_mass: 17.0,
        }
    }
}

/// Impulse given to a cell spawned by a split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Launch speed as a multiple of the source cell's speed
    pub speed_multiplier: f64,
    pub move_ticks: f64,
    pub decay: f64,
    /// Ticks both cells skip own-cell collision after the split
    pub collision_grace_ticks: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 6.0,
            move_ticks: 32.0,
            decay: 0.85,
            collision_grace_ticks: 12,
        }
    }
}

/// World configuration consumed by the simulation core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub border: Border,
    /// Per-cell mass cap; cells above it autosplit when gaining mass
    pub player_max_mass: f64,
    pub player_max_cells: usize,
    /// Global speed multiplier
    pub player_speed: f64,
    /// Base time-to-remerge in seconds
    pub player_recombine_time: f64,
    /// Fraction of mass absorbed when eating another player's cell
    pub player_mass_absorbed: f64,
    pub anti_feeder: AntiFeederConfig,
    pub tick_duration_secs: f64,
    pub split: SplitConfig,
    /// Seed for the world RNG (random when absent)
    pub rng_seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            border: Border::default(),
            player_max_mass: 22500.0,
            player_max_cells: 16,
            player_speed: 1.0,
            player_recombine_time: 30.0,
            player_mass_absorbed: 0.7,
            anti_feeder: AntiFeederConfig::default(),
            tick_duration_secs: 0.040,
            split: SplitConfig::default(),
            rng_seed: None,
        }
    }
}

impl WorldConfig {
    /// Load config from an optional JSON file and the environment, or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(std::env::var(CONFIG_PATH_ENV).ok().as_deref())
    }

    /// Same as [`WorldConfig::load_or_default`] with an explicit config file path
    pub fn load_from(path: Option<&str>) -> Self {
        let mut config = match path {
            Some(path) => match Self::from_json_file(path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to load config file '{}': {}, using defaults", path, e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env();

        if let Err(e) = config.validate() {
            tracing::warn!("Invalid configuration ({}), falling back to defaults", e);
            return Self::default();
        }

        config
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        override_from_env("BORDER_LEFT", &mut self.border.left, |v| v.is_finite());
        override_from_env("BORDER_TOP", &mut self.border.top, |v| v.is_finite());
        override_from_env("BORDER_RIGHT", &mut self.border.right, |v| v.is_finite());
        override_from_env("BORDER_BOTTOM", &mut self.border.bottom, |v| v.is_finite());
        override_from_env("PLAYER_MAX_MASS", &mut self.player_max_mass, |v| *v > 0.0);
        override_from_env("PLAYER_MAX_CELLS", &mut self.player_max_cells, |v| *v > 0);
        override_from_env("PLAYER_SPEED", &mut self.player_speed, |v| *v > 0.0);
        override_from_env("PLAYER_RECOMBINE_TIME", &mut self.player_recombine_time, |v| *v >= 0.0);
        override_from_env("PLAYER_MASS_ABSORBED", &mut self.player_mass_absorbed, |v| {
            (0.0..=1.0).contains(v)
        });

        let mut bot_grow: u8 = u8::from(self.anti_feeder.enabled);
        override_from_env("PLAYER_BOT_GROW_ENABLED", &mut bot_grow, |v| *v <= 1);
        self.anti_feeder.enabled = bot_grow == 1;

        let tick_ms = parse_env::<u64>("TICK_DURATION_MS", self.tick_duration_secs * 1000.0, |v| {
            *v > 0 && *v <= 1000
        });
        if let Some(ms) = tick_ms {
            self.tick_duration_secs = ms as f64 / 1000.0;
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.border;
        let finite = b.left.is_finite() && b.right.is_finite() && b.top.is_finite() && b.bottom.is_finite();
        if !finite || b.left >= b.right || b.top >= b.bottom {
            return Err(ConfigError::InvalidBorder {
                left: b.left,
                right: b.right,
                top: b.top,
                bottom: b.bottom,
            });
        }
        if !(self.player_max_mass.is_finite() && self.player_max_mass > 0.0) {
            return Err(ConfigError::InvalidMaxMass(self.player_max_mass));
        }
        if self.player_max_cells == 0 {
            return Err(ConfigError::InvalidMaxCells);
        }
        if !(self.player_speed.is_finite() && self.player_speed > 0.0) {
            return Err(ConfigError::InvalidSpeed(self.player_speed));
        }
        if !(self.tick_duration_secs.is_finite() && self.tick_duration_secs > 0.0) {
            return Err(ConfigError::InvalidTickDuration(self.tick_duration_secs));
        }
        if !(0.0..=1.0).contains(&self.player_mass_absorbed) {
            return Err(ConfigError::InvalidAbsorption(self.player_mass_absorbed));
        }
        if !(0.0..1.0).contains(&self.split.decay) {
            return Err(ConfigError::InvalidDecay(self.split.decay));
        }
        Ok(())
    }

    /// Convert a duration in seconds to (fractional) simulation ticks
    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        seconds / self.tick_duration_secs
    }
}

/// Read and parse `key`. Returns `None` when unset, unparsable or rejected
/// by `accept`; the last two log a warning naming the `current` value kept.
fn parse_env<T>(key: &str, current: impl Display, accept: impl Fn(&T) -> bool) -> Option<T>
where
    T: FromStr + Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(parsed) if accept(&parsed) => Some(parsed),
        Ok(parsed) => {
            tracing::warn!("{} value {} out of range, using {}", key, parsed, current);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using {}", key, raw, current);
            None
        }
    }
}

fn override_from_env<T>(key: &str, slot: &mut T, accept: impl Fn(&T) -> bool)
where
    T: FromStr + Display,
{
    if let Some(value) = parse_env(key, &*slot, accept) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert_eq!(config.player_max_cells, 16);
        assert_eq!(config.player_max_mass, 22500.0);
        assert!((config.tick_duration_secs - 0.04).abs() < 1e-12);
        assert!(config.anti_feeder.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_border() {
        let mut config = WorldConfig::default();
        config.border.left = 100.0;
        config.border.right = 50.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBorder { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = WorldConfig::default();
        config.player_max_cells = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxCells)));

        let mut config = WorldConfig::default();
        config.player_mass_absorbed = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAbsorption(_))));

        let mut config = WorldConfig::default();
        config.tick_duration_secs = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTickDuration(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WorldConfig::from_json_str(r#"{ "player_max_cells": 8, "rng_seed": 7 }"#).unwrap();
        assert_eq!(config.player_max_cells, 8);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.player_recombine_time, 30.0);
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = WorldConfig::from_json_str(r#"{ "player_speed": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSpeed(_)));
        assert!(WorldConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_seconds_to_ticks() {
        let config = WorldConfig::default();
        assert!((config.seconds_to_ticks(30.0) - 750.0).abs() < 1e-9);
    }

    fn write_temp_config(name: &str, raw: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("cell-arena-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, raw).unwrap();
        path
    }

    #[test]
    fn test_load_keeps_file_tick_duration() {
        let path = write_temp_config("tick", r#"{ "tick_duration_secs": 0.0125, "player_max_cells": 8 }"#);
        let config = WorldConfig::load_from(path.to_str());
        std::fs::remove_file(&path).ok();
        assert_eq!(config.tick_duration_secs, 0.0125);
        assert_eq!(config.player_max_cells, 8);
    }

    #[test]
    fn test_load_keeps_sub_millisecond_tick() {
        let path = write_temp_config("fine-tick", r#"{ "tick_duration_secs": 0.0004, "player_max_cells": 8 }"#);
        let config = WorldConfig::load_from(path.to_str());
        std::fs::remove_file(&path).ok();
        assert_eq!(config.tick_duration_secs, 0.0004);
        assert_eq!(config.player_max_cells, 8);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = WorldConfig::load_from(Some("/nonexistent/cell-arena.json"));
        assert_eq!(config.player_max_cells, 16);
    }

    #[test]
    fn test_load_or_default() {
        let config = WorldConfig::load_or_default();
        assert!(config.validate().is_ok());
    }
}
