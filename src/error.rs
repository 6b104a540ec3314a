//! Error types for the simulation core and its configuration.

use crate::game::state::{EntityId, PlayerId};

/// Errors raised by entity and world operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("Invalid mass: {0} (must be finite and > 0)")]
    InvalidMass(f64),
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),
    #[error("Entity {0} is not a player cell")]
    NotAPlayerCell(EntityId),
    #[error("Tick duration {0}s cannot drive the loop")]
    InvalidTickDuration(f64),
}

/// Errors raised while loading or validating [`crate::config::WorldConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid border: left={left} right={right} top={top} bottom={bottom}")]
    InvalidBorder {
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
    },
    #[error("player_max_mass must be finite and > 0, got {0}")]
    InvalidMaxMass(f64),
    #[error("player_max_cells must be at least 1")]
    InvalidMaxCells,
    #[error("player_speed must be finite and > 0, got {0}")]
    InvalidSpeed(f64),
    #[error("tick_duration_secs must be finite and > 0, got {0}")]
    InvalidTickDuration(f64),
    #[error("player_mass_absorbed must be within 0..=1, got {0}")]
    InvalidAbsorption(f64),
    #[error("split decay must be within 0..1, got {0}")]
    InvalidDecay(f64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
