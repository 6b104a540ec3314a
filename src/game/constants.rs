//! Fixed rule constants. Tunable values live in [`crate::config::WorldConfig`].

/// Mass/size relationship: size = ceil(sqrt(MASS_TO_AREA * mass))
pub mod mass {
    pub const MASS_TO_AREA: f64 = 100.0;
    /// Pi approximation used by the eating range (size / EATING_RANGE_DIVISOR)
    pub const EATING_RANGE_DIVISOR: f64 = 3.14;
}

/// Speed curve: speed = BASE / size^EXPONENT * TIME_SCALE * CORRECTION
pub mod speed {
    pub const BASE: f64 = 2.1106;
    pub const EXPONENT: f64 = 0.449;
    /// Curve units per second at the reference 40 ms tick. Fixed, independent
    /// of the configured tick duration.
    pub const TIME_SCALE: f64 = 1.0 / 0.04;
    /// Empirical correction applied on top of the curve
    pub const CORRECTION: f64 = 2.0;
    /// Steering distance at which a cell reaches full speed
    pub const FULL_SPEED_DISTANCE: f64 = 32.0;
}

/// Move-engine (impulse) constants
pub mod movement {
    /// Default decay when none is supplied
    pub const DEFAULT_DECAY: f64 = 0.75;
    /// Player impulses below DECAY * SNAP_FACTOR are zeroed
    pub const SNAP_FACTOR: f64 = 3.0;
    /// Ticks consumed per physics step (physics runs at half rate)
    pub const TICK_STEP: f64 = 0.5;
    /// Ticks added to both ejected-mass entities when they repel
    pub const REPEL_EXTRA_TICKS: f64 = 1.0;
    /// Denominator magnitude below which segments count as parallel
    pub const PARALLEL_EPSILON: f64 = 1e-9;
}

/// Remerge timer constants
pub mod merge {
    /// Cells younger than this are never remerge-eligible
    pub const MIN_AGE_TICKS: u64 = 3;
    /// Remerge time grows by this many seconds per unit of size
    pub const SECONDS_PER_SIZE: f64 = 0.2;
}
