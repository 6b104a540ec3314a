//! Simulated entities: player cells, food, viruses and ejected mass.
//!
//! Every entity shares the same geometric state (mass-derived size, position,
//! move-engine impulse). Player cells additionally carry a [`PlayerCell`]
//! payload; behaviour dispatches on [`EntityKind`] rather than on subtypes.

use serde::{Deserialize, Serialize};

use crate::config::WorldConfig;
use crate::error::{SimError, SimResult};
use crate::game::constants::{self, movement, speed};
use crate::game::state::{EntityId, PlayerId};
use crate::util::vec2::Vec2;

/// Wire-level type tag
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Player = 0,
    Food = 1,
    Virus = 2,
    EjectedMass = 3,
}

/// Remerge gate of a player cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeState {
    /// Younger than the minimum age; never eligible
    #[default]
    Locked,
    /// Old enough, waiting for the time-to-remerge
    Pending,
    /// May overlap siblings without colliding
    Eligible,
}

/// Player-controlled specialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerCell {
    /// Written only by the merge timer
    pub merge: MergeState,
}

impl PlayerCell {
    pub fn remerge_eligible(&self) -> bool {
        self.merge == MergeState::Eligible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Player(PlayerCell),
    Food,
    Virus,
    EjectedMass,
}

impl EntityKind {
    pub fn player() -> Self {
        EntityKind::Player(PlayerCell::default())
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            EntityKind::Player(_) => CellType::Player,
            EntityKind::Food => CellType::Food,
            EntityKind::Virus => CellType::Virus,
            EntityKind::EjectedMass => CellType::EjectedMass,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self { r: 0, g: 255, b: 0 }
    }
}

/// Self-decaying directional impulse (split cells, ejected mass)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveEngine {
    pub speed: f64,
    pub ticks_remaining: f64,
    pub decay: f64,
    /// Heading, see [`Vec2::from_heading`]
    pub angle: f64,
}

impl Default for MoveEngine {
    fn default() -> Self {
        Self {
            speed: 0.0,
            ticks_remaining: 0.0,
            decay: 0.85,
            angle: 0.0,
        }
    }
}

impl MoveEngine {
    pub fn is_active(&self) -> bool {
        self.ticks_remaining > 0.0
    }
}

/// Axis-aligned viewport in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ViewBox {
    pub fn around(center: Vec2, half_width: f64, half_height: f64) -> Self {
        Self {
            left: center.x - half_width,
            top: center.y - half_height,
            right: center.x + half_width,
            bottom: center.y + half_height,
        }
    }
}

/// Viewport classification used by the update encoder
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Hidden = 0,
    Clear = 1,
    /// Visible but overlapping one of the viewer's own cells
    OverlapsOwnCell = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub owner: Option<PlayerId>,
    pub kind: EntityKind,
    pub position: Vec2,
    pub color: Color,
    mass: f64,
    size: f64,
    square_size: f64,
    pub spiked: bool,
    /// Entity that consumed this one; set once at removal
    pub killer: Option<EntityId>,
    pub motion: MoveEngine,
    /// Ticks left before own-cell collision applies to this entity
    pub collision_grace_ticks: u32,
    pub birth_tick: u64,
}

impl Entity {
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        owner: Option<PlayerId>,
        position: Vec2,
        mass: f64,
        birth_tick: u64,
    ) -> SimResult<Self> {
        let mut entity = Self {
            id,
            owner,
            kind,
            position,
            color: Color::default(),
            mass: 0.0,
            size: 0.0,
            square_size: 0.0,
            spiked: matches!(kind, EntityKind::Virus),
            killer: None,
            motion: MoveEngine::default(),
            collision_grace_ticks: 0,
            birth_tick,
        };
        entity.set_mass(mass)?;
        Ok(entity)
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn size(&self) -> f64 {
        self.size
    }

    #[inline]
    pub fn square_size(&self) -> f64 {
        self.square_size
    }

    /// Replace mass and recompute size/square_size together.
    ///
    /// Owner bookkeeping is done by [`crate::game::state::World::set_mass`].
    pub fn set_mass(&mut self, mass: f64) -> SimResult<()> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::InvalidMass(mass));
        }
        self.mass = mass;
        self.size = (constants::mass::MASS_TO_AREA * mass).sqrt().ceil();
        self.square_size = self.size * self.size;
        Ok(())
    }

    pub fn cell_type(&self) -> CellType {
        self.kind.cell_type()
    }

    pub fn is_player_cell(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }

    pub fn player_cell(&self) -> Option<&PlayerCell> {
        match &self.kind {
            EntityKind::Player(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn player_cell_mut(&mut self) -> Option<&mut PlayerCell> {
        match &mut self.kind {
            EntityKind::Player(cell) => Some(cell),
            _ => None,
        }
    }

    /// False for anything that is not a player cell
    pub fn remerge_eligible(&self) -> bool {
        self.player_cell().is_some_and(PlayerCell::remerge_eligible)
    }

    pub fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.birth_tick)
    }

    /// Movement speed per tick; larger cells are slower. Only the global
    /// `player_speed` multiplier is read from the config.
    pub fn speed(&self, config: &WorldConfig) -> f64 {
        let curve = speed::BASE / self.size.powf(speed::EXPONENT);
        curve * speed::TIME_SCALE * config.player_speed * speed::CORRECTION
    }

    /// Distance within which this entity may swallow another
    pub fn eating_range(&self) -> f64 {
        match self.kind {
            EntityKind::Player(_) => self.size / constants::mass::EATING_RANGE_DIVISOR,
            _ => 0.0,
        }
    }

    /// Start a new impulse. `decay` falls back to the engine default when absent or NaN.
    pub fn set_move_engine(&mut self, speed: f64, ticks: f64, decay: Option<f64>) {
        self.motion.speed = speed;
        self.motion.ticks_remaining = ticks;
        self.motion.decay = decay
            .filter(|d| !d.is_nan())
            .unwrap_or(movement::DEFAULT_DECAY);
    }

    /// Point-in-rectangle test on the centre only (strict bounds)
    pub fn collision_check_aabb(&self, view: &ViewBox) -> bool {
        self.position.x > view.left
            && self.position.x < view.right
            && self.position.y > view.top
            && self.position.y < view.bottom
    }

    /// Approximate "swallowed by a larger circle" test without sqrt.
    ///
    /// Drops the 2*d*r cross term, so it is biased and asymmetric. Only for
    /// visibility hints; use [`Entity::overlaps`] for real overlap.
    pub fn collision_check_circle_approx(&self, other_square_size: f64, other_position: Vec2) -> bool {
        let dx = self.position.x - other_position.x;
        let dy = self.position.y - other_position.y;
        dx * dx + dy * dy + self.square_size <= other_square_size
    }

    /// Symmetric circular overlap: dx² + dy² < (r1 + r2)²
    pub fn overlaps(&self, other: &Entity) -> bool {
        let r = self.size + other.size;
        self.position.distance_sq_to(other.position) < r * r
    }

    /// Cheap box pre-filter with half-width `trunc(2d)`
    pub fn simple_collide(&self, other_position: Vec2, d: f64) -> bool {
        let len = (2.0 * d).trunc();
        (self.position.x - other_position.x).abs() < len && (self.position.y - other_position.y).abs() < len
    }

    /// Classify this entity against a viewer's viewport and own cells.
    ///
    /// Food is treated as a point; everything else by its bounding square.
    pub fn visible_in_viewport<'a>(
        &self,
        view: &ViewBox,
        own_cells: impl IntoIterator<Item = &'a Entity>,
    ) -> Visibility {
        let in_view = if self.cell_type() == CellType::Food {
            self.collision_check_aabb(view)
        } else {
            let s = self.size;
            view.left - (self.position.x + s) < 0.0
                && view.top - (self.position.y + s) < 0.0
                && (self.position.x - s) - view.right < 0.0
                && (self.position.y - s) - view.bottom < 0.0
        };
        if !in_view {
            return Visibility::Hidden;
        }

        if own_cells.into_iter().any(|cell| cell.overlaps(self)) {
            Visibility::OverlapsOwnCell
        } else {
            Visibility::Clear
        }
    }
}
