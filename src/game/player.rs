//! Owner context: the controller of a set of player cells.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::state::{EntityId, PlayerId};
use crate::util::vec2::Vec2;

/// Cell handles owned by a player. Inline up to the default cell cap.
pub type CellList = SmallVec<[EntityId; 16]>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerContext {
    pub id: PlayerId,
    pub name: String,
    /// Ordered cell handles; entries may refer to already-removed entities
    /// until the removal hook detaches them
    pub cells: CellList,
    /// Steering target in world coordinates
    pub mouse: Vec2,
    /// Force every cell remerge-eligible (after the minimum age)
    pub merge_override: bool,
    /// Steer cells even without a fresh mouse update
    pub should_move_cells: bool,
    /// No mouse update received since the last steering pass
    pub not_moved: bool,
    mass_dirty: bool,
    total_mass: f64,
    best_mass: f64,
}

impl PlayerContext {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            cells: CellList::new(),
            mouse: Vec2::ZERO,
            merge_override: false,
            should_move_cells: false,
            not_moved: true,
            mass_dirty: false,
            total_mass: 0.0,
            best_mass: 0.0,
        }
    }

    /// Record a new steering target
    pub fn set_mouse(&mut self, target: Vec2) {
        self.mouse = target;
        self.not_moved = false;
    }

    /// Called whenever one of this player's cells changes mass
    pub fn mass_changed(&mut self) {
        self.mass_dirty = true;
    }

    pub fn is_mass_dirty(&self) -> bool {
        self.mass_dirty
    }

    /// Store a freshly computed total; also tracks the best total seen
    pub fn update_mass_stats(&mut self, total: f64) {
        self.total_mass = total;
        if total > self.best_mass {
            self.best_mass = total;
        }
        self.mass_dirty = false;
    }

    /// Last computed total mass (see [`crate::game::state::World::refresh_player_stats`])
    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    pub fn best_mass(&self) -> f64 {
        self.best_mass
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Detach a cell handle. Returns false if it was not attached.
    pub fn detach(&mut self, id: EntityId) -> bool {
        match self.cells.iter().position(|&c| c == id) {
            Some(index) => {
                self.cells.remove(index);
                true
            }
            None => false,
        }
    }
}
