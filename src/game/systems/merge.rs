//! Remerge timer: decides when a player cell may overlap its siblings.

use crate::config::WorldConfig;
use crate::error::{SimError, SimResult};
use crate::game::constants::merge::{MIN_AGE_TICKS, SECONDS_PER_SIZE};
use crate::game::entity::MergeState;
use crate::game::state::{EntityId, World};

/// Ticks a cell of `size` must live before it may remerge
pub fn time_to_remerge(size: f64, config: &WorldConfig) -> f64 {
    let secs = config
        .player_recombine_time
        .max((size * SECONDS_PER_SIZE).trunc());
    config.seconds_to_ticks(secs)
}

/// Pure state transition. The minimum-age floor wins over the override.
pub fn merge_state(age: u64, size: f64, merge_override: bool, config: &WorldConfig) -> MergeState {
    if age < MIN_AGE_TICKS {
        return MergeState::Locked;
    }
    if merge_override || age as f64 >= time_to_remerge(size, config) {
        MergeState::Eligible
    } else {
        MergeState::Pending
    }
}

/// Recompute and store a player cell's merge state for the current tick
pub fn update_remerge(world: &mut World, id: EntityId) -> SimResult<MergeState> {
    let tick = world.tick();
    let entity = world.get(id).ok_or(SimError::UnknownEntity(id))?;
    if !entity.is_player_cell() {
        return Err(SimError::NotAPlayerCell(id));
    }
    let age = entity.age(tick);

    let state = match entity.owner.and_then(|o| world.player(o)) {
        Some(owner) => merge_state(age, entity.size(), owner.merge_override, &world.config),
        // Orphaned cells never become eligible
        None if age < MIN_AGE_TICKS => MergeState::Locked,
        None => MergeState::Pending,
    };

    if let Some(cell) = world.get_mut(id).and_then(|e| e.player_cell_mut()) {
        cell.merge = state;
    }
    Ok(state)
}
