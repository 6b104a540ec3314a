//! Fixed-tick driver.
//!
//! Each tick runs the player-cell pass (remerge timer, steering, own-cell
//! collision), then the move-engine pass over the moving registry, then
//! refreshes owner aggregates and closes the tick.

use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::game::hooks::{CollisionResolver, GameMode};
use crate::game::state::World;
use crate::game::systems::{collision, merge, movement};

/// Advance the world by exactly one tick
pub fn run_tick(
    world: &mut World,
    mode: &mut dyn GameMode,
    resolver: &mut dyn CollisionResolver,
) -> SimResult<()> {
    let cells = world.player_nodes().to_vec();
    for id in cells {
        let Some(owner) = world.get(id).map(|cell| cell.owner) else {
            continue;
        };
        merge::update_remerge(world, id)?;
        if let Some(target) = owner.and_then(|o| world.player(o)).map(|p| p.mouse) {
            movement::move_toward(world, id, target)?;
        }
        collision::resolve_own_cells(world, id, resolver, mode)?;
    }

    movement::update(world, mode)?;

    world.refresh_player_stats();
    world.end_tick();
    Ok(())
}

/// Drive the world on a wall-clock interval.
///
/// Runs `max_ticks` ticks, or forever when `None`. Late ticks are skipped
/// rather than bunched up. Fails before the first tick if the configured
/// tick duration is not a usable positive period.
pub async fn run(
    world: &mut World,
    mode: &mut dyn GameMode,
    resolver: &mut dyn CollisionResolver,
    max_ticks: Option<u64>,
) -> SimResult<()> {
    let secs = world.config.tick_duration_secs;
    let budget = Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or(SimError::InvalidTickDuration(secs))?;
    let mut ticker = interval(budget);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Simulation loop started at {:.1} Hz",
        1.0 / world.config.tick_duration_secs
    );
    let mut ran: u64 = 0;

    loop {
        if max_ticks.is_some_and(|max| ran >= max) {
            break;
        }
        ticker.tick().await;

        let started = Instant::now();
        run_tick(world, mode, resolver)?;
        let elapsed = started.elapsed();
        if elapsed > budget {
            warn!(
                "Tick {} took {:?}, over the {:?} budget",
                world.tick(),
                elapsed,
                budget
            );
        }
        ran += 1;

        if world.tick() % 250 == 0 {
            debug!(
                "Tick {}: {} entities, {} moving",
                world.tick(),
                world.entity_count(),
                world.moving_nodes().len()
            );
        }
    }

    info!("Simulation loop stopped after {} ticks", ran);
    Ok(())
}
