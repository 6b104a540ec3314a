//! Mass economy: growth with autosplit, and absorption on consumption.

use crate::error::{SimError, SimResult};
use crate::game::hooks::GameMode;
use crate::game::state::{EntityId, World};

/// Grow an entity by `delta`.
///
/// A player cell already above the per-cell cap whose owner still has cell
/// headroom releases the overflow by spawning a sibling with half its current
/// mass at a random angle. Either way the cell ends at
/// `min(old, max) + delta`. Returns the spawned sibling, if any.
pub fn add_mass(
    world: &mut World,
    id: EntityId,
    delta: f64,
    mode: &mut dyn GameMode,
) -> SimResult<Option<EntityId>> {
    let entity = world.get(id).ok_or(SimError::UnknownEntity(id))?;
    let old = entity.mass();
    if !entity.is_player_cell() {
        world.set_mass(id, old + delta)?;
        return Ok(None);
    }

    let max_mass = world.config.player_max_mass;
    let max_cells = world.config.player_max_cells;
    let owner = entity.owner;

    let mut spawned = None;
    if old > max_mass {
        let with_headroom = owner.filter(|&o| {
            world
                .player(o)
                .is_some_and(|p| p.cell_count() < max_cells)
        });
        if let Some(owner) = with_headroom {
            let angle = world.random_angle();
            let child = world.create_player_cell(owner, id, angle, old / 2.0, mode)?;
            tracing::debug!(
                "Cell {} autosplit at mass {:.1}, sibling {} (angle {:.3})",
                id,
                old,
                child,
                angle
            );
            spawned = Some(child);
        }
    }

    world.set_mass(id, old.min(max_mass) + delta)?;
    Ok(spawned)
}

/// Absorption factor for `consumer` eating `consumed`
fn absorption_factor(world: &World, consumed: EntityId, consumer: EntityId) -> SimResult<f64> {
    let eaten = world.get(consumed).ok_or(SimError::UnknownEntity(consumed))?;
    let eater = world.get(consumer).ok_or(SimError::UnknownEntity(consumer))?;
    if !eaten.is_player_cell() {
        return Ok(1.0);
    }

    let config = &world.config;
    let mut factor = match (eaten.owner, eater.owner) {
        (Some(a), Some(b)) if a == b => 1.0,
        _ => config.player_mass_absorbed,
    };

    let guard = &config.anti_feeder;
    if guard.enabled
        && eater.mass() >= guard.consumer_min_mass
        && eaten.mass() <= guard.consumed_max_mass
    {
        tracing::trace!(
            "Anti-feeder: {} (mass {:.1}) gains nothing from {} (mass {:.1})",
            consumer,
            eater.mass(),
            consumed,
            eaten.mass()
        );
        factor = 0.0;
    }
    Ok(factor)
}

/// Transfer `consumed`'s mass into `consumer`, scaled by the absorption
/// factor. May autosplit the consumer; returns the spawned sibling.
pub fn on_consume(
    world: &mut World,
    consumed: EntityId,
    consumer: EntityId,
    mode: &mut dyn GameMode,
) -> SimResult<Option<EntityId>> {
    let factor = absorption_factor(world, consumed, consumer)?;
    let mass = world
        .get(consumed)
        .map(|e| e.mass())
        .ok_or(SimError::UnknownEntity(consumed))?;
    add_mass(world, consumer, factor * mass, mode)
}

/// Full eat: record the killer, transfer mass, then remove the consumed entity
pub fn consume(
    world: &mut World,
    consumer: EntityId,
    consumed: EntityId,
    mode: &mut dyn GameMode,
) -> SimResult<Option<EntityId>> {
    if consumer == consumed {
        return Ok(None);
    }
    if !world.contains(consumer) {
        return Err(SimError::UnknownEntity(consumer));
    }
    let eaten = world.get_mut(consumed).ok_or(SimError::UnknownEntity(consumed))?;
    eaten.killer = Some(consumer);

    let spawned = on_consume(world, consumed, consumer, mode)?;
    world.remove(consumed, mode);
    Ok(spawned)
}
