//! Own-cell collision: siblings that are not both remerge-eligible are kept
//! apart by the resolver, then the cell is held inside the border.

use crate::error::{SimError, SimResult};
use crate::game::hooks::{CollisionResolver, GameMode};
use crate::game::state::{EntityId, World};

/// Resolve a player cell against its siblings, run the mode's move hook and
/// clamp it to the border.
///
/// A cell with collision grace ticks left skips the sibling pass for this
/// tick (and burns one grace tick) so freshly split cells can fly apart.
pub fn resolve_own_cells(
    world: &mut World,
    id: EntityId,
    resolver: &mut dyn CollisionResolver,
    mode: &mut dyn GameMode,
) -> SimResult<()> {
    let entity = world.get_mut(id).ok_or(SimError::UnknownEntity(id))?;
    let owner = entity.owner;
    let in_grace = entity.collision_grace_ticks > 0;
    if in_grace {
        entity.collision_grace_ticks -= 1;
    }

    if let Some(owner) = owner.filter(|_| !in_grace) {
        let siblings = world.player(owner).map(|p| p.cells.clone()).unwrap_or_default();
        for sibling in siblings {
            if sibling == id {
                continue;
            }
            let manifold = {
                let (Some(cell), Some(other)) = (world.get(id), world.get(sibling)) else {
                    continue;
                };
                if cell.remerge_eligible() && other.remerge_eligible() {
                    continue;
                }
                resolver.check_cell_collision(cell, other)
            };
            if let Some(manifold) = manifold {
                resolver.resolve_collision(world, &manifold);
            }
        }
    }

    mode.on_cell_move(world, id);

    let border = world.config.border;
    if let Some(cell) = world.get_mut(id) {
        let r = cell.size() / 2.0;
        let pos = &mut cell.position;
        if pos.x < border.left + r {
            pos.x = border.left + r;
        }
        if pos.x > border.right - r {
            pos.x = border.right - r;
        }
        if pos.y < border.top + r {
            pos.y = border.top + r;
        }
        if pos.y > border.bottom - r {
            pos.y = border.bottom - r;
        }
    }
    Ok(())
}
