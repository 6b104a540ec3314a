//! Collaborator seams: game-mode rule hooks and the collision resolver.
//!
//! The world loop owns concrete implementations and passes them by reference
//! into each core operation; nothing here is stored globally.

use crate::game::entity::Entity;
use crate::game::state::{EntityId, World};
use crate::util::vec2::Vec2;

/// Game-mode rule hooks. All methods default to no-ops.
pub trait GameMode {
    fn on_cell_add(&mut self, _cell: &Entity) {}

    fn on_cell_remove(&mut self, _cell: &Entity) {}

    /// Per-move rule effects, after own-cell collision and before the border clamp
    fn on_cell_move(&mut self, _world: &mut World, _cell: EntityId) {}

    /// Custom per-tick behaviour for self-propelled entities
    fn on_auto_move(&mut self, _world: &mut World, _entity: EntityId) {}

    /// The entity's impulse is exhausted
    fn on_move_done(&mut self, _world: &mut World, _entity: EntityId) {}
}

/// Plain free-for-all with no extra rules
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGameMode;

impl GameMode for NoopGameMode {}

/// Overlap between two entities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    pub a: EntityId,
    pub b: EntityId,
    /// `b.position - a.position`
    pub delta: Vec2,
    pub distance_sq: f64,
    pub radius_sum: f64,
}

pub trait CollisionResolver {
    /// Returns a manifold when the two entities overlap
    fn check_cell_collision(&self, a: &Entity, b: &Entity) -> Option<Manifold>;

    /// Apply positional correction for an overlap
    fn resolve_collision(&mut self, world: &mut World, manifold: &Manifold);
}

/// Separates overlapping cells along the centre line, weighted by mass:
/// the lighter cell moves further.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushApartResolver;

impl CollisionResolver for PushApartResolver {
    fn check_cell_collision(&self, a: &Entity, b: &Entity) -> Option<Manifold> {
        if !a.overlaps(b) {
            return None;
        }
        let delta = b.position - a.position;
        Some(Manifold {
            a: a.id,
            b: b.id,
            delta,
            distance_sq: delta.length_sq(),
            radius_sum: a.size() + b.size(),
        })
    }

    fn resolve_collision(&mut self, world: &mut World, manifold: &Manifold) {
        let d = manifold.distance_sq.sqrt();
        if d <= 0.0 {
            return;
        }
        let (Some(mass_a), Some(mass_b)) = (
            world.get(manifold.a).map(Entity::mass),
            world.get(manifold.b).map(Entity::mass),
        ) else {
            return;
        };

        let normal = manifold.delta * (1.0 / d);
        let penetration = manifold.radius_sum - d;
        let total = mass_a + mass_b;

        if let Some(a) = world.get_mut(manifold.a) {
            a.position -= normal * (penetration * mass_b / total);
        }
        if let Some(b) = world.get_mut(manifold.b) {
            b.position += normal * (penetration * mass_a / total);
        }
    }
}
