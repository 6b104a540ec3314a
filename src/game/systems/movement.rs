//! Move engine: impulse integration, decay, ejected-mass repulsion and
//! border bounce, plus mouse steering for player cells.
//!
//! Physics runs at half the visual rate: each step moves by half the impulse
//! speed, decays at half rate and consumes half a tick.

use std::f64::consts::{PI, TAU};

use crate::error::{SimError, SimResult};
use crate::game::constants::{movement, speed};
use crate::game::entity::{CellType, MoveEngine};
use crate::game::hooks::GameMode;
use crate::game::state::{EntityId, World};
use crate::util::vec2::Vec2;

/// Intersection of segment `p0 -> p1` with the line through `p2 -> p3`.
///
/// Returns `None` when the segments are parallel.
pub fn line_intersect(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Option<Vec2> {
    let z1 = p1.x - p0.x;
    let z2 = p3.x - p2.x;
    let w1 = p1.y - p0.y;
    let w2 = p3.y - p2.y;
    let denom = w1 * z2 - z1 * w2;
    if denom.abs() < movement::PARALLEL_EPSILON {
        return None;
    }
    let k2 = (z1 * (p2.y - p0.y) + w1 * (p0.x - p2.x)) / denom;
    Some(Vec2::new(p2.x + z2 * k2, p2.y + w2 * k2))
}

/// Point where travel `from -> to` hits a wall, or `clamped` if the travel
/// runs parallel to it
fn wall_hit(from: Vec2, to: Vec2, wall_a: Vec2, wall_b: Vec2, clamped: Vec2) -> Vec2 {
    line_intersect(from, to, wall_a, wall_b).unwrap_or_else(|| {
        tracing::warn!(
            "Parallel border intersection from ({:.1}, {:.1}) to ({:.1}, {:.1}), clamping",
            from.x,
            from.y,
            to.x,
            to.y
        );
        clamped
    })
}

/// Reflect a heading off a left/right wall
#[inline]
fn reflect_horizontal(angle: f64) -> f64 {
    TAU - angle
}

/// Reflect a heading off a top/bottom wall
#[inline]
fn reflect_vertical(angle: f64) -> f64 {
    if angle <= PI {
        PI - angle
    } else {
        3.0 * PI - angle
    }
}

/// Run one move-engine step for an entity
pub fn advance(world: &mut World, id: EntityId) -> SimResult<()> {
    let border = world.config.border;
    let entity = world.get(id).ok_or(SimError::UnknownEntity(id))?;
    let start = entity.position;
    let size = entity.size();
    let cell_type = entity.cell_type();
    let mut motion: MoveEngine = entity.motion;

    // Integrate at half speed, truncated to whole units
    let half = motion.speed / 2.0;
    let mut next = Vec2::new(
        start.x + (half * motion.angle.sin()).trunc(),
        start.y + (half * motion.angle.cos()).trunc(),
    );

    if motion.speed <= motion.decay * movement::SNAP_FACTOR && cell_type == CellType::Player {
        motion.speed = 0.0;
    }
    let speed_decrease = motion.speed - motion.speed * motion.decay;
    motion.speed -= speed_decrease / 2.0;
    if motion.ticks_remaining >= movement::TICK_STEP {
        motion.ticks_remaining -= movement::TICK_STEP;
    }

    if cell_type == CellType::EjectedMass {
        let mut partners = Vec::new();
        for &other in world.ejected_nodes() {
            if other == id {
                continue;
            }
            let Some(check) = world.get(other) else {
                continue;
            };
            let dist = start.distance_to(check.position);
            let allowed = size + check.size();
            if dist < allowed {
                let away = (start - check.position).heading();
                let shift = (allowed - dist) / 2.0;
                next += Vec2::from_heading(away) * shift;
                motion.ticks_remaining += movement::REPEL_EXTRA_TICKS;
                partners.push(other);
            }
        }
        for partner in partners {
            world.set_as_moving(partner);
            if let Some(check) = world.get_mut(partner) {
                check.motion.ticks_remaining += movement::REPEL_EXTRA_TICKS;
            }
        }
    }

    if next.x < border.left && start.x != next.x {
        motion.angle = reflect_horizontal(motion.angle);
        next = wall_hit(
            start,
            next,
            Vec2::new(border.left, border.bottom),
            Vec2::new(border.left, border.top),
            Vec2::new(border.left, next.y),
        );
        tracing::trace!("Entity {} bounced off left border", id);
    }
    if next.x > border.right && start.x != next.x {
        motion.angle = reflect_horizontal(motion.angle);
        next = wall_hit(
            start,
            next,
            Vec2::new(border.right, border.bottom),
            Vec2::new(border.right, border.top),
            Vec2::new(border.right, next.y),
        );
        tracing::trace!("Entity {} bounced off right border", id);
    }
    if next.y < border.top && start.y != next.y {
        motion.angle = reflect_vertical(motion.angle);
        next = wall_hit(
            start,
            next,
            Vec2::new(border.right, border.top),
            Vec2::new(border.left, border.top),
            Vec2::new(next.x, border.top),
        );
        tracing::trace!("Entity {} bounced off top border", id);
    }
    if next.y > border.bottom && start.y != next.y {
        motion.angle = reflect_vertical(motion.angle);
        next = wall_hit(
            start,
            next,
            Vec2::new(border.right, border.bottom),
            Vec2::new(border.left, border.bottom),
            Vec2::new(next.x, border.bottom),
        );
        tracing::trace!("Entity {} bounced off bottom border", id);
    }

    let entity = world.get_mut(id).ok_or(SimError::UnknownEntity(id))?;
    entity.position = next;
    entity.motion = motion;
    Ok(())
}

/// Step every entity in the moving registry.
///
/// Entities with impulse left get `on_auto_move` then [`advance`]; exhausted
/// ones get `on_move_done` and leave the registry.
pub fn update(world: &mut World, mode: &mut dyn GameMode) -> SimResult<()> {
    let moving = world.moving_nodes().to_vec();
    for id in moving {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if entity.motion.is_active() {
            mode.on_auto_move(world, id);
            if world.contains(id) {
                advance(world, id)?;
            }
        } else {
            mode.on_move_done(world, id);
            world.clear_moving(id);
        }
    }
    Ok(())
}

/// Steer a player cell toward `target`. Returns whether the cell moved.
pub fn move_toward(world: &mut World, id: EntityId, target: Vec2) -> SimResult<bool> {
    let entity = world.get(id).ok_or(SimError::UnknownEntity(id))?;
    if !entity.is_player_cell() {
        return Err(SimError::NotAPlayerCell(id));
    }
    let Some(owner) = entity.owner else {
        return Ok(false);
    };
    let position = entity.position;
    let cell_speed = entity.speed(&world.config);

    let player = world.player_mut(owner).ok_or(SimError::UnknownPlayer(owner))?;
    if !player.should_move_cells && player.not_moved {
        return Ok(false);
    }
    player.not_moved = false;

    let delta = target - position;
    let squared = delta.length_sq();
    if squared < 1.0 {
        return Ok(false);
    }
    let scale = squared.sqrt().min(speed::FULL_SPEED_DISTANCE) / speed::FULL_SPEED_DISTANCE;
    let step = cell_speed * scale;
    if step <= 0.0 {
        return Ok(false);
    }
    let angle = delta.heading();
    if !angle.is_finite() {
        return Ok(false);
    }

    let entity = world.get_mut(id).ok_or(SimError::UnknownEntity(id))?;
    entity.position += Vec2::from_heading(angle) * step;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::game::entity::EntityKind;
    use crate::game::hooks::NoopGameMode;

    fn world() -> World {
        World::new(WorldConfig {
            rng_seed: Some(3),
            ..WorldConfig::default()
        })
    }

    fn spawn_moving(w: &mut World, kind: EntityKind, pos: Vec2, mass: f64, motion: MoveEngine) -> EntityId {
        let id = w.spawn(kind, None, pos, mass, &mut NoopGameMode).unwrap();
        w.get_mut(id).unwrap().motion = motion;
        w.set_as_moving(id);
        id
    }

    fn impulse(speed: f64, ticks: f64, decay: f64, angle: f64) -> MoveEngine {
        MoveEngine {
            speed,
            ticks_remaining: ticks,
            decay,
            angle,
        }
    }

    #[derive(Default)]
    struct RecordingMode {
        auto_moves: usize,
        done: Vec<EntityId>,
    }

    impl GameMode for RecordingMode {
        fn on_auto_move(&mut self, _world: &mut World, _entity: EntityId) {
            self.auto_moves += 1;
        }

        fn on_move_done(&mut self, _world: &mut World, entity: EntityId) {
            self.done.push(entity);
        }
    }

    #[test]
    fn test_line_intersect_wall() {
        let p = line_intersect(
            Vec2::new(30.0, 500.0),
            Vec2::new(-40.0, 430.0),
            Vec2::new(0.0, 6000.0),
            Vec2::new(0.0, 0.0),
        )
        .unwrap();
        assert!(p.approx_eq(Vec2::new(0.0, 470.0), 1e-9));
    }

    #[test]
    fn test_line_intersect_parallel() {
        assert!(line_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 20.0),
        )
        .is_none());
    }

    #[test]
    fn test_wall_hit_falls_back_to_clamp() {
        let clamped = Vec2::new(0.0, 5.0);
        let p = wall_hit(
            Vec2::new(5.0, 0.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 20.0),
            clamped,
        );
        assert_eq!(p, clamped);
    }

    #[test]
    fn test_half_speed_integration() {
        let mut w = world();
        // angle PI/2 points along +x
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(1000.0, 1000.0), 12.0, impulse(100.0, 10.0, 0.8, PI / 2.0));
        advance(&mut w, id).unwrap();
        let e = w.get(id).unwrap();
        assert!(e.position.approx_eq(Vec2::new(1050.0, 1000.0), 1e-9));
        // speed -= (100 - 80) / 2
        assert!((e.motion.speed - 90.0).abs() < 1e-9);
        assert_eq!(e.motion.ticks_remaining, 9.5);
    }

    #[test]
    fn test_integration_truncates_step() {
        let mut w = world();
        // 0.5 * 25 * sin(PI/2) = 12.5 -> 12
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(1000.0, 1000.0), 12.0, impulse(25.0, 10.0, 0.8, PI / 2.0));
        advance(&mut w, id).unwrap();
        assert!(w.get(id).unwrap().position.approx_eq(Vec2::new(1012.0, 1000.0), 1e-9));
    }

    #[test]
    fn test_player_residual_speed_snaps_to_zero() {
        let mut w = world();
        let cell = spawn_moving(&mut w, EntityKind::player(), Vec2::new(1000.0, 1000.0), 10.0, impulse(2.0, 5.0, 0.85, 0.0));
        advance(&mut w, cell).unwrap();
        assert_eq!(w.get(cell).unwrap().motion.speed, 0.0);

        // Non-player entities keep decaying instead
        let ejected = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(1000.0, 1000.0), 10.0, impulse(2.0, 5.0, 0.85, 0.0));
        advance(&mut w, ejected).unwrap();
        assert!(w.get(ejected).unwrap().motion.speed > 0.0);
    }

    #[test]
    fn test_ticks_floor() {
        let mut w = world();
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(1000.0, 1000.0), 12.0, impulse(10.0, 0.25, 0.8, 0.0));
        advance(&mut w, id).unwrap();
        assert_eq!(w.get(id).unwrap().motion.ticks_remaining, 0.25);
    }

    #[test]
    fn test_left_border_bounce_uses_intersection() {
        let mut w = world();
        let angle = 1.25 * PI; // moving left and up (-x, -y)
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(30.0, 500.0), 12.0, impulse(200.0, 10.0, 0.8, angle));
        advance(&mut w, id).unwrap();

        let e = w.get(id).unwrap();
        // Proposed (-40, 430); a plain clamp would give (0, 430)
        assert!(e.position.approx_eq(Vec2::new(0.0, 470.0), 1e-9));
        assert!((e.motion.angle - (TAU - angle)).abs() < 1e-12);
    }

    #[test]
    fn test_right_border_bounce() {
        let mut w = world();
        let right = w.config.border.right;
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(right - 10.0, 500.0), 12.0, impulse(100.0, 10.0, 0.8, PI / 2.0));
        advance(&mut w, id).unwrap();
        let e = w.get(id).unwrap();
        assert!(e.position.approx_eq(Vec2::new(right, 500.0), 1e-9));
        assert!((e.motion.angle - 1.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_top_border_bounce() {
        let mut w = world();
        // angle PI moves along -y (toward top)
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(500.0, 20.0), 12.0, impulse(100.0, 10.0, 0.8, PI));
        advance(&mut w, id).unwrap();
        let e = w.get(id).unwrap();
        assert!((e.position.y - 0.0).abs() < 1e-9);
        assert!((e.position.x - 500.0).abs() < 1e-6);
        // PI <= PI -> PI - PI = 0, now heading +y
        assert!(e.motion.angle.abs() < 1e-12);
    }

    #[test]
    fn test_bottom_border_bounce_upper_half_angle() {
        let mut w = world();
        let bottom = w.config.border.bottom;
        let angle = 1.75 * PI; // -x, +y
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(500.0, bottom - 20.0), 12.0, impulse(200.0, 10.0, 0.8, angle));
        advance(&mut w, id).unwrap();
        let e = w.get(id).unwrap();
        assert!((e.position.y - bottom).abs() < 1e-9);
        assert!((e.motion.angle - (3.0 * PI - angle)).abs() < 1e-12);
    }

    #[test]
    fn test_no_bounce_inside_border() {
        let mut w = world();
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(500.0, 500.0), 12.0, impulse(100.0, 10.0, 0.8, 0.3));
        advance(&mut w, id).unwrap();
        assert_eq!(w.get(id).unwrap().motion.angle, 0.3);
    }

    #[test]
    fn test_ejected_mass_repels() {
        let mut w = world();
        // size 35 each, 10 apart: overlap 60, each side takes 30
        let a = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(100.0, 100.0), 12.0, impulse(0.0, 0.0, 0.8, 0.0));
        let b = w.spawn(EntityKind::EjectedMass, None, Vec2::new(110.0, 100.0), 12.0, &mut NoopGameMode).unwrap();
        assert!(!w.moving_nodes().contains(&b));

        advance(&mut w, a).unwrap();
        let ea = w.get(a).unwrap();
        assert!(ea.position.approx_eq(Vec2::new(70.0, 100.0), 1e-9));
        assert_eq!(ea.motion.ticks_remaining, 1.0);
        assert_eq!(w.get(b).unwrap().motion.ticks_remaining, 1.0);
        assert!(w.moving_nodes().contains(&b));
    }

    #[test]
    fn test_ejected_repulsion_skips_removed() {
        let mut w = world();
        let a = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(100.0, 100.0), 12.0, impulse(0.0, 0.0, 0.8, 0.0));
        let b = w.spawn(EntityKind::EjectedMass, None, Vec2::new(110.0, 100.0), 12.0, &mut NoopGameMode).unwrap();
        w.remove(b, &mut NoopGameMode);
        advance(&mut w, a).unwrap();
        assert_eq!(w.get(a).unwrap().position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_update_runs_until_exhausted() {
        let mut w = world();
        let mut mode = RecordingMode::default();
        let id = spawn_moving(&mut w, EntityKind::EjectedMass, Vec2::new(500.0, 500.0), 12.0, impulse(40.0, 1.0, 0.8, 0.0));

        update(&mut w, &mut mode).unwrap();
        update(&mut w, &mut mode).unwrap();
        assert_eq!(mode.auto_moves, 2);
        assert!(mode.done.is_empty());
        assert_eq!(w.get(id).unwrap().motion.ticks_remaining, 0.0);

        update(&mut w, &mut mode).unwrap();
        assert_eq!(mode.done, vec![id]);
        assert!(!w.moving_nodes().contains(&id));
    }

    #[test]
    fn test_move_toward() {
        let mut w = world();
        let p = w.add_player("a");
        let id = w.spawn(EntityKind::player(), Some(p), Vec2::new(500.0, 500.0), 100.0, &mut NoopGameMode).unwrap();

        // No mouse update yet
        assert!(!move_toward(&mut w, id, Vec2::new(1000.0, 500.0)).unwrap());

        w.player_mut(p).unwrap().set_mouse(Vec2::new(1000.0, 500.0));
        let expected = w.get(id).unwrap().speed(&w.config);
        assert!(move_toward(&mut w, id, Vec2::new(1000.0, 500.0)).unwrap());
        let pos = w.get(id).unwrap().position;
        assert!(pos.approx_eq(Vec2::new(500.0 + expected, 500.0), 1e-9));
    }

    #[test]
    fn test_move_toward_scales_near_target() {
        let mut w = world();
        let p = w.add_player("a");
        w.player_mut(p).unwrap().should_move_cells = true;
        let id = w.spawn(EntityKind::player(), Some(p), Vec2::new(500.0, 500.0), 100.0, &mut NoopGameMode).unwrap();
        let full = w.get(id).unwrap().speed(&w.config);

        assert!(move_toward(&mut w, id, Vec2::new(500.0, 508.0)).unwrap());
        let pos = w.get(id).unwrap().position;
        assert!(pos.approx_eq(Vec2::new(500.0, 500.0 + full * 8.0 / 32.0), 1e-9));
    }

    #[test]
    fn test_move_toward_skips_at_target() {
        let mut w = world();
        let p = w.add_player("a");
        w.player_mut(p).unwrap().should_move_cells = true;
        let id = w.spawn(EntityKind::player(), Some(p), Vec2::new(500.0, 500.0), 100.0, &mut NoopGameMode).unwrap();
        assert!(!move_toward(&mut w, id, Vec2::new(500.0, 500.0)).unwrap());
        assert!(!move_toward(&mut w, id, Vec2::new(500.5, 500.5)).unwrap());
        assert_eq!(w.get(id).unwrap().position, Vec2::new(500.0, 500.0));
    }

    #[test]
    fn test_move_toward_rejects_non_player() {
        let mut w = world();
        let food = w.spawn(EntityKind::Food, None, Vec2::ZERO, 1.0, &mut NoopGameMode).unwrap();
        assert_eq!(
            move_toward(&mut w, food, Vec2::new(1.0, 1.0)),
            Err(SimError::NotAPlayerCell(food))
        );
    }
}
