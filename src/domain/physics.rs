// Platformer physics kernel: one fixed Euler step per tick plus box-vs-tile resolution.
//
// Coordinates are screen-style (+Y is down). Velocities are in world units per tick.
// Tiles are resolved one at a time in collision-map order against the position as
// corrected by earlier tiles, so overlapping several tiles at once can depend on that
// order. This is accepted behavior.

use crate::domain::collision::CollisionMap;
use crate::domain::entity::{Animation, Entity};
use crate::domain::math::Vector2;
use crate::domain::tuning::PhysicsTuning;

const RUN_THRESHOLD: f32 = 0.05;

/// Advances a single entity by one tick against the room's collision map.
pub fn step_entity(e: &mut Entity, collision: &CollisionMap, tuning: &PhysicsTuning) {
    let input = e.input;

    // Holding both directions cancels out; friction only applies when neither is held.
    if input.left {
        e.velocity.x -= tuning.accel;
    }
    if input.right {
        e.velocity.x += tuning.accel;
    }
    e.velocity.x = clamp(e.velocity.x, -tuning.max_speed_x, tuning.max_speed_x);
    if !input.left && !input.right {
        e.velocity.x *= tuning.friction;
    }

    e.velocity.y = (e.velocity.y + tuning.gravity).min(tuning.max_fall_speed);

    if input.jump && e.state.grounded {
        e.velocity.y = -tuning.jump_impulse;
        e.state.grounded = false;
    }

    let previous = e.position;
    e.position += e.velocity;

    e.state.grounded = false;
    resolve_tile_collisions(e, previous, collision);

    e.state.animation = animation_for(e);
    e.dirty = true;
}

/// Axis-aligned overlap; boxes that only touch along an edge do not overlap.
pub fn overlaps(pos: Vector2, size: Vector2, other: Vector2, other_size: Vector2) -> bool {
    pos.x < other.x + other_size.x
        && pos.x + size.x > other.x
        && pos.y < other.y + other_size.y
        && pos.y + size.y > other.y
}

fn resolve_tile_collisions(e: &mut Entity, previous: Vector2, collision: &CollisionMap) {
    let tile_size = collision.tile_size();
    let tile_box = Vector2::new(tile_size, tile_size);

    for tile in collision.tiles() {
        if !overlaps(e.position, e.size, *tile, tile_box) {
            continue;
        }

        let (top, bottom) = (tile.y, tile.y + tile_size);
        let (left, right) = (tile.x, tile.x + tile_size);

        if e.velocity.y > 0.0 && previous.y + e.size.y <= top {
            land_on(e, top);
        } else if e.velocity.y < 0.0 && previous.y >= bottom {
            e.position.y = bottom;
            e.velocity.y = 0.0;
        } else if previous.x + e.size.x <= left {
            e.position.x = left - e.size.x;
            e.velocity.x = 0.0;
        } else if previous.x >= right {
            e.position.x = right;
            e.velocity.x = 0.0;
        } else {
            // Started the tick already embedded: leave along the shallowest axis.
            let push_up = e.position.y + e.size.y - top;
            let push_down = bottom - e.position.y;
            let push_left = e.position.x + e.size.x - left;
            let push_right = right - e.position.x;

            if push_up.min(push_down) <= push_left.min(push_right) {
                if push_up <= push_down {
                    land_on(e, top);
                } else {
                    e.position.y = bottom;
                    e.velocity.y = 0.0;
                }
            } else if push_left <= push_right {
                e.position.x = left - e.size.x;
                e.velocity.x = 0.0;
            } else {
                e.position.x = right;
                e.velocity.x = 0.0;
            }
        }
    }
}

fn land_on(e: &mut Entity, top: f32) {
    e.position.y = top - e.size.y;
    e.velocity.y = 0.0;
    e.state.grounded = true;
}

fn animation_for(e: &Entity) -> Animation {
    if !e.state.grounded {
        if e.velocity.y < 0.0 {
            Animation::Jump
        } else {
            Animation::Fall
        }
    } else if e.velocity.x.abs() > RUN_THRESHOLD {
        Animation::Run
    } else {
        Animation::Idle
    }
}

// Non-panicking clamp; a misconfigured range just saturates.
fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{EntityType, Input};
    use crate::domain::tilemap::{RoomTiles, TileLayers};
    use std::sync::Arc;

    const TILE: f32 = 16.0;

    fn entity_at(x: f32, y: f32) -> Entity {
        Entity::new(
            Arc::from("w"),
            Arc::from("r"),
            EntityType::Player,
            Vector2::new(x, y),
            Vector2::new(16.0, 16.0),
        )
    }

    fn map(cells: &[(i32, i32)]) -> CollisionMap {
        let mut layers = TileLayers::default();
        layers.layers.insert("solid".into(), cells.to_vec());
        CollisionMap::from_tiles(&RoomTiles::Layers(layers), TILE)
    }

    #[test]
    fn falling_entity_lands_flush_on_tile_top() {
        let tuning = PhysicsTuning::default();
        let collision = map(&[(0, 2)]);
        let mut e = entity_at(0.0, 0.0);
        e.velocity.y = 5.0;

        for _ in 0..10 {
            step_entity(&mut e, &collision, &tuning);
        }

        assert_eq!(e.position.y + e.size.y, 32.0);
        assert_eq!(e.position.y, 16.0);
        assert_eq!(e.velocity.y, 0.0);
        assert!(e.state.grounded);
        assert_eq!(e.state.animation, Animation::Idle);
    }

    #[test]
    fn resting_entity_stays_put() {
        let tuning = PhysicsTuning::default();
        let collision = map(&[(0, 1), (1, 1)]);
        let mut e = entity_at(0.0, 0.0);

        step_entity(&mut e, &collision, &tuning);

        assert_eq!(e.position, Vector2::ZERO);
        assert_eq!(e.velocity, Vector2::ZERO);
        assert!(e.state.grounded);
    }

    #[test]
    fn identical_inputs_produce_identical_steps() {
        let tuning = PhysicsTuning::default();
        let collision = map(&[(0, 3), (1, 3), (2, 3), (3, 2)]);
        let mut a = entity_at(3.0, -4.0);
        a.velocity = Vector2::new(2.5, 1.0);
        a.input = Input {
            left: false,
            right: true,
            jump: true,
        };
        let mut b = a.clone();

        for _ in 0..30 {
            step_entity(&mut a, &collision, &tuning);
            step_entity(&mut b, &collision, &tuning);
            assert_eq!(a.position, b.position);
            assert_eq!(a.velocity, b.velocity);
            assert_eq!(a.state.grounded, b.state.grounded);
        }
    }

    #[test]
    fn holding_left_and_right_cancels_without_friction() {
        let tuning = PhysicsTuning::default();
        let mut e = entity_at(0.0, 0.0);
        e.velocity.x = 2.0;
        e.input = Input {
            left: true,
            right: true,
            jump: false,
        };

        step_entity(&mut e, &CollisionMap::default(), &tuning);

        assert_eq!(e.velocity.x, 2.0);
    }

    #[test]
    fn horizontal_speed_is_clamped() {
        let tuning = PhysicsTuning::default();
        let mut e = entity_at(0.0, 0.0);
        e.input.right = true;

        for _ in 0..20 {
            step_entity(&mut e, &CollisionMap::default(), &tuning);
        }

        assert_eq!(e.velocity.x, tuning.max_speed_x);
    }

    #[test]
    fn friction_never_flips_direction() {
        let tuning = PhysicsTuning::default();
        let mut e = entity_at(0.0, 0.0);
        e.velocity.x = -5.0;

        for _ in 0..50 {
            step_entity(&mut e, &CollisionMap::default(), &tuning);
            assert!(e.velocity.x <= 0.0);
        }
        assert!(e.velocity.x.abs() < 0.01);
    }

    #[test]
    fn fall_speed_is_bounded() {
        let tuning = PhysicsTuning::default();
        let mut e = entity_at(0.0, 0.0);

        for _ in 0..100 {
            step_entity(&mut e, &CollisionMap::default(), &tuning);
        }

        assert_eq!(e.velocity.y, tuning.max_fall_speed);
        assert_eq!(e.state.animation, Animation::Fall);
    }

    #[test]
    fn jump_requires_ground() {
        let tuning = PhysicsTuning::default();
        let collision = map(&[(0, 1)]);

        let mut airborne = entity_at(0.0, -100.0);
        airborne.input.jump = true;
        step_entity(&mut airborne, &collision, &tuning);
        assert!(airborne.velocity.y > 0.0);

        let mut grounded = entity_at(0.0, 0.0);
        step_entity(&mut grounded, &collision, &tuning);
        assert!(grounded.state.grounded);

        grounded.input.jump = true;
        step_entity(&mut grounded, &collision, &tuning);
        assert_eq!(grounded.velocity.y, -tuning.jump_impulse);
        assert!(!grounded.state.grounded);
        assert_eq!(grounded.state.animation, Animation::Jump);
    }

    #[test]
    fn rising_entity_stops_under_ceiling() {
        let tuning = PhysicsTuning::default();
        let collision = map(&[(0, -2)]);
        let mut e = entity_at(0.0, -10.0);
        e.velocity.y = -10.0;

        step_entity(&mut e, &collision, &tuning);

        assert_eq!(e.position.y, -16.0);
        assert_eq!(e.velocity.y, 0.0);
        assert!(!e.state.grounded);
    }

    #[test]
    fn walls_push_out_horizontally() {
        let tuning = PhysicsTuning::default();
        // Floor under the entity and a wall one tile to the right.
        let collision = map(&[(0, 1), (1, 1), (2, 1), (2, 0)]);
        let mut e = entity_at(14.0, 0.0);
        e.velocity.x = 4.0;
        e.input.right = true;

        step_entity(&mut e, &collision, &tuning);

        assert_eq!(e.position.x, 16.0);
        assert_eq!(e.velocity.x, 0.0);
        assert_eq!(e.position.y, 0.0);
        assert!(e.state.grounded);
    }

    #[test]
    fn embedded_entity_leaves_along_shallowest_axis() {
        let tuning = PhysicsTuning {
            gravity: 0.0,
            ..PhysicsTuning::default()
        };
        let collision = map(&[(0, 1)]);
        let mut e = entity_at(0.0, 3.0);

        step_entity(&mut e, &collision, &tuning);

        assert_eq!(e.position.y, 0.0);
        assert!(e.state.grounded);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let size = Vector2::new(16.0, 16.0);
        assert!(!overlaps(Vector2::ZERO, size, Vector2::new(16.0, 0.0), size));
        assert!(overlaps(Vector2::ZERO, size, Vector2::new(15.0, 15.0), size));
    }
}
