//! Straight-line locomotion.
//!
//! Units walk directly toward their destination at a fixed speed and turn
//! at a fixed angular speed. There is no pathfinding and no avoidance;
//! disabled collision only matters to projectile hit tests.

use ahash::AHashMap;
use glam::{Quat, Vec2, Vec3};
use skirmish_combat::{ArrivalAction, Completion, FacingAction, Locomotion};
use skirmish_common::{facing_rotation, planar_distance, world_to_ground, UnitId};

/// Pending order of a body.
#[derive(Debug, Clone, Copy)]
enum Order {
    Move {
        destination: Vec3,
        stop_distance: f32,
        action: ArrivalAction,
    },
    Turn {
        rotation: Quat,
        action: FacingAction,
    },
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    rotation: Quat,
    collision: bool,
    order: Option<Order>,
}

/// Moves bodies in straight lines.
#[derive(Debug)]
pub struct Mover {
    bodies: AHashMap<UnitId, Body>,
    completed: Vec<Completion>,
    move_speed: f32,
    turn_speed: f32,
}

impl Mover {
    /// Create a mover with the given walking and turning speeds.
    #[must_use]
    pub fn new(move_speed: f32, turn_speed: f32) -> Self {
        Self {
            bodies: AHashMap::new(),
            completed: Vec::new(),
            move_speed,
            turn_speed,
        }
    }

    /// Advance every pending order by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let max_travel = self.move_speed * dt;
        let max_turn = self.turn_speed * dt;

        for (&unit, body) in &mut self.bodies {
            let Some(order) = body.order else {
                continue;
            };
            match order {
                Order::Move {
                    destination,
                    stop_distance,
                    action,
                } => {
                    let remaining = planar_distance(body.position, destination) - stop_distance;
                    if remaining > 0.0 {
                        let dir = (world_to_ground(destination) - world_to_ground(body.position))
                            .normalize_or_zero();
                        let travel = remaining.min(max_travel);
                        body.position += Vec3::new(dir.x, 0.0, dir.y) * travel;
                        if let Some(rotation) = facing_rotation(body.position, world_to_ground(destination)) {
                            body.rotation = rotation;
                        }
                    }
                    if remaining <= max_travel {
                        body.order = None;
                        self.completed.push(Completion::Arrived { unit, action });
                    }
                },
                Order::Turn { rotation, action } => {
                    let angle = body.rotation.angle_between(rotation);
                    if angle <= max_turn {
                        body.rotation = rotation;
                        body.order = None;
                        self.completed.push(Completion::Faced { unit, action });
                    } else {
                        body.rotation = body.rotation.slerp(rotation, max_turn / angle);
                    }
                },
            }
        }
    }

    /// Whether the body's collider is enabled.
    #[must_use]
    pub fn collision_enabled(&self, unit: UnitId) -> bool {
        self.bodies.get(&unit).is_some_and(|b| b.collision)
    }

    /// Check if the unit has an order in progress.
    #[must_use]
    pub fn is_busy(&self, unit: UnitId) -> bool {
        self.bodies.get(&unit).is_some_and(|b| b.order.is_some())
    }
}

impl Locomotion for Mover {
    fn move_to(&mut self, unit: UnitId, destination: Vec3, stop_distance: f32, on_arrival: ArrivalAction) {
        if let Some(body) = self.bodies.get_mut(&unit) {
            body.order = Some(Order::Move {
                destination,
                stop_distance,
                action: on_arrival,
            });
        }
    }

    fn rotate_towards(&mut self, unit: UnitId, point: Vec2, on_facing: FacingAction) {
        let Some(body) = self.bodies.get_mut(&unit) else {
            return;
        };
        let rotation = facing_rotation(body.position, point).unwrap_or(body.rotation);
        body.order = Some(Order::Turn {
            rotation,
            action: on_facing,
        });
    }

    fn stop(&mut self, unit: UnitId) {
        if let Some(body) = self.bodies.get_mut(&unit) {
            body.order = None;
        }
        self.completed.retain(|c| match c {
            Completion::Arrived { unit: u, .. } | Completion::Faced { unit: u, .. } => *u != unit,
        });
    }

    fn position(&self, unit: UnitId) -> Option<Vec3> {
        self.bodies.get(&unit).map(|b| b.position)
    }

    fn rotation(&self, unit: UnitId) -> Option<Quat> {
        self.bodies.get(&unit).map(|b| b.rotation)
    }

    fn teleport(&mut self, unit: UnitId, position: Vec3) {
        let body = self.bodies.entry(unit).or_insert(Body {
            position,
            rotation: Quat::IDENTITY,
            collision: true,
            order: None,
        });
        body.position = position;
        body.order = None;
    }

    fn set_collision_enabled(&mut self, unit: UnitId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&unit) {
            body.collision = enabled;
        }
    }

    fn despawn(&mut self, unit: UnitId) {
        self.stop(unit);
        self.bodies.remove(&unit);
    }

    fn drain_completed(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completed)
    }
}
