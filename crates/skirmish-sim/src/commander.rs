//! Battle orders for idle units.
//!
//! Each tick, every living unit that is idle and ready to attack gets an
//! order against the nearest living enemy. Ranged units fire when the enemy
//! is within range and close in otherwise; melee units always close in.

use ahash::AHashMap;
use glam::{Vec2, Vec3};
use skirmish_combat::{Activity, Battlefield, CombatUnit, Locomotion, Presentation, Team};
use skirmish_common::{planar_distance, world_to_ground, UnitId};
use tracing::{debug, warn};

use crate::config::Role;
use crate::locomotion::Mover;

/// Order handed to a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    /// Fire at a ground point
    Fire {
        /// Ordered unit
        unit: UnitId,
        /// Aim point
        point: Vec2,
    },
    /// Close in and strike
    Attack {
        /// Ordered unit
        unit: UnitId,
        /// Unit to strike
        target: UnitId,
    },
}

/// Picks targets and issues orders.
#[derive(Debug)]
pub struct Commander {
    roles: AHashMap<UnitId, Role>,
    rng: fastrand::Rng,
    fire_range: f32,
    aim_spread: f32,
}

impl Commander {
    /// Create a commander with a seeded random source.
    #[must_use]
    pub fn new(seed: u64, fire_range: f32, aim_spread: f32) -> Self {
        Self {
            roles: AHashMap::new(),
            rng: fastrand::Rng::with_seed(seed),
            fire_range,
            aim_spread,
        }
    }

    /// Register how a unit should be used.
    pub fn assign(&mut self, unit: UnitId, role: Role) {
        self.roles.insert(unit, role);
    }

    /// Forget a unit that left the battlefield.
    pub fn dismiss(&mut self, unit: UnitId) {
        self.roles.remove(&unit);
    }

    /// Role of a unit (melee when unassigned).
    #[must_use]
    pub fn role(&self, unit: UnitId) -> Role {
        self.roles.get(&unit).copied().unwrap_or_default()
    }

    /// Decide orders for every ready unit and issue them.
    pub fn command<P: Presentation>(&mut self, field: &mut Battlefield<Mover, P>) -> Vec<Order> {
        let orders = self.plan(field);
        for order in &orders {
            let result = match *order {
                Order::Fire { unit, point } => field.fire_at(unit, point),
                Order::Attack { unit, target } => field.attack(unit, target),
            };
            if let Err(e) = result {
                warn!("Order {order:?} failed: {e}");
            }
        }
        orders
    }

    fn plan<P: Presentation>(&mut self, field: &Battlefield<Mover, P>) -> Vec<Order> {
        let now = field.now();
        let mover = field.locomotion();

        // Sorted so that a given seed always yields the same battle.
        let mut ready: Vec<UnitId> = field
            .units()
            .filter(|u| {
                u.is_alive()
                    && u.is_activated()
                    && u.activity() == Activity::Idle
                    && now >= u.next_attack_ready()
                    && !mover.is_busy(u.id())
            })
            .map(CombatUnit::id)
            .collect();
        ready.sort_unstable();

        let mut orders = Vec::new();
        for unit in ready {
            let (Some(attacker), Some(position)) = (field.unit(unit), mover.position(unit)) else {
                continue;
            };
            let Some((target, target_position, distance)) =
                nearest(field, attacker.enemy_team(), position)
            else {
                continue;
            };

            let order = match self.role(unit) {
                Role::Ranged if distance <= self.fire_range => Order::Fire {
                    unit,
                    point: world_to_ground(target_position) + self.jitter(),
                },
                Role::Ranged | Role::Melee => Order::Attack { unit, target },
            };
            debug!("{unit} ordered: {order:?}");
            orders.push(order);
        }
        orders
    }

    fn jitter(&mut self) -> Vec2 {
        let spread = self.aim_spread;
        Vec2::new(
            (self.rng.f32() * 2.0 - 1.0) * spread,
            (self.rng.f32() * 2.0 - 1.0) * spread,
        )
    }
}

/// Nearest living unit of `team`, with its position and distance.
fn nearest<P: Presentation>(
    field: &Battlefield<Mover, P>,
    team: Team,
    from: Vec3,
) -> Option<(UnitId, Vec3, f32)> {
    let mover = field.locomotion();
    field
        .living_units(team)
        .filter_map(|u| {
            let position = mover.position(u.id())?;
            Some((u.id(), position, planar_distance(from, position)))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)))
}
