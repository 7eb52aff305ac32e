//! Projectile flight and hit detection.
//!
//! The combat crate only announces that a projectile was fired. Here each
//! shot flies straight along its firing direction until it hits a living
//! unit of the team it was aimed at or runs out of range. Hits are tested
//! against the whole path covered in a step so fast shots cannot skip
//! over a unit.

use glam::{Quat, Vec2, Vec3};
use skirmish_combat::{Battlefield, Locomotion, Presentation, Team};
use skirmish_common::{world_to_ground, UnitId, FORWARD};
use tracing::trace;

use crate::locomotion::Mover;

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    /// Unit that fired it
    pub shooter: UnitId,
    /// Current position
    pub position: Vec3,
    /// Unit flight direction
    pub direction: Vec3,
    /// Team it can hurt
    pub target_team: Team,
    /// Distance it may still travel
    pub range_left: f32,
}

/// A projectile reaching a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHit {
    /// Unit that fired the projectile
    pub shooter: UnitId,
    /// Unit that was hit
    pub target: UnitId,
    /// Damage to apply
    pub damage: u32,
}

/// Every projectile in flight.
#[derive(Debug)]
pub struct Ballistics {
    projectiles: Vec<Projectile>,
    speed: f32,
    damage: u32,
    hit_radius: f32,
    max_range: f32,
}

impl Ballistics {
    /// Create an empty set of projectiles.
    #[must_use]
    pub fn new(speed: f32, damage: u32, hit_radius: f32, max_range: f32) -> Self {
        Self {
            projectiles: Vec::new(),
            speed,
            damage,
            hit_radius,
            max_range,
        }
    }

    /// Launch a projectile from `origin` along `rotation`'s forward axis.
    pub fn launch(&mut self, shooter: UnitId, origin: Vec3, rotation: Quat, target_team: Team) {
        self.projectiles.push(Projectile {
            shooter,
            position: origin,
            direction: (rotation * FORWARD).normalize_or_zero(),
            target_team,
            range_left: self.max_range,
        });
    }

    /// Move every projectile by `dt` seconds and collect the hits.
    ///
    /// Units whose collision is disabled are passed through.
    pub fn step<P: Presentation>(&mut self, dt: f32, field: &Battlefield<Mover, P>) -> Vec<ProjectileHit> {
        let travel = self.speed * dt;
        let mut hits = Vec::new();

        self.projectiles.retain_mut(|projectile| {
            let start = world_to_ground(projectile.position);
            let step = travel.min(projectile.range_left);
            projectile.position += projectile.direction * step;
            projectile.range_left -= step;
            let end = world_to_ground(projectile.position);

            // First unit touched along this step's path.
            let mover = field.locomotion();
            let hit = field
                .living_units(projectile.target_team)
                .filter(|u| mover.collision_enabled(u.id()))
                .filter_map(|u| {
                    let center = world_to_ground(mover.position(u.id())?);
                    let (along, distance) = segment_approach(start, end, center);
                    (distance <= self.hit_radius).then_some((u.id(), along))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

            if let Some((target, _)) = hit {
                trace!("Projectile from {} hit {target}", projectile.shooter);
                hits.push(ProjectileHit {
                    shooter: projectile.shooter,
                    target,
                    damage: self.damage,
                });
                return false;
            }
            projectile.range_left > 0.0
        });

        hits
    }

    /// Projectiles still in flight.
    #[must_use]
    pub fn in_flight(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Check if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}

/// Closest approach of the segment `p0..p1` to `center`, as the segment
/// parameter in `[0, 1]` and the distance at that point.
fn segment_approach(p0: Vec2, p1: Vec2, center: Vec2) -> (f32, f32) {
    let d = p1 - p0;
    let len_sq = d.length_squared();
    if len_sq <= 1e-6 {
        return (0.0, p0.distance(center));
    }
    let t = ((center - p0).dot(d) / len_sq).clamp(0.0, 1.0);
    (t, (p0 + d * t).distance(center))
}
