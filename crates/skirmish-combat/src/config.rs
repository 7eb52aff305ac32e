//! Unit configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::unit::UnitError;

/// Melee reach added to the body depth when closing on a target.
pub const DEFAULT_MELEE_RANGE: f32 = 1.5;
/// Length of the attack animation, which is also the melee wind-up.
pub const DEFAULT_ATTACK_ANIMATION: f32 = 0.3;
/// Delay before a dead unit comes back, when it respawns.
pub const DEFAULT_RESPAWN_DELAY: f32 = 10.0;
/// Grace period before a dead, non-respawning unit is destroyed.
pub const DESTROY_DELAY: f32 = 5.0;

/// Combat parameters of a unit. Immutable once the unit is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Maximum (and starting) hit points.
    pub hit_points: u32,
    /// Damage dealt by one melee strike.
    pub melee_damage: u32,
    /// Minimum interval between attacks (seconds).
    pub attack_cooldown: f32,
    /// Whether the unit comes back after dying.
    pub respawns: bool,
    /// Delay before respawning (seconds).
    pub respawn_delay: f32,
    /// Melee reach beyond the body depth.
    pub melee_range: f32,
    /// Attack animation length and melee wind-up (seconds).
    pub attack_animation: f32,
    /// Bounding size of the body (width, height, depth).
    pub body_size: Vec3,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            hit_points: 1,
            melee_damage: 1,
            attack_cooldown: 1.0,
            respawns: false,
            respawn_delay: DEFAULT_RESPAWN_DELAY,
            melee_range: DEFAULT_MELEE_RANGE,
            attack_animation: DEFAULT_ATTACK_ANIMATION,
            body_size: Vec3::new(1.0, 2.0, 1.0),
        }
    }
}

impl UnitConfig {
    /// Set hit points.
    #[must_use]
    pub fn with_hit_points(mut self, hit_points: u32) -> Self {
        self.hit_points = hit_points;
        self
    }

    /// Set melee damage.
    #[must_use]
    pub fn with_melee_damage(mut self, damage: u32) -> Self {
        self.melee_damage = damage;
        self
    }

    /// Set attack cooldown.
    #[must_use]
    pub fn with_attack_cooldown(mut self, seconds: f32) -> Self {
        self.attack_cooldown = seconds;
        self
    }

    /// Enable respawning after the given delay.
    #[must_use]
    pub fn with_respawn(mut self, delay: f32) -> Self {
        self.respawns = true;
        self.respawn_delay = delay;
        self
    }

    /// Set melee range.
    #[must_use]
    pub fn with_melee_range(mut self, range: f32) -> Self {
        self.melee_range = range;
        self
    }

    /// Set body size.
    #[must_use]
    pub fn with_body_size(mut self, size: Vec3) -> Self {
        self.body_size = size;
        self
    }

    /// Distance at which a melee attacker stops short of its target.
    #[must_use]
    pub fn melee_stop_distance(&self) -> f32 {
        self.body_size.z + self.melee_range
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), UnitError> {
        if self.hit_points == 0 {
            return Err(UnitError::InvalidConfig("hit_points must be positive".into()));
        }
        let durations = [
            ("attack_cooldown", self.attack_cooldown),
            ("respawn_delay", self.respawn_delay),
            ("attack_animation", self.attack_animation),
            ("melee_range", self.melee_range),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(UnitError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !self.body_size.is_finite() || self.body_size.min_element() <= 0.0 {
            return Err(UnitError::InvalidConfig(format!(
                "body_size must be positive on every axis, got {}",
                self.body_size
            )));
        }
        Ok(())
    }
}
