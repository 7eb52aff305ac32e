//! Collaborator interfaces.
//!
//! A unit never moves, draws, or waits by itself. Movement and physics go
//! through [`Locomotion`], visual feedback through [`Presentation`], and
//! every delay through [`Clock`]. All calls are keyed by [`UnitId`] so a
//! single service instance can serve any number of units.
//!
//! Continuations are plain values rather than closures: the service hands
//! them back (locomotion completions, due timers) and the battlefield
//! routes them to the unit that asked.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use skirmish_common::{IndicatorHandle, TimerId, UnitId};

use crate::team::Team;
use crate::timers::Deferred;

/// What to do once a unit reaches its move destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalAction {
    /// Swing at the current melee target.
    PerformAttack {
        /// Attack the arrival belongs to.
        serial: u64,
    },
}

/// What to do once a unit faces its requested point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacingAction {
    /// Fire a projectile straight ahead.
    FireForward,
}

/// A finished locomotion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    /// Unit came within the requested stop distance.
    Arrived {
        /// Unit that moved.
        unit: UnitId,
        /// Continuation supplied with the request.
        action: ArrivalAction,
    },
    /// Unit finished turning.
    Faced {
        /// Unit that turned.
        unit: UnitId,
        /// Continuation supplied with the request.
        action: FacingAction,
    },
}

/// Movement, orientation and collision of unit bodies.
pub trait Locomotion {
    /// Move toward `destination`, completing with `on_arrival` exactly once
    /// when within `stop_distance`. A newer request or [`Locomotion::stop`]
    /// supersedes it and it never completes.
    fn move_to(&mut self, unit: UnitId, destination: Vec3, stop_distance: f32, on_arrival: ArrivalAction);

    /// Turn to face a ground point, completing with `on_facing`.
    fn rotate_towards(&mut self, unit: UnitId, point: Vec2, on_facing: FacingAction);

    /// Abandon any pending move or turn.
    fn stop(&mut self, unit: UnitId);

    /// Current world position.
    fn position(&self, unit: UnitId) -> Option<Vec3>;

    /// Current orientation.
    fn rotation(&self, unit: UnitId) -> Option<Quat>;

    /// Place the body at `position` immediately, creating it if needed.
    fn teleport(&mut self, unit: UnitId, position: Vec3);

    /// Enable or disable the body's collider.
    fn set_collision_enabled(&mut self, unit: UnitId, enabled: bool);

    /// Remove the body entirely.
    fn despawn(&mut self, unit: UnitId);

    /// Take every completion produced since the last call.
    fn drain_completed(&mut self) -> Vec<Completion>;
}

/// Visual feedback: animation cues, health indicators, projectile effects.
pub trait Presentation {
    /// Show the unit's current hit points.
    fn set_health_value(&mut self, unit: UnitId, value: u32);

    /// Toggle the attacking animation cue.
    fn set_attacking_cue(&mut self, unit: UnitId, attacking: bool);

    /// Spawn a projectile effect that only hurts `enemy_team`.
    fn spawn_projectile_effect(&mut self, origin: Vec3, rotation: Quat, enemy_team: Team);

    /// Create a health indicator for the unit.
    fn create_health_indicator(&mut self, unit: UnitId, max_value: u32) -> IndicatorHandle;

    /// Release an indicator created by [`Presentation::create_health_indicator`].
    fn destroy_health_indicator(&mut self, handle: IndicatorHandle);
}

/// Simulation time and deferred callbacks.
pub trait Clock {
    /// Seconds since the simulation started.
    fn now(&self) -> f64;

    /// Schedule `deferred` to run `delay` seconds from now.
    fn after(&mut self, delay: f32, deferred: Deferred) -> TimerId;

    /// Cancel a pending callback. Returns false if it already ran.
    fn cancel(&mut self, timer: TimerId) -> bool;
}

/// Borrowed collaborators handed to a unit for the duration of one call.
pub struct UnitContext<'a> {
    /// Movement service.
    pub locomotion: &'a mut dyn Locomotion,
    /// Presentation service.
    pub presentation: &'a mut dyn Presentation,
    /// Clock and scheduler.
    pub clock: &'a mut dyn Clock,
}
