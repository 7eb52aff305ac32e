//! Collaborator doubles for unit and battlefield tests.

use ahash::AHashMap;
use glam::{Quat, Vec2, Vec3};
use skirmish_common::{facing_rotation, IndicatorHandle, UnitId};

use crate::services::{
    ArrivalAction, Clock, Completion, FacingAction, Locomotion, Presentation, UnitContext,
};
use crate::team::Team;
use crate::timers::TimerQueue;

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    rotation: Quat,
    collision: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingMove {
    pub destination: Vec3,
    pub stop_distance: f32,
    pub action: ArrivalAction,
}

/// Turns instantly; moves complete only when a test calls [`Self::arrive`].
#[derive(Debug, Default)]
pub(crate) struct ScriptedLocomotion {
    bodies: AHashMap<UnitId, Body>,
    moves: AHashMap<UnitId, PendingMove>,
    completed: Vec<Completion>,
    pub stops: Vec<UnitId>,
}

impl ScriptedLocomotion {
    /// Finish the unit's pending move, stopping short of the destination.
    pub fn arrive(&mut self, unit: UnitId) -> bool {
        let Some(pending) = self.moves.remove(&unit) else {
            return false;
        };
        if let Some(body) = self.bodies.get_mut(&unit) {
            let approach = (body.position - pending.destination).normalize_or_zero();
            body.position = pending.destination + approach * pending.stop_distance;
        }
        self.completed.push(Completion::Arrived {
            unit,
            action: pending.action,
        });
        true
    }

    pub fn pending_move(&self, unit: UnitId) -> Option<PendingMove> {
        self.moves.get(&unit).copied()
    }

    pub fn collision_enabled(&self, unit: UnitId) -> Option<bool> {
        self.bodies.get(&unit).map(|b| b.collision)
    }

    pub fn has_body(&self, unit: UnitId) -> bool {
        self.bodies.contains_key(&unit)
    }
}

impl Locomotion for ScriptedLocomotion {
    fn move_to(&mut self, unit: UnitId, destination: Vec3, stop_distance: f32, on_arrival: ArrivalAction) {
        self.moves.insert(
            unit,
            PendingMove {
                destination,
                stop_distance,
                action: on_arrival,
            },
        );
    }

    fn rotate_towards(&mut self, unit: UnitId, point: Vec2, on_facing: FacingAction) {
        if let Some(body) = self.bodies.get_mut(&unit) {
            if let Some(rotation) = facing_rotation(body.position, point) {
                body.rotation = rotation;
            }
        }
        self.completed.push(Completion::Faced {
            unit,
            action: on_facing,
        });
    }

    fn stop(&mut self, unit: UnitId) {
        self.moves.remove(&unit);
        self.completed.retain(|c| match c {
            Completion::Arrived { unit: u, .. } | Completion::Faced { unit: u, .. } => *u != unit,
        });
        self.stops.push(unit);
    }

    fn position(&self, unit: UnitId) -> Option<Vec3> {
        self.bodies.get(&unit).map(|b| b.position)
    }

    fn rotation(&self, unit: UnitId) -> Option<Quat> {
        self.bodies.get(&unit).map(|b| b.rotation)
    }

    fn teleport(&mut self, unit: UnitId, position: Vec3) {
        self.bodies
            .entry(unit)
            .and_modify(|b| b.position = position)
            .or_insert(Body {
                position,
                rotation: Quat::IDENTITY,
                collision: true,
            });
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

/// Records every presentation call.
#[derive(Debug, Default)]
pub(crate) struct RecordingPresentation {
    pub health_updates: Vec<(UnitId, u32)>,
    pub attacking: AHashMap<UnitId, bool>,
    pub projectiles: Vec<(Vec3, Quat, Team)>,
    pub indicators: AHashMap<IndicatorHandle, UnitId>,
    next_indicator: u64,
}

impl RecordingPresentation {
    pub fn last_health(&self, unit: UnitId) -> Option<u32> {
        self.health_updates
            .iter()
            .rev()
            .find(|(u, _)| *u == unit)
            .map(|(_, v)| *v)
    }

    pub fn is_attacking(&self, unit: UnitId) -> bool {
        self.attacking.get(&unit).copied().unwrap_or(false)
    }

    pub fn indicator_of(&self, unit: UnitId) -> Option<IndicatorHandle> {
        self.indicators
            .iter()
            .find(|(_, u)| **u == unit)
            .map(|(h, _)| *h)
    }
}

impl Presentation for RecordingPresentation {
    fn set_health_value(&mut self, unit: UnitId, value: u32) {
        self.health_updates.push((unit, value));
    }

    fn set_attacking_cue(&mut self, unit: UnitId, attacking: bool) {
        self.attacking.insert(unit, attacking);
    }

    fn spawn_projectile_effect(&mut self, origin: Vec3, rotation: Quat, enemy_team: Team) {
        self.projectiles.push((origin, rotation, enemy_team));
    }

    fn create_health_indicator(&mut self, unit: UnitId, _max_value: u32) -> IndicatorHandle {
        self.next_indicator += 1;
        let handle = IndicatorHandle::new(self.next_indicator);
        self.indicators.insert(handle, unit);
        handle
    }

    fn destroy_health_indicator(&mut self, handle: IndicatorHandle) {
        self.indicators.remove(&handle);
    }
}

/// Doubles plus a real timer queue, for driving a lone unit.
#[derive(Debug, Default)]
pub(crate) struct Harness {
    pub locomotion: ScriptedLocomotion,
    pub presentation: RecordingPresentation,
    pub clock: TimerQueue,
}

impl Harness {
    pub fn ctx(&mut self) -> UnitContext<'_> {
        UnitContext {
            locomotion: &mut self.locomotion,
            presentation: &mut self.presentation,
            clock: &mut self.clock,
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }
}
