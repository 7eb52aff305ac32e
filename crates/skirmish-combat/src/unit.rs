//! The combat unit.
//!
//! This module provides:
//! - Hit points with clamped damage and a one-shot death transition
//! - Ranged fire gated by the attack cooldown
//! - Melee attacks with a wind-up between trigger and damage
//! - Respawn at the spawn point, or destruction after a grace period
//!
//! A unit only ever talks to its collaborators through [`UnitContext`].
//! Anything that has to wait is scheduled on the clock as a [`Deferred`]
//! and re-validated against the unit's state when it comes due.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use skirmish_common::{IndicatorHandle, TimerId, UnitId, FORWARD, UP};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{UnitConfig, DESTROY_DELAY};
use crate::services::{ArrivalAction, Clock, FacingAction, UnitContext};
use crate::team::Team;
use crate::timers::Deferred;

/// Unit error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// Spawn tag does not start with a known team prefix
    #[error("unrecognised team tag: {0:?}")]
    UnknownTeamTag(String),
    /// Configuration value out of range
    #[error("invalid unit configuration: {0}")]
    InvalidConfig(String),
    /// Unit not found
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),
}

/// Result type for unit operations.
pub type UnitResult<T> = Result<T, UnitError>;

/// Life state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Has hit points left.
    Alive,
    /// At zero hit points, waiting to respawn or be destroyed.
    Dead,
    /// Removed for good. Terminal.
    Destroyed,
}

/// What a unit is currently busy with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    /// Nothing in progress.
    Idle,
    /// Closing in on a melee target.
    MovingToTarget,
    /// Attack animation playing.
    Attacking,
    /// Dead with a respawn scheduled.
    Respawning,
}

/// Result of applying damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Hit points actually removed.
    pub applied: u32,
    /// Hit points left.
    pub remaining: u32,
    /// Whether this call killed the unit.
    pub killed: bool,
}

/// Result of reaching a melee target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// Wind-up started; the strike lands after the attack animation.
    WindUp,
    /// Still cooling down; the attack is dropped, not retried.
    Abandoned,
    /// Arrival no longer matches what the unit is doing.
    Ignored,
}

/// Verdict on a melee strike coming due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeCheck {
    /// Hit this target. The unit has already let go of it.
    Proceed(UnitId),
    /// Target was cleared during the wind-up.
    TargetLost,
    /// Attacker died or re-targeted since the wind-up began.
    Stale,
}

/// A projectile released by [`CombatUnit::on_facing`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileShot {
    /// Spawn point in front of the unit's chest.
    pub origin: Vec3,
    /// Orientation of the firing unit.
    pub rotation: Quat,
    /// Team the projectile can hurt.
    pub target_team: Team,
}

/// A single combat unit.
#[derive(Debug, Clone)]
pub struct CombatUnit {
    id: UnitId,
    tag: String,
    team: Team,
    enemy_team: Team,
    config: UnitConfig,
    current_hit_points: u32,
    /// Weak reference; resolved through the battlefield.
    target: Option<UnitId>,
    next_attack_ready: f64,
    spawn_position: Vec3,
    state: UnitState,
    activity: Activity,
    activated: bool,
    /// Bumped on every `attack`; wind-ups from older attacks are dropped.
    attack_serial: u64,
    strike_pending: bool,
    pending_timers: Vec<TimerId>,
    health_indicator: Option<IndicatorHandle>,
}

impl CombatUnit {
    /// Create a unit from a spawn tag, its configuration and spawn point.
    ///
    /// The unit starts alive but inert; call [`CombatUnit::activate`] once
    /// it is placed in the world.
    pub fn create(id: UnitId, tag: &str, config: UnitConfig, spawn_position: Vec3) -> UnitResult<Self> {
        let team = Team::from_tag(tag)?;
        if let Err(e) = config.validate() {
            error!("Rejected configuration for unit {tag:?}: {e}");
            return Err(e);
        }

        Ok(Self {
            id,
            tag: tag.to_owned(),
            team,
            enemy_team: team.enemy(),
            current_hit_points: config.hit_points,
            config,
            target: None,
            next_attack_ready: 0.0,
            spawn_position,
            state: UnitState::Alive,
            activity: Activity::Idle,
            activated: false,
            attack_serial: 0,
            strike_pending: false,
            pending_timers: Vec::new(),
            health_indicator: None,
        })
    }

    /// Place the unit in the world and allow it to act.
    pub fn activate(&mut self, ctx: &mut UnitContext<'_>) {
        if self.state != UnitState::Alive {
            return;
        }
        if self.health_indicator.is_none() {
            self.health_indicator = Some(
                ctx.presentation
                    .create_health_indicator(self.id, self.config.hit_points),
            );
        }
        ctx.presentation
            .set_health_value(self.id, self.current_hit_points);
        ctx.locomotion.set_collision_enabled(self.id, true);
        self.activated = true;
    }

    /// Release everything the unit owns: indicator, timers, body.
    pub fn dispose(&mut self, ctx: &mut UnitContext<'_>) {
        self.cancel_timers(ctx.clock);
        if let Some(handle) = self.health_indicator.take() {
            ctx.presentation.destroy_health_indicator(handle);
        }
        self.activated = false;
        self.target = None;
        ctx.locomotion.despawn(self.id);
    }

    /// Inflict damage. Hit points never go below zero.
    ///
    /// The first call that reaches zero kills the unit; later calls only
    /// refresh the health display.
    pub fn take_damage(&mut self, amount: u32, ctx: &mut UnitContext<'_>) -> DamageOutcome {
        let before = self.current_hit_points;
        self.current_hit_points = before.saturating_sub(amount);
        ctx.presentation
            .set_health_value(self.id, self.current_hit_points);

        let killed = self.current_hit_points == 0 && self.state == UnitState::Alive;
        if killed {
            self.die(ctx);
        }

        DamageOutcome {
            applied: before - self.current_hit_points,
            remaining: self.current_hit_points,
            killed,
        }
    }

    fn die(&mut self, ctx: &mut UnitContext<'_>) {
        self.state = UnitState::Dead;
        self.activated = false;
        self.target = None;
        self.strike_pending = false;
        self.cancel_timers(ctx.clock);

        ctx.presentation.set_attacking_cue(self.id, false);
        ctx.locomotion.stop(self.id);
        ctx.locomotion.set_collision_enabled(self.id, false);

        if self.config.respawns {
            self.activity = Activity::Respawning;
            self.schedule(ctx.clock, self.config.respawn_delay, Deferred::Respawn(self.id));
            info!(
                "{} ({}) died, respawning in {}s",
                self.id, self.tag, self.config.respawn_delay
            );
        } else {
            self.activity = Activity::Idle;
            self.schedule(ctx.clock, DESTROY_DELAY, Deferred::Destroy(self.id));
            info!("{} ({}) died", self.id, self.tag);
        }
    }

    /// Reset to the spawn state after a respawn delay.
    pub fn respawn(&mut self, ctx: &mut UnitContext<'_>) -> bool {
        if self.state != UnitState::Dead || !self.config.respawns {
            return false;
        }

        ctx.locomotion.teleport(self.id, self.spawn_position);
        self.current_hit_points = self.config.hit_points;
        ctx.presentation
            .set_health_value(self.id, self.current_hit_points);
        ctx.locomotion.set_collision_enabled(self.id, true);

        self.state = UnitState::Alive;
        self.activity = Activity::Idle;
        self.activated = true;
        info!("{} ({}) respawned", self.id, self.tag);
        true
    }

    /// Enter the terminal state. Only a dead unit without respawn qualifies.
    pub fn mark_destroyed(&mut self) -> bool {
        if self.state != UnitState::Dead || self.config.respawns {
            return false;
        }
        self.state = UnitState::Destroyed;
        true
    }

    /// Turn toward a ground point and fire once facing it.
    ///
    /// The turn replaces any pending move, so an approach toward a melee
    /// target is given up along with its target.
    pub fn fire_at(&mut self, point: Vec2, ctx: &mut UnitContext<'_>) -> bool {
        if !self.activated {
            debug!("{} ignored fire order while inactive", self.id);
            return false;
        }
        if self.activity == Activity::MovingToTarget {
            debug!("{} stops closing in to fire", self.id);
            self.attack_serial += 1;
            self.target = None;
            self.activity = Activity::Idle;
        }
        ctx.locomotion
            .rotate_towards(self.id, point, FacingAction::FireForward);
        true
    }

    /// Continue a turn requested by [`CombatUnit::fire_at`].
    pub fn on_facing(&mut self, action: FacingAction, ctx: &mut UnitContext<'_>) -> Option<ProjectileShot> {
        match action {
            FacingAction::FireForward => self.fire_forward(ctx),
        }
    }

    fn fire_forward(&mut self, ctx: &mut UnitContext<'_>) -> Option<ProjectileShot> {
        if !self.activated {
            return None;
        }
        let now = ctx.clock.now();
        if now < self.next_attack_ready {
            debug!("{} fire dropped, cooling down", self.id);
            return None;
        }

        let position = ctx
            .locomotion
            .position(self.id)
            .unwrap_or(self.spawn_position);
        let rotation = ctx.locomotion.rotation(self.id).unwrap_or(Quat::IDENTITY);
        let size = self.config.body_size;
        let origin = position + UP * (size.y * 0.5) + (rotation * FORWARD) * (size.z * 0.5);

        self.start_attack_cue(ctx);
        ctx.presentation
            .spawn_projectile_effect(origin, rotation, self.enemy_team);
        self.next_attack_ready = now + f64::from(self.config.attack_cooldown);

        Some(ProjectileShot {
            origin,
            rotation,
            target_team: self.enemy_team,
        })
    }

    /// Close in on `target` and swing once in reach.
    pub fn attack(&mut self, target: UnitId, target_position: Vec3, ctx: &mut UnitContext<'_>) -> bool {
        if !self.activated {
            debug!("{} ignored attack order while inactive", self.id);
            return false;
        }

        self.attack_serial += 1;
        self.target = Some(target);
        self.strike_pending = false;
        self.activity = Activity::MovingToTarget;
        ctx.locomotion.move_to(
            self.id,
            target_position,
            self.config.melee_stop_distance(),
            ArrivalAction::PerformAttack {
                serial: self.attack_serial,
            },
        );
        true
    }

    /// Continue a move requested by [`CombatUnit::attack`].
    pub fn on_arrival(&mut self, action: ArrivalAction, ctx: &mut UnitContext<'_>) -> ArrivalOutcome {
        match action {
            ArrivalAction::PerformAttack { serial } => self.perform_attack(serial, ctx),
        }
    }

    fn perform_attack(&mut self, serial: u64, ctx: &mut UnitContext<'_>) -> ArrivalOutcome {
        if !self.activated || serial != self.attack_serial || self.target.is_none() {
            return ArrivalOutcome::Ignored;
        }

        if ctx.clock.now() >= self.next_attack_ready {
            self.start_attack_cue(ctx);
            self.strike_pending = true;
            self.schedule(
                ctx.clock,
                self.config.attack_animation,
                Deferred::MeleeStrike {
                    attacker: self.id,
                    serial,
                },
            );
            ArrivalOutcome::WindUp
        } else {
            self.target = None;
            self.activity = Activity::Idle;
            ArrivalOutcome::Abandoned
        }
    }

    /// Check a strike at the end of its wind-up.
    ///
    /// On [`StrikeCheck::Proceed`] the target has already been cleared so
    /// the same wind-up cannot land twice.
    pub fn take_strike_target(&mut self, serial: u64) -> StrikeCheck {
        if !self.activated || serial != self.attack_serial || !self.strike_pending {
            return StrikeCheck::Stale;
        }
        self.strike_pending = false;
        if self.activity == Activity::Attacking {
            self.activity = Activity::Idle;
        }
        match self.target.take() {
            Some(target) => StrikeCheck::Proceed(target),
            None => StrikeCheck::TargetLost,
        }
    }

    /// Start the cooldown after a strike landed.
    pub fn finish_strike(&mut self, now: f64) {
        self.next_attack_ready = now + f64::from(self.config.attack_cooldown);
    }

    /// Drop `dead` as a target. Returns true if it was the target.
    pub fn forget_target(&mut self, dead: UnitId, ctx: &mut UnitContext<'_>) -> bool {
        if self.target != Some(dead) {
            return false;
        }
        self.target = None;
        if self.activity == Activity::MovingToTarget {
            self.activity = Activity::Idle;
            ctx.locomotion.stop(self.id);
        }
        true
    }

    fn start_attack_cue(&mut self, ctx: &mut UnitContext<'_>) {
        self.activity = Activity::Attacking;
        ctx.presentation.set_attacking_cue(self.id, true);
        self.schedule(
            ctx.clock,
            self.config.attack_animation,
            Deferred::EndAttackCue(self.id),
        );
    }

    /// Turn the attacking cue off once the animation has played.
    pub fn end_attack_cue(&mut self, ctx: &mut UnitContext<'_>) {
        ctx.presentation.set_attacking_cue(self.id, false);
        if self.activity == Activity::Attacking && !self.strike_pending {
            self.activity = if self.target.is_some() {
                Activity::MovingToTarget
            } else {
                Activity::Idle
            };
        }
    }

    fn schedule(&mut self, clock: &mut dyn Clock, delay: f32, deferred: Deferred) {
        let timer = clock.after(delay, deferred);
        self.pending_timers.push(timer);
    }

    fn cancel_timers(&mut self, clock: &mut dyn Clock) {
        for timer in self.pending_timers.drain(..) {
            clock.cancel(timer);
        }
    }

    /// Forget a timer that has just run.
    pub fn timer_fired(&mut self, timer: TimerId) {
        self.pending_timers.retain(|t| *t != timer);
    }

    /// Unit ID.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Spawn tag the team was derived from.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Own team.
    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    /// Opposing team.
    #[must_use]
    pub fn enemy_team(&self) -> Team {
        self.enemy_team
    }

    /// Combat parameters.
    #[must_use]
    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    /// Current hit points.
    #[must_use]
    pub fn hit_points(&self) -> u32 {
        self.current_hit_points
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max_hit_points(&self) -> u32 {
        self.config.hit_points
    }

    /// Damage of one melee strike.
    #[must_use]
    pub fn melee_damage(&self) -> u32 {
        self.config.melee_damage
    }

    /// Current melee target.
    #[must_use]
    pub fn target(&self) -> Option<UnitId> {
        self.target
    }

    /// Time at which the next attack is allowed.
    #[must_use]
    pub fn next_attack_ready(&self) -> f64 {
        self.next_attack_ready
    }

    /// Where the unit spawned and respawns.
    #[must_use]
    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Life state.
    #[must_use]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Current activity.
    #[must_use]
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Check if the unit has hit points left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state == UnitState::Alive
    }

    /// Check if the unit accepts orders.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Health indicator owned by the unit.
    #[must_use]
    pub fn health_indicator(&self) -> Option<IndicatorHandle> {
        self.health_indicator
    }

    /// Number of deferred callbacks the unit is waiting on.
    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.pending_timers.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Completion, Locomotion};
    use crate::testing::Harness;
    use proptest::prelude::*;

    fn spawn(harness: &mut Harness, tag: &str, config: UnitConfig) -> CombatUnit {
        let id = UnitId::new();
        let position = Vec3::new(0.0, 0.0, 0.0);
        harness.locomotion.teleport(id, position);
        let mut unit = CombatUnit::create(id, tag, config, position).expect("valid unit");
        unit.activate(&mut harness.ctx());
        unit
    }

    /// Run every due callback that belongs to `unit`.
    fn run_due(harness: &mut Harness, unit: &mut CombatUnit) -> Vec<Deferred> {
        let mut ran = Vec::new();
        while let Some((timer, deferred)) = harness.clock.pop_due() {
            unit.timer_fired(timer);
            match deferred {
                Deferred::EndAttackCue(_) => unit.end_attack_cue(&mut harness.ctx()),
                Deferred::Respawn(_) => {
                    unit.respawn(&mut harness.ctx());
                },
                Deferred::Destroy(_) => {
                    unit.mark_destroyed();
                },
                Deferred::MeleeStrike { serial, .. } => {
                    unit.take_strike_target(serial);
                },
            }
            ran.push(deferred);
        }
        ran
    }

    #[test]
    fn test_create_rejects_unknown_team() {
        let result = CombatUnit::create(UnitId::new(), "green", UnitConfig::default(), Vec3::ZERO);
        assert_eq!(result.err(), Some(UnitError::UnknownTeamTag("green".into())));
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let config = UnitConfig::default().with_hit_points(0);
        let result = CombatUnit::create(UnitId::new(), "red", config, Vec3::ZERO);
        assert!(matches!(result, Err(UnitError::InvalidConfig(_))));
    }

    #[test]
    fn test_create_derives_teams() {
        let unit = CombatUnit::create(UnitId::new(), "red_archer", UnitConfig::default(), Vec3::ONE)
            .expect("valid unit");
        assert_eq!(unit.team(), Team::Red);
        assert_eq!(unit.enemy_team(), Team::Blue);
        assert!(unit.is_alive());
        assert!(!unit.is_activated());
    }

    #[test]
    fn test_activate_creates_health_indicator() {
        let mut harness = Harness::default();
        let unit = spawn(&mut harness, "blue", UnitConfig::default().with_hit_points(7));

        let handle = unit.health_indicator().expect("indicator created");
        assert_eq!(harness.presentation.indicator_of(unit.id()), Some(handle));
        assert_eq!(harness.presentation.last_health(unit.id()), Some(7));
        assert!(unit.is_activated());
    }

    #[test]
    fn test_damage_scenario() {
        let mut harness = Harness::default();
        let config = UnitConfig::default().with_hit_points(10).with_melee_damage(3);
        let mut unit = spawn(&mut harness, "blue", config);

        let outcome = unit.take_damage(4, &mut harness.ctx());
        assert_eq!(outcome.remaining, 6);
        assert!(!outcome.killed);
        assert!(unit.is_alive());

        let outcome = unit.take_damage(10, &mut harness.ctx());
        assert_eq!(outcome, DamageOutcome { applied: 6, remaining: 0, killed: true });
        assert_eq!(unit.state(), UnitState::Dead);
        assert!(!unit.is_activated());

        let outcome = unit.take_damage(5, &mut harness.ctx());
        assert_eq!(outcome, DamageOutcome { applied: 0, remaining: 0, killed: false });
        assert_eq!(unit.hit_points(), 0);
        // Health display still refreshed on every hit.
        assert_eq!(harness.presentation.last_health(unit.id()), Some(0));
        assert_eq!(harness.presentation.health_updates.len(), 4);
        // Only the destroy timer from the single death.
        assert_eq!(harness.clock.len(), 1);
        assert_eq!(unit.pending_timer_count(), 1);
    }

    #[test]
    fn test_death_disables_collision() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "red", UnitConfig::default());
        assert_eq!(harness.locomotion.collision_enabled(unit.id()), Some(true));

        unit.take_damage(1, &mut harness.ctx());
        assert_eq!(harness.locomotion.collision_enabled(unit.id()), Some(false));
        assert!(harness.locomotion.stops.contains(&unit.id()));
    }

    #[test]
    fn test_destroyed_after_grace_period() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "red", UnitConfig::default());
        unit.take_damage(3, &mut harness.ctx());

        harness.clock.advance(4.0);
        assert!(run_due(&mut harness, &mut unit).is_empty());
        assert_eq!(unit.state(), UnitState::Dead);

        harness.clock.advance(1.0);
        assert_eq!(run_due(&mut harness, &mut unit), vec![Deferred::Destroy(unit.id())]);
        assert_eq!(unit.state(), UnitState::Destroyed);
        assert!(!unit.respawn(&mut harness.ctx()));
    }

    #[test]
    fn test_respawn_resets_unit() {
        let mut harness = Harness::default();
        let config = UnitConfig::default().with_hit_points(5).with_respawn(10.0);
        let mut unit = spawn(&mut harness, "blue", config);
        harness.locomotion.teleport(unit.id(), Vec3::new(8.0, 0.0, 3.0));

        unit.take_damage(5, &mut harness.ctx());
        assert_eq!(unit.activity(), Activity::Respawning);

        harness.clock.advance(9.5);
        run_due(&mut harness, &mut unit);
        assert_eq!(unit.state(), UnitState::Dead);

        harness.clock.advance(0.5);
        assert_eq!(run_due(&mut harness, &mut unit), vec![Deferred::Respawn(unit.id())]);
        assert!(unit.is_alive());
        assert!(unit.is_activated());
        assert_eq!(unit.hit_points(), 5);
        assert_eq!(harness.locomotion.position(unit.id()), Some(Vec3::ZERO));
        assert_eq!(harness.locomotion.collision_enabled(unit.id()), Some(true));
        assert_eq!(harness.presentation.last_health(unit.id()), Some(5));
        assert!(!unit.mark_destroyed());
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let mut harness = Harness::default();
        let config = UnitConfig::default().with_attack_cooldown(1.0);
        let mut unit = spawn(&mut harness, "blue", config);
        let point = Vec2::new(0.0, 10.0);

        for _ in 0..2 {
            assert!(unit.fire_at(point, &mut harness.ctx()));
            for completion in harness.locomotion.drain_completed() {
                if let Completion::Faced { action, .. } = completion {
                    unit.on_facing(action, &mut harness.ctx());
                }
            }
            harness.clock.advance(0.25);
        }
        assert_eq!(harness.presentation.projectiles.len(), 1);

        harness.clock.advance(0.5);
        unit.fire_at(point, &mut harness.ctx());
        let shot = harness
            .locomotion
            .drain_completed()
            .into_iter()
            .find_map(|c| match c {
                Completion::Faced { action, .. } => {
                    unit.on_facing(action, &mut harness.ctx())
                },
                Completion::Arrived { .. } => None,
            });
        assert!(shot.is_some());
        assert_eq!(harness.presentation.projectiles.len(), 2);
    }

    #[test]
    fn test_projectile_origin_offset() {
        let mut harness = Harness::default();
        let config = UnitConfig::default().with_body_size(Vec3::new(1.0, 2.0, 4.0));
        let mut unit = spawn(&mut harness, "red", config);

        unit.fire_at(Vec2::new(10.0, 0.0), &mut harness.ctx());
        harness.locomotion.drain_completed();
        let shot = unit
            .on_facing(FacingAction::FireForward, &mut harness.ctx())
            .expect("off cooldown");

        // Half height up, half depth along +X (the facing direction).
        assert!((shot.origin - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-5);
        assert_eq!(shot.target_team, Team::Blue);
        assert!(harness.presentation.is_attacking(unit.id()));

        harness.clock.advance(0.3);
        run_due(&mut harness, &mut unit);
        assert!(!harness.presentation.is_attacking(unit.id()));
        assert_eq!(unit.activity(), Activity::Idle);
    }

    #[test]
    fn test_inactive_unit_ignores_orders() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "blue", UnitConfig::default());
        unit.take_damage(1, &mut harness.ctx());

        assert!(!unit.fire_at(Vec2::ONE, &mut harness.ctx()));
        assert!(!unit.attack(UnitId::new(), Vec3::ONE, &mut harness.ctx()));
        assert!(harness.locomotion.drain_completed().is_empty());
        assert!(harness.locomotion.pending_move(unit.id()).is_none());
        assert!(unit
            .on_facing(FacingAction::FireForward, &mut harness.ctx())
            .is_none());
    }

    #[test]
    fn test_attack_moves_within_reach() {
        let mut harness = Harness::default();
        let config = UnitConfig::default()
            .with_body_size(Vec3::new(1.0, 2.0, 0.5))
            .with_melee_range(1.5);
        let mut unit = spawn(&mut harness, "blue", config);
        let enemy = UnitId::new();
        let enemy_position = Vec3::new(10.0, 0.0, 0.0);

        assert!(unit.attack(enemy, enemy_position, &mut harness.ctx()));
        assert_eq!(unit.target(), Some(enemy));
        assert_eq!(unit.activity(), Activity::MovingToTarget);

        let pending = harness.locomotion.pending_move(unit.id()).expect("move requested");
        assert_eq!(pending.destination, enemy_position);
        assert!((pending.stop_distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_fire_while_closing_in_drops_target() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "blue", UnitConfig::default());

        unit.attack(UnitId::new(), Vec3::X * 9.0, &mut harness.ctx());
        let approach = harness
            .locomotion
            .pending_move(unit.id())
            .map(|m| m.action)
            .expect("move requested");
        assert!(unit.fire_at(Vec2::new(0.0, 5.0), &mut harness.ctx()));

        assert_eq!(unit.target(), None);
        assert_eq!(unit.activity(), Activity::Idle);
        // The superseded approach can no longer start a wind-up.
        assert_eq!(
            unit.on_arrival(approach, &mut harness.ctx()),
            ArrivalOutcome::Ignored
        );
        assert!(harness.clock.is_empty());
    }

    #[test]
    fn test_wind_up_then_strike() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "blue", UnitConfig::default().with_melee_damage(3));
        let enemy = UnitId::new();

        unit.attack(enemy, Vec3::X * 5.0, &mut harness.ctx());
        let serial = match harness.locomotion.pending_move(unit.id()).map(|m| m.action) {
            Some(ArrivalAction::PerformAttack { serial }) => serial,
            None => panic!("no move requested"),
        };
        assert_eq!(
            unit.on_arrival(ArrivalAction::PerformAttack { serial }, &mut harness.ctx()),
            ArrivalOutcome::WindUp
        );
        assert_eq!(unit.activity(), Activity::Attacking);
        assert_eq!(unit.target(), Some(enemy));

        assert_eq!(unit.take_strike_target(serial), StrikeCheck::Proceed(enemy));
        assert_eq!(unit.target(), None);
        // A second resolution of the same wind-up is refused.
        assert_eq!(unit.take_strike_target(serial), StrikeCheck::Stale);
    }

    #[test]
    fn test_arrival_on_cooldown_abandons() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "blue", UnitConfig::default().with_attack_cooldown(2.0));
        unit.finish_strike(harness.now());

        unit.attack(UnitId::new(), Vec3::X, &mut harness.ctx());
        let outcome = unit.on_arrival(ArrivalAction::PerformAttack { serial: 1 }, &mut harness.ctx());
        assert_eq!(outcome, ArrivalOutcome::Abandoned);
        assert_eq!(unit.target(), None);
        assert_eq!(unit.activity(), Activity::Idle);
        assert!(harness.clock.is_empty());
    }

    #[test]
    fn test_retarget_invalidates_wind_up() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "red", UnitConfig::default());
        let first = UnitId::new();
        let second = UnitId::new();

        unit.attack(first, Vec3::X, &mut harness.ctx());
        unit.on_arrival(ArrivalAction::PerformAttack { serial: 1 }, &mut harness.ctx());
        unit.attack(second, Vec3::Z, &mut harness.ctx());

        assert_eq!(unit.take_strike_target(1), StrikeCheck::Stale);
        assert_eq!(unit.target(), Some(second));
    }

    #[test]
    fn test_death_mid_wind_up_cancels_strike() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "red", UnitConfig::default());

        unit.attack(UnitId::new(), Vec3::X, &mut harness.ctx());
        unit.on_arrival(ArrivalAction::PerformAttack { serial: 1 }, &mut harness.ctx());
        unit.take_damage(1, &mut harness.ctx());

        assert_eq!(unit.take_strike_target(1), StrikeCheck::Stale);
        assert!(!harness.presentation.is_attacking(unit.id()));
        harness.clock.advance(0.3);
        // Cue and strike timers were cancelled with the death.
        assert!(run_due(&mut harness, &mut unit).is_empty());
    }

    #[test]
    fn test_dispose_releases_indicator() {
        let mut harness = Harness::default();
        let mut unit = spawn(&mut harness, "blue", UnitConfig::default());
        unit.take_damage(1, &mut harness.ctx());

        unit.dispose(&mut harness.ctx());
        assert!(harness.presentation.indicators.is_empty());
        assert!(unit.health_indicator().is_none());
        assert!(harness.clock.is_empty());
        assert!(!harness.locomotion.has_body(unit.id()));
    }

    proptest! {
        #[test]
        fn prop_damage_never_underflows(max in 1u32..1000, hits in prop::collection::vec(0u32..500, 1..20)) {
            let mut harness = Harness::default();
            let mut unit = spawn(&mut harness, "blue", UnitConfig::default().with_hit_points(max));
            let mut deaths = 0;
            for amount in hits {
                let prior = unit.hit_points();
                let outcome = unit.take_damage(amount, &mut harness.ctx());
                prop_assert_eq!(unit.hit_points(), prior.saturating_sub(amount));
                prop_assert!(unit.hit_points() <= unit.max_hit_points());
                if outcome.killed {
                    deaths += 1;
                }
            }
            prop_assert!(deaths <= 1);
            prop_assert_eq!(deaths == 1, unit.hit_points() == 0);
        }
    }
}
