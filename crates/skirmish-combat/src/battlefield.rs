//! Battlefield: the owning simulation loop for combat units.
//!
//! The battlefield owns every [`CombatUnit`], the [`TimerQueue`] and the
//! two engine-side services. It resolves unit IDs (the only way units
//! refer to each other), routes locomotion completions and due timers back
//! to the unit that asked for them, and publishes [`CombatEvent`]s.

use ahash::AHashMap;
use glam::{Vec2, Vec3};
use skirmish_common::{TimerId, UnitId};
use tracing::{debug, info};

use crate::config::UnitConfig;
use crate::events::{AbandonReason, CombatEvent, EventBus};
use crate::services::{Clock, Completion, Locomotion, Presentation, UnitContext};
use crate::team::Team;
use crate::timers::{Deferred, TimerQueue};
use crate::unit::{ArrivalOutcome, CombatUnit, DamageOutcome, StrikeCheck, UnitError, UnitResult};

/// Owns units and drives their deferred behaviour.
#[derive(Debug)]
pub struct Battlefield<L, P> {
    units: AHashMap<UnitId, CombatUnit>,
    timers: TimerQueue,
    locomotion: L,
    presentation: P,
    events: EventBus,
}

impl<L: Locomotion, P: Presentation> Battlefield<L, P> {
    /// Create an empty battlefield at time zero.
    #[must_use]
    pub fn new(locomotion: L, presentation: P) -> Self {
        Self {
            units: AHashMap::new(),
            timers: TimerQueue::new(),
            locomotion,
            presentation,
            events: EventBus::default(),
        }
    }

    /// Run `f` against a unit with the collaborators borrowed alongside it.
    fn with_unit<R>(
        &mut self,
        id: UnitId,
        f: impl FnOnce(&mut CombatUnit, &mut UnitContext<'_>) -> R,
    ) -> Option<R> {
        let unit = self.units.get_mut(&id)?;
        let mut ctx = UnitContext {
            locomotion: &mut self.locomotion,
            presentation: &mut self.presentation,
            clock: &mut self.timers,
        };
        Some(f(unit, &mut ctx))
    }

    /// Spawn and activate a unit. Fails on an unknown team tag or a bad
    /// configuration; nothing is added in that case.
    pub fn spawn(&mut self, tag: &str, config: UnitConfig, position: Vec3) -> UnitResult<UnitId> {
        let id = UnitId::new();
        let unit = CombatUnit::create(id, tag, config, position)?;
        let team = unit.team();

        self.locomotion.teleport(id, position);
        self.units.insert(id, unit);
        self.with_unit(id, |unit, ctx| unit.activate(ctx));

        info!("Spawned {id} ({tag}) for team {team} at {position}");
        self.events.publish(CombatEvent::UnitSpawned { unit: id, team, position });
        Ok(id)
    }

    /// Remove a unit immediately, releasing everything it owns.
    pub fn despawn(&mut self, id: UnitId) -> bool {
        let Some(mut unit) = self.units.remove(&id) else {
            return false;
        };
        let mut ctx = UnitContext {
            locomotion: &mut self.locomotion,
            presentation: &mut self.presentation,
            clock: &mut self.timers,
        };
        unit.dispose(&mut ctx);
        self.release_target(id);
        self.events.publish(CombatEvent::UnitDestroyed { unit: id });
        true
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Damage a unit from an unspecified source.
    pub fn take_damage(&mut self, id: UnitId, amount: u32) -> Option<DamageOutcome> {
        self.apply_damage(id, amount, None)
    }

    /// Order a unit to fire at a ground point.
    ///
    /// Returns `Ok(false)` when the unit is not accepting orders.
    pub fn fire_at(&mut self, id: UnitId, point: Vec2) -> UnitResult<bool> {
        self.with_unit(id, |unit, ctx| unit.fire_at(point, ctx))
            .ok_or(UnitError::UnitNotFound(id))
    }

    /// Order `attacker` to close in on `target` and strike it.
    ///
    /// Fails when either unit is not on the battlefield. Ignored when the
    /// target is the attacker itself or already dead.
    pub fn attack(&mut self, attacker: UnitId, target: UnitId) -> UnitResult<bool> {
        if !self.units.contains_key(&attacker) {
            return Err(UnitError::UnitNotFound(attacker));
        }
        if attacker == target {
            debug!("{attacker} cannot attack itself");
            return Ok(false);
        }
        let fallback = match self.units.get(&target) {
            Some(unit) if unit.is_alive() => unit.spawn_position(),
            Some(_) => {
                debug!("{attacker} ordered to attack dead {target}");
                return Ok(false);
            },
            None => return Err(UnitError::UnitNotFound(target)),
        };
        let position = self.locomotion.position(target).unwrap_or(fallback);
        self.with_unit(attacker, |unit, ctx| unit.attack(target, position, ctx))
            .ok_or(UnitError::UnitNotFound(attacker))
    }

    // ========================================================================
    // Simulation step
    // ========================================================================

    /// Advance time by `dt` seconds, then handle locomotion completions and
    /// every callback that has come due.
    pub fn advance(&mut self, dt: f32) {
        self.timers.advance(dt);

        for completion in self.locomotion.drain_completed() {
            self.dispatch_completion(completion);
        }

        while let Some((timer, deferred)) = self.timers.pop_due() {
            self.dispatch(timer, deferred);
        }
    }

    fn dispatch_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Arrived { unit, action } => {
                let outcome = self.with_unit(unit, |u, ctx| u.on_arrival(action, ctx));
                if outcome == Some(ArrivalOutcome::Abandoned) {
                    debug!("{unit} reached its target while cooling down");
                    self.events.publish(CombatEvent::AttackAbandoned {
                        attacker: unit,
                        reason: AbandonReason::OnCooldown,
                    });
                }
            },
            Completion::Faced { unit, action } => {
                if let Some(Some(shot)) = self.with_unit(unit, |u, ctx| u.on_facing(action, ctx)) {
                    self.events.publish(CombatEvent::ProjectileFired {
                        unit,
                        origin: shot.origin,
                        rotation: shot.rotation,
                        target_team: shot.target_team,
                    });
                }
            },
        }
    }

    fn dispatch(&mut self, timer: TimerId, deferred: Deferred) {
        let owner = deferred.owner();
        let Some(unit) = self.units.get_mut(&owner) else {
            return;
        };
        unit.timer_fired(timer);

        match deferred {
            Deferred::EndAttackCue(id) => {
                self.with_unit(id, |u, ctx| u.end_attack_cue(ctx));
            },
            Deferred::MeleeStrike { attacker, serial } => self.resolve_strike(attacker, serial),
            Deferred::Respawn(id) => {
                if self.with_unit(id, |u, ctx| u.respawn(ctx)) == Some(true) {
                    let position = self
                        .units
                        .get(&id)
                        .map_or(Vec3::ZERO, CombatUnit::spawn_position);
                    self.events.publish(CombatEvent::UnitRespawned { unit: id, position });
                }
            },
            Deferred::Destroy(id) => self.destroy(id),
        }
    }

    fn resolve_strike(&mut self, attacker: UnitId, serial: u64) {
        let check = self.with_unit(attacker, |u, _| u.take_strike_target(serial));
        let target = match check {
            Some(StrikeCheck::Proceed(target)) => target,
            Some(StrikeCheck::TargetLost) => {
                self.publish_target_lost(attacker);
                return;
            },
            Some(StrikeCheck::Stale) | None => return,
        };

        let (damage, target_alive) = match (self.units.get(&attacker), self.units.get(&target)) {
            (Some(a), Some(t)) => (a.melee_damage(), t.is_alive()),
            _ => (0, false),
        };
        if !target_alive {
            self.publish_target_lost(attacker);
            return;
        }

        let now = self.timers.now();
        if let Some(unit) = self.units.get_mut(&attacker) {
            unit.finish_strike(now);
        }
        debug!("{attacker} strikes {target} for {damage}");
        self.events.publish(CombatEvent::MeleeHit {
            attacker,
            target,
            damage,
        });
        self.apply_damage(target, damage, Some(attacker));
    }

    fn publish_target_lost(&mut self, attacker: UnitId) {
        debug!("{attacker} lost its target during the wind-up");
        self.events.publish(CombatEvent::AttackAbandoned {
            attacker,
            reason: AbandonReason::TargetLost,
        });
    }

    fn apply_damage(&mut self, id: UnitId, amount: u32, source: Option<UnitId>) -> Option<DamageOutcome> {
        let outcome = self.with_unit(id, |u, ctx| u.take_damage(amount, ctx))?;
        self.events.publish(CombatEvent::UnitDamaged {
            unit: id,
            amount,
            remaining: outcome.remaining,
            source,
        });

        if outcome.killed {
            let will_respawn = self.units.get(&id).is_some_and(|u| u.config().respawns);
            self.events.publish(CombatEvent::UnitDied {
                unit: id,
                killer: source,
                will_respawn,
            });
            self.release_target(id);
        }
        Some(outcome)
    }

    /// Clear `dead` from every unit that was targeting it.
    fn release_target(&mut self, dead: UnitId) {
        let hunters: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.target() == Some(dead))
            .map(CombatUnit::id)
            .collect();
        for hunter in hunters {
            self.with_unit(hunter, |u, ctx| u.forget_target(dead, ctx));
        }
    }

    fn destroy(&mut self, id: UnitId) {
        if !self
            .units
            .get_mut(&id)
            .is_some_and(CombatUnit::mark_destroyed)
        {
            return;
        }
        if let Some(mut unit) = self.units.remove(&id) {
            let mut ctx = UnitContext {
                locomotion: &mut self.locomotion,
                presentation: &mut self.presentation,
                clock: &mut self.timers,
            };
            unit.dispose(&mut ctx);
            info!("{id} ({}) destroyed", unit.tag());
        }
        self.events.publish(CombatEvent::UnitDestroyed { unit: id });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&CombatUnit> {
        self.units.get(&id)
    }

    /// Iterate over every unit still on the battlefield, dead or alive.
    pub fn units(&self) -> impl Iterator<Item = &CombatUnit> {
        self.units.values()
    }

    /// Iterate over the living units of a team.
    pub fn living_units(&self, team: Team) -> impl Iterator<Item = &CombatUnit> {
        self.units
            .values()
            .filter(move |u| u.team() == team && u.is_alive())
    }

    /// Number of units on the battlefield.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if no units are left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.timers.now()
    }

    /// Pending deferred callbacks.
    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Take every event published since the last drain.
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    /// Locomotion service.
    #[must_use]
    pub fn locomotion(&self) -> &L {
        &self.locomotion
    }

    /// Mutable locomotion service, for stepping movement.
    pub fn locomotion_mut(&mut self) -> &mut L {
        &mut self.locomotion
    }

    /// Presentation service.
    #[must_use]
    pub fn presentation(&self) -> &P {
        &self.presentation
    }
}

// ============================================================================
// Tests
// ============================================================================
