//! The battle loop.
//!
//! Ties the combat battlefield to straight-line movement, the log HUD,
//! projectile flight and the commander, and runs it until one team is
//! eliminated or time runs out.

use parking_lot::Mutex;
use serde::Serialize;
use skirmish_combat::{Battlefield, CombatEvent, CombatUnit, Team, UnitState};
use skirmish_common::{SkirmishError, SkirmishResult, UnitId};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ballistics::Ballistics;
use crate::commander::Commander;
use crate::config::SimConfig;
use crate::hud::{HudPresentation, HudState};
use crate::locomotion::Mover;
use crate::timing::FixedTimestep;

/// Projectiles fly this many times the firing range before expiring.
const PROJECTILE_RANGE_FACTOR: f32 = 1.5;

/// Count of each kind of combat event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventTally {
    /// Units spawned
    pub spawned: u32,
    /// Damage applications
    pub damaged: u32,
    /// Deaths
    pub died: u32,
    /// Respawns
    pub respawned: u32,
    /// Units removed for good
    pub destroyed: u32,
    /// Projectiles fired
    pub projectiles: u32,
    /// Melee strikes landed
    pub melee_hits: u32,
    /// Melee attacks dropped
    pub abandoned: u32,
}

impl EventTally {
    fn record(&mut self, event: &CombatEvent) {
        let counter = match event {
            CombatEvent::UnitSpawned { .. } => &mut self.spawned,
            CombatEvent::UnitDamaged { .. } => &mut self.damaged,
            CombatEvent::UnitDied { .. } => &mut self.died,
            CombatEvent::UnitRespawned { .. } => &mut self.respawned,
            CombatEvent::UnitDestroyed { .. } => &mut self.destroyed,
            CombatEvent::ProjectileFired { .. } => &mut self.projectiles,
            CombatEvent::MeleeHit { .. } => &mut self.melee_hits,
            CombatEvent::AttackAbandoned { .. } => &mut self.abandoned,
        };
        *counter += 1;
    }
}

/// A unit still on the battlefield at the end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Survivor {
    /// Unit ID
    pub unit: UnitId,
    /// Spawn tag
    pub tag: String,
    /// Team
    pub team: Team,
    /// Hit points left
    pub hit_points: u32,
    /// Full hit points
    pub max_hit_points: u32,
    /// Life-cycle state
    pub state: UnitState,
}

/// Summary of a finished battle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleReport {
    /// Simulated seconds
    pub duration: f64,
    /// Steps run
    pub ticks: u64,
    /// Last team standing, if any
    pub winner: Option<Team>,
    /// Event counts
    pub events: EventTally,
    /// Units left on the battlefield
    pub survivors: Vec<Survivor>,
}

impl BattleReport {
    /// Write the report as pretty JSON.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> SkirmishResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SkirmishError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        info!("Wrote battle report to {}", path.display());
        Ok(())
    }
}

/// A running battle.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    field: Battlefield<Mover, HudPresentation>,
    commander: Commander,
    ballistics: Ballistics,
    hud: Arc<Mutex<HudState>>,
    tally: EventTally,
    ticks: u64,
}

impl Simulation {
    /// Build the battlefield and spawn the roster.
    ///
    /// The configuration is clamped with [`SimConfig::validate`] first.
    /// Roster entries that cannot be spawned are skipped with a warning.
    #[must_use]
    pub fn new(mut config: SimConfig) -> Self {
        config.validate();
        let hud = HudPresentation::new();
        let shared = hud.state();
        let mut field = Battlefield::new(Mover::new(config.move_speed, config.turn_speed), hud);
        let mut commander = Commander::new(config.seed, config.fire_range, config.aim_spread);
        let ballistics = Ballistics::new(
            config.projectile_speed,
            config.projectile_damage,
            config.hit_radius,
            config.fire_range * PROJECTILE_RANGE_FACTOR,
        );

        for entry in &config.units {
            match field.spawn(&entry.tag, entry.stats.clone(), entry.position) {
                Ok(id) => commander.assign(id, entry.role),
                Err(e) => warn!("Skipping roster entry {}: {e}", entry.tag),
            }
        }

        let mut sim = Self {
            config,
            field,
            commander,
            ballistics,
            hud: shared,
            tally: EventTally::default(),
            ticks: 0,
        };
        sim.process_events();
        sim
    }

    /// Advance the battle by one step of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.commander.command(&mut self.field);
        self.field.locomotion_mut().step(dt);
        self.field.advance(dt);
        self.process_events();

        for hit in self.ballistics.step(dt, &self.field) {
            debug!("{} shot {} for {}", hit.shooter, hit.target, hit.damage);
            self.field.take_damage(hit.target, hit.damage);
        }
        self.process_events();
        self.ticks += 1;
    }

    fn process_events(&mut self) {
        for event in self.field.drain_events() {
            self.tally.record(&event);
            match event {
                CombatEvent::ProjectileFired {
                    unit,
                    origin,
                    rotation,
                    target_team,
                } => self.ballistics.launch(unit, origin, rotation, target_team),
                CombatEvent::UnitDied {
                    unit,
                    killer,
                    will_respawn,
                } => {
                    let by = killer.map_or_else(|| "a projectile".to_owned(), |k| k.to_string());
                    info!("{unit} killed by {by} (respawns: {will_respawn})");
                },
                CombatEvent::UnitRespawned { unit, position } => {
                    info!("{unit} respawned at {position}");
                },
                CombatEvent::UnitDestroyed { unit } => self.commander.dismiss(unit),
                CombatEvent::AttackAbandoned { attacker, reason } => {
                    debug!("{attacker} abandoned its attack: {reason:?}");
                },
                CombatEvent::UnitSpawned { .. }
                | CombatEvent::UnitDamaged { .. }
                | CombatEvent::MeleeHit { .. } => {},
            }
        }
    }

    /// Whether the team still has a unit that can fight, now or after a
    /// respawn.
    #[must_use]
    pub fn team_standing(&self, team: Team) -> bool {
        self.field.units().any(|u| {
            u.team() == team && (u.is_alive() || (u.state() == UnitState::Dead && u.config().respawns))
        })
    }

    /// The battle is over when at most one team is standing.
    #[must_use]
    pub fn is_over(&self) -> bool {
        Team::ALL.iter().filter(|t| self.team_standing(**t)).count() <= 1
    }

    /// Run until the battle is over or the time limit is reached.
    pub fn run(&mut self) -> BattleReport {
        let mut timestep = FixedTimestep::new(self.config.tick_rate);
        let dt = timestep.fixed_dt();
        let limit = f64::from(self.config.max_duration);

        info!(
            "Battle starting with {} units ({})",
            self.field.len(),
            if self.config.realtime { "real time" } else { "as fast as possible" }
        );

        while !self.is_over() && self.field.now() < limit {
            if self.config.realtime {
                let frame = timestep.delta_time();
                for _ in 0..timestep.accumulate(frame) {
                    self.step(dt);
                }
                timestep.sleep_remainder();
            } else {
                self.step(dt);
            }
        }

        let report = self.report();
        match report.winner {
            Some(team) => info!("Team {team} wins after {:.1}s", report.duration),
            None => info!("No winner after {:.1}s", report.duration),
        }
        report
    }

    /// Summarize the battle so far.
    #[must_use]
    pub fn report(&self) -> BattleReport {
        let standing: Vec<Team> = Team::ALL
            .iter()
            .copied()
            .filter(|t| self.team_standing(*t))
            .collect();
        let winner = match standing.as_slice() {
            [team] => Some(*team),
            _ => None,
        };

        let mut survivors: Vec<Survivor> = self
            .field
            .units()
            .map(|u: &CombatUnit| Survivor {
                unit: u.id(),
                tag: u.tag().to_owned(),
                team: u.team(),
                hit_points: u.hit_points(),
                max_hit_points: u.max_hit_points(),
                state: u.state(),
            })
            .collect();
        survivors.sort_by_key(|s| s.unit);

        BattleReport {
            duration: self.field.now(),
            ticks: self.ticks,
            winner,
            events: self.tally,
            survivors,
        }
    }

    /// The battlefield.
    #[must_use]
    pub fn field(&self) -> &Battlefield<Mover, HudPresentation> {
        &self.field
    }

    /// Shared HUD state.
    #[must_use]
    pub fn hud(&self) -> Arc<Mutex<HudState>> {
        Arc::clone(&self.hud)
    }

    /// Events seen so far.
    #[must_use]
    pub fn tally(&self) -> EventTally {
        self.tally
    }
}
