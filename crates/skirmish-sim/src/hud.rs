//! Log-only presentation.
//!
//! Keeps a registry of health bars and attack cues behind a shared lock so
//! the reporting side can read them while the battlefield owns the
//! presentation itself.

use ahash::{AHashMap, AHashSet};
use glam::{Quat, Vec3};
use parking_lot::Mutex;
use serde::Serialize;
use skirmish_combat::{Presentation, Team};
use skirmish_common::{IndicatorHandle, UnitId};
use std::sync::Arc;
use tracing::{debug, trace};

/// A unit's health bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthBar {
    /// Owning unit
    pub unit: UnitId,
    /// Displayed hit points
    pub value: u32,
    /// Full-bar hit points
    pub max: u32,
}

impl HealthBar {
    /// Fill ratio in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.value as f32 / self.max as f32
        }
    }
}

/// Everything currently on screen.
#[derive(Debug, Default)]
pub struct HudState {
    bars: AHashMap<IndicatorHandle, HealthBar>,
    attacking: AHashSet<UnitId>,
    projectiles_spawned: u32,
    next_handle: u64,
}

impl HudState {
    /// Health bar of a unit, if it has one.
    #[must_use]
    pub fn bar_of(&self, unit: UnitId) -> Option<HealthBar> {
        self.bars.values().find(|b| b.unit == unit).copied()
    }

    /// Number of live health bars.
    #[must_use]
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Check if the unit's attack cue is on.
    #[must_use]
    pub fn is_attacking(&self, unit: UnitId) -> bool {
        self.attacking.contains(&unit)
    }

    /// Projectile effects spawned so far.
    #[must_use]
    pub fn projectiles_spawned(&self) -> u32 {
        self.projectiles_spawned
    }
}

/// Presentation that logs and records into a shared [`HudState`].
#[derive(Debug, Clone, Default)]
pub struct HudPresentation {
    state: Arc<Mutex<HudState>>,
}

impl HudPresentation {
    /// Create an empty HUD.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the HUD state.
    #[must_use]
    pub fn state(&self) -> Arc<Mutex<HudState>> {
        Arc::clone(&self.state)
    }
}

impl Presentation for HudPresentation {
    fn set_health_value(&mut self, unit: UnitId, value: u32) {
        let mut state = self.state.lock();
        if let Some(bar) = state.bars.values_mut().find(|b| b.unit == unit) {
            bar.value = value.min(bar.max);
            trace!("{unit} health {}/{}", bar.value, bar.max);
        }
    }

    fn set_attacking_cue(&mut self, unit: UnitId, attacking: bool) {
        let mut state = self.state.lock();
        if attacking {
            state.attacking.insert(unit);
        } else {
            state.attacking.remove(&unit);
        }
    }

    fn spawn_projectile_effect(&mut self, origin: Vec3, rotation: Quat, enemy_team: Team) {
        let mut state = self.state.lock();
        state.projectiles_spawned += 1;
        debug!(
            "Projectile toward {} from {origin} heading {}",
            enemy_team,
            rotation * Vec3::Z
        );
    }

    fn create_health_indicator(&mut self, unit: UnitId, max_value: u32) -> IndicatorHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = IndicatorHandle::new(state.next_handle);
        state.bars.insert(
            handle,
            HealthBar {
                unit,
                value: max_value,
                max: max_value,
            },
        );
        handle
    }

    fn destroy_health_indicator(&mut self, handle: IndicatorHandle) {
        self.state.lock().bars.remove(&handle);
    }
}
