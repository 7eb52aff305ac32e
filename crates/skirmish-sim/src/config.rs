//! Simulation configuration.
//!
//! Provides the battle parameters and the unit roster. Configuration can be
//! loaded from and saved to a TOML file; anything missing falls back to the
//! built-in scenario.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_combat::UnitConfig;
use skirmish_common::ConfigError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "skirmish.toml";

/// How the commander uses a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Closes in and strikes.
    #[default]
    Melee,
    /// Fires from a distance.
    Ranged,
}

/// One unit of the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpawn {
    /// Team tag, e.g. `"blue_archer"`
    pub tag: String,
    /// Spawn position
    pub position: Vec3,
    /// Commander role
    #[serde(default)]
    pub role: Role,
    /// Combat parameters
    #[serde(default)]
    pub stats: UnitConfig,
}

impl UnitSpawn {
    /// Create a roster entry.
    #[must_use]
    pub fn new(tag: &str, position: Vec3, role: Role, stats: UnitConfig) -> Self {
        Self {
            tag: tag.to_owned(),
            position,
            role,
            stats,
        }
    }
}

/// Simulation configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Simulation ===
    /// Fixed steps per simulated second
    pub tick_rate: u32,
    /// Stop after this many simulated seconds
    pub max_duration: f32,
    /// Pace the simulation to wall-clock time
    pub realtime: bool,
    /// Seed for the commander's random choices
    pub seed: u64,

    // === Movement ===
    /// Unit walking speed (units per second)
    pub move_speed: f32,
    /// Unit turning speed (radians per second)
    pub turn_speed: f32,

    // === Ranged ===
    /// Distance at which ranged units open fire
    pub fire_range: f32,
    /// Random aim error (world units)
    pub aim_spread: f32,
    /// Projectile speed (units per second)
    pub projectile_speed: f32,
    /// Damage of one projectile hit
    pub projectile_damage: u32,
    /// Hit radius around a unit's position
    pub hit_radius: f32,

    // === Output ===
    /// Write a JSON battle report here when set
    pub report_path: Option<PathBuf>,

    // === Roster ===
    /// Units to spawn
    pub units: Vec<UnitSpawn>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Simulation
            tick_rate: 30,
            max_duration: 120.0,
            realtime: false,
            seed: 0x5EED,

            // Movement
            move_speed: 3.0,
            turn_speed: std::f32::consts::TAU,

            // Ranged
            fire_range: 12.0,
            aim_spread: 0.5,
            projectile_speed: 15.0,
            projectile_damage: 1,
            hit_radius: 0.75,

            // Output
            report_path: None,

            // Roster
            units: default_roster(),
        }
    }
}

/// Two units per side; the red skirmisher keeps coming back.
fn default_roster() -> Vec<UnitSpawn> {
    let knight = UnitConfig::default()
        .with_hit_points(10)
        .with_melee_damage(3)
        .with_attack_cooldown(1.0);
    let archer = UnitConfig::default()
        .with_hit_points(4)
        .with_melee_damage(1)
        .with_attack_cooldown(1.5);
    let brute = UnitConfig::default()
        .with_hit_points(14)
        .with_melee_damage(2)
        .with_attack_cooldown(1.2)
        .with_body_size(Vec3::new(1.5, 2.5, 1.5));
    let skirmisher = UnitConfig::default()
        .with_hit_points(3)
        .with_attack_cooldown(1.0)
        .with_respawn(8.0);

    vec![
        UnitSpawn::new("blue_knight", Vec3::new(-6.0, 0.0, 0.0), Role::Melee, knight),
        UnitSpawn::new("blue_archer", Vec3::new(-12.0, 0.0, 2.0), Role::Ranged, archer),
        UnitSpawn::new("red_brute", Vec3::new(6.0, 0.0, 0.0), Role::Melee, brute),
        UnitSpawn::new("red_skirmisher", Vec3::new(10.0, 0.0, -3.0), Role::Melee, skirmisher),
    ]
}

impl SimConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using built-in scenario");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration from a specific path, reporting any failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Simulation
        self.tick_rate = self.tick_rate.clamp(1, 240);
        if !self.max_duration.is_finite() {
            self.max_duration = 120.0;
        }
        self.max_duration = self.max_duration.clamp(1.0, 3600.0);

        // Movement
        self.move_speed = self.move_speed.clamp(0.1, 50.0);
        self.turn_speed = self.turn_speed.clamp(0.1, 100.0);

        // Ranged
        self.fire_range = self.fire_range.clamp(1.0, 100.0);
        self.aim_spread = self.aim_spread.clamp(0.0, 10.0);
        self.projectile_speed = self.projectile_speed.clamp(1.0, 200.0);
        self.hit_radius = self.hit_radius.clamp(0.1, 5.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 30);
        assert!(!config.realtime);
        assert_eq!(config.units.len(), 4);
        assert!(config.units.iter().all(|u| u.stats.validate().is_ok()));
        assert!(config.units.iter().any(|u| u.stats.respawns));
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();

        config.tick_rate = 0;
        config.max_duration = f32::INFINITY;
        config.move_speed = 0.0;
        config.hit_radius = 100.0;

        config.validate();

        assert_eq!(config.tick_rate, 1);
        assert_eq!(config.max_duration, 120.0);
        assert!((config.move_speed - 0.1).abs() < 0.001);
        assert_eq!(config.hit_radius, 5.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = SimConfig::default();
        config.tick_rate = 60;
        config.seed = 42;
        config.report_path = Some(PathBuf::from("report.json"));

        config.save_to(&config_path).expect("Failed to save config");
        let loaded = SimConfig::try_load_from(&config_path).expect("Failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = SimConfig::load_from(temp_dir.path().join("missing.toml"));
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "tick_rate = \"fast\"").expect("Failed to write file");

        assert!(SimConfig::try_load_from(&config_path).is_err());
        assert_eq!(SimConfig::load_from(&config_path), SimConfig::default());
    }

    #[test]
    fn test_partial_roster() {
        let config = SimConfig::from_toml(
            r#"
            max_duration = 30.0

            [[units]]
            tag = "blue_scout"
            position = [1.0, 0.0, 2.0]
            role = "ranged"

            [[units]]
            tag = "red"
            position = [-1.0, 0.0, 0.0]
            stats = { hit_points = 5, respawns = true }
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.max_duration, 30.0);
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.units.len(), 2);
        assert_eq!(config.units[0].role, Role::Ranged);
        assert_eq!(config.units[0].stats, UnitConfig::default());
        assert_eq!(config.units[1].stats.hit_points, 5);
        assert!(config.units[1].stats.respawns);
    }
}
