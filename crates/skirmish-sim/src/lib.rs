//! # Skirmish Sim
//!
//! Headless battle between two teams of combat units.
//!
//! This crate provides:
//! - Straight-line locomotion for unit bodies
//! - A log-only HUD standing in for health bars and attack cues
//! - Projectile flight and hit detection
//! - A commander that hands out orders to idle units
//! - The battle loop and its JSON report

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ballistics;
pub mod commander;
pub mod config;
pub mod hud;
pub mod locomotion;
pub mod simulation;
pub mod timing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ballistics::*;
    pub use crate::commander::*;
    pub use crate::config::*;
    pub use crate::hud::*;
    pub use crate::locomotion::*;
    pub use crate::simulation::*;
    pub use crate::timing::*;
}

pub use prelude::*;
