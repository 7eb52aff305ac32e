//! # Skirmish Combat
//!
//! Combat behaviour of individual units, independent of any engine.
//!
//! This crate provides:
//! - Team identity derived from spawn tags
//! - Unit configuration
//! - The combat unit: health, ranged fire, melee wind-up, death, respawn
//! - Collaborator traits for locomotion, presentation and the clock
//! - A timer queue for deferred callbacks
//! - The battlefield that owns units and routes callbacks
//! - Event bus for combat notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod battlefield;
pub mod config;
pub mod events;
pub mod services;
pub mod team;
pub mod timers;
pub mod unit;

#[cfg(test)]
mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::battlefield::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::services::*;
    pub use crate::team::*;
    pub use crate::timers::*;
    pub use crate::unit::*;
}

pub use prelude::*;
