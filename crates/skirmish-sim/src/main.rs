//! # Skirmish
//!
//! Runs a headless battle and optionally writes a JSON report.
//!
//! Usage: `skirmish [CONFIG]`. Without a path, `skirmish.toml` in the
//! working directory is used when present and the built-in scenario
//! otherwise.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use skirmish_sim::{SimConfig, Simulation};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("skirmish=info".parse()?))
        .init();

    info!("Skirmish starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match std::env::args().nth(1) {
        Some(path) => SimConfig::try_load_from(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => SimConfig::load(),
    };
    config.validate();

    let mut sim = Simulation::new(config.clone());
    let report = sim.run();

    if let Some(path) = &config.report_path {
        report
            .write_to(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    info!("Skirmish shutdown complete");
    Ok(())
}
