#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the wave farmer against a simulated arena.
//!
//! The binary loads farmer settings from an optional TOML file, drives the
//! farming state machine with a manual clock for a fixed number of ticks and
//! prints the observed state transitions together with the final status.

mod arena;
mod session;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wavefarm_core::Settings;

/// Command-line arguments accepted by the simulator.
#[derive(Debug, Parser)]
#[command(name = "wavefarm", about = "Simulates the autonomous wave farming loop")]
struct Cli {
    /// TOML file with farmer settings; defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of fixed simulation steps to run.
    #[arg(long, default_value_t = 6000)]
    ticks: u64,
    /// Seed shared by the arena and the farmer's jitter.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Simulated milliseconds per step.
    #[arg(long = "tick-ms", default_value_t = 100)]
    tick_ms: u64,
}

/// Entry point for the wave farm simulator.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match cli.config.as_deref() {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    let report = session::run(
        settings,
        cli.ticks,
        cli.seed,
        Duration::from_millis(cli.tick_ms.max(1)),
    );

    for transition in &report.transitions {
        println!(
            "[{}] {} -> {}",
            transition.at, transition.from, transition.to
        );
    }
    for failure in &report.failures {
        println!("failed: {failure}");
    }
    println!(
        "{} actions dispatched, {} destinations blacklisted",
        report.actions, report.blacklisted
    );
    println!("{}", report.status);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    Settings::from_toml_str(&contents)
        .with_context(|| format!("invalid settings in {}", path.display()))
}
