//! # Balance Control Unit
//!
//! Loads the configuration (file or named preset), initializes the selected
//! HAL driver, starts every execution context and waits for EXITING, which is
//! requested by a long button press or SIGINT.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use balance_common::config::ConfigLoader;
use balance_common::control_unit::config::{BalanceConfig, Preset};
use balance_control_unit::cycle::rt_setup;
use balance_control_unit::scheduler::{Scheduler, SchedulerOptions};
use balance_control_unit::state::lifecycle::LifecycleEvent;
use balance_control_unit::state::shared::SharedState;
use balance_hal::builtin_registry;
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Balance Control Unit: two-wheeled self-balancing robot controller
#[derive(Parser, Debug)]
#[command(name = "balance_control_unit")]
#[command(version)]
#[command(about = "Real-time balance controller for a two-wheeled robot")]
struct Args {
    /// Configuration TOML. Overrides --preset.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Named parameter preset (edumip, filter_bench).
    #[arg(long, default_value = "edumip")]
    preset: Preset,

    /// HAL driver name.
    #[arg(long, default_value = "simulation")]
    driver: String,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Do not print the console status row.
    #[arg(long)]
    no_status: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Balance Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Balance Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            BalanceConfig::load(path)?
        }
        None => {
            info!("Using preset '{}'", args.preset.name());
            args.preset.config()
        }
    };
    config.validate()?;
    info!(
        "Config OK: fast={}Hz, outer={}Hz, tip_angle={}rad",
        config.rates.fast_hz, config.rates.outer_hz, config.safety.tip_angle,
    );

    rt_setup()?;

    let registry = builtin_registry()?;
    let mut driver = registry.create_driver(&args.driver)?;
    info!("Driver '{}' v{}", driver.name(), driver.version());
    let handles = driver.init(&config)?;

    let shared = Arc::new(SharedState::new());
    let s = Arc::clone(&shared);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        s.apply_lifecycle_event(LifecycleEvent::Exit);
    })?;

    let options = SchedulerOptions {
        status: !args.no_status,
    };
    let running = Scheduler::start(&config, shared, handles, options)?;
    let stats = running.join();
    if stats.overruns > 0 {
        warn!(overruns = stats.overruns, "Fast loop overran its period");
    }

    driver.shutdown()?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
