//! Quaver - headless playback driver
mod config;
mod simulator;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::QuaverConfig;
use quaver_playback::PlaybackMode;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quaver")]
#[command(about = "Drive the Quaver playback engine without a UI", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./quaver.toml when present)
    #[arg(short, long, global = true, env = "QUAVER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, overriding the configured one
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a synthetic playlist through a simulated backend
    Simulate {
        /// Playback mode (loop, random, repeat)
        #[arg(short, long)]
        mode: Option<PlaybackMode>,

        /// Seed for random navigation
        #[arg(long)]
        seed: Option<u64>,

        /// Duration drift of the simulated decoder, in percent
        #[arg(long, allow_hyphen_values = true)]
        drift: Option<f64>,

        /// Stop after this many tracks have finished
        #[arg(short, long)]
        finish_after: Option<usize>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = QuaverConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Initialize tracing
    let directive = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Simulate {
            mode,
            seed,
            drift,
            finish_after,
        } => {
            if let Some(mode) = mode {
                config.playback.mode = mode;
            }
            if seed.is_some() {
                config.playback.seed = seed;
            }
            if let Some(drift) = drift {
                config.simulation.drift_percent = drift;
            }
            config.validate()?;

            let report = simulator::run(&config, finish_after)?;
            println!(
                "{} ticks, {} tracks started, {} finished, {} failed",
                report.ticks, report.tracks_started, report.tracks_finished, report.failures
            );
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
