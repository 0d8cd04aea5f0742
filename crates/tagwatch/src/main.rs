//! Tagwatch - tag telemetry ingestion server
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! tagwatch
//! tagwatch --config configs/config.toml
//!
//! # Generate beacon traffic
//! tagwatch simulate --output socket --count 100
//!
//! # Send lines by hand
//! tagwatch send "TAG,fa451f0755d8,197,20251003140059.456"
//! ```

mod cmd;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tagwatch_config::{Config, LogLevel};

/// Tagwatch - tag telemetry ingestion server
#[derive(Parser, Debug)]
#[command(name = "tagwatch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the listener, API and optional simulator
    Serve,

    /// Generate simulated beacon traffic
    Simulate(cmd::simulate::SimulateArgs),

    /// Send beacon lines and print each reply
    Send(cmd::send::SendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) =
        Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let level = config.log.effective_level(cli.log_level);

    match cli.command {
        // No subcommand = run server (default behavior)
        None | Some(Command::Serve) => {
            logging::init_logging(level, &config.log, false)?;
            cmd::serve::run(config, source).await
        }
        Some(Command::Simulate(args)) => {
            // Keep beacons on stdout clean of log lines
            let beacons_on_stdout = args.writes_stdout(&config.simulator);
            logging::init_logging(level, &config.log, beacons_on_stdout)?;
            cmd::simulate::run(args, &config).await
        }
        Some(Command::Send(args)) => {
            // Send prints replies to stdout; logs only on request
            if cli.log_level.is_some() {
                logging::init_logging(level, &config.log, true)?;
            }
            cmd::send::run(args, &config).await
        }
    }
}
