//! Simulate command - generate beacon traffic
//!
//! Flags override the `[simulator]` config section.
//!
//! # Usage
//!
//! ```bash
//! # Defaults from config: 3 tags, 1-5s apart, to 127.0.0.1:8888
//! tagwatch simulate
//!
//! # Fast burst to a file
//! tagwatch simulate --output file --output-file out.log --min-interval 10ms --max-interval 50ms --count 100
//!
//! # Exercise the NACK path
//! tagwatch simulate --malformed-ratio 0.2
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tagwatch_client::{Output, SimulatorOptions, TagSimulator};
use tagwatch_config::{Config, SimulatorConfig, SimulatorOutput};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Output destination flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    Socket,
    File,
    Stdout,
}

#[derive(Args, Debug, Default)]
pub struct SimulateArgs {
    /// Listener address for socket output
    #[arg(short, long)]
    server: Option<String>,

    /// Tag ids to simulate (at least 3), comma separated
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    tags: Option<Vec<String>>,

    /// Shortest pause between beacons (e.g. "500ms", "1s")
    #[arg(long, value_parser = parse_duration)]
    min_interval: Option<Duration>,

    /// Longest pause between beacons
    #[arg(long, value_parser = parse_duration)]
    max_interval: Option<Duration>,

    /// Share of deliberately malformed lines (0.0 to 1.0)
    #[arg(long)]
    malformed_ratio: Option<f64>,

    /// Where beacons go
    #[arg(short, long, value_enum)]
    output: Option<OutputKind>,

    /// File for `--output file`
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Stop after this many beacons (default: run until Ctrl+C)
    #[arg(short = 'n', long)]
    count: Option<u64>,
}

impl SimulateArgs {
    fn output_kind(&self, section: &SimulatorConfig) -> OutputKind {
        self.output.unwrap_or(match section.output {
            SimulatorOutput::Socket => OutputKind::Socket,
            SimulatorOutput::File => OutputKind::File,
            SimulatorOutput::Stdout => OutputKind::Stdout,
        })
    }

    /// Whether generated beacons will be printed to stdout
    pub fn writes_stdout(&self, section: &SimulatorConfig) -> bool {
        self.output_kind(section) == OutputKind::Stdout
    }
}

fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Build simulator options from config, with optional flag overrides
pub fn simulator_options(section: &SimulatorConfig, args: Option<&SimulateArgs>) -> SimulatorOptions {
    let defaults = SimulateArgs::default();
    let args = args.unwrap_or(&defaults);

    let output = match args.output_kind(section) {
        OutputKind::Socket => Output::Socket(args.server.clone().unwrap_or_else(|| section.server.clone())),
        OutputKind::File => Output::File(
            args.output_file
                .clone()
                .unwrap_or_else(|| section.output_file.clone()),
        ),
        OutputKind::Stdout => Output::Stdout,
    };

    SimulatorOptions {
        tags: args.tags.clone().unwrap_or_else(|| section.tags.clone()),
        min_interval: args.min_interval.unwrap_or(section.min_interval),
        max_interval: args.max_interval.unwrap_or(section.max_interval),
        malformed_ratio: args.malformed_ratio.unwrap_or(section.malformed_ratio),
        output,
        count: args.count,
    }
}

/// Validated simulator from config, with optional flag overrides
pub fn simulator_from_config(
    section: &SimulatorConfig,
    args: Option<&SimulateArgs>,
) -> Result<TagSimulator> {
    Ok(TagSimulator::new(simulator_options(section, args))?)
}

pub async fn run(args: SimulateArgs, config: &Config) -> Result<()> {
    let simulator = Arc::new(
        simulator_from_config(&config.simulator, Some(&args))
            .context("invalid simulator options")?,
    );
    let cancel = CancellationToken::new();

    let mut task = tokio::spawn({
        let simulator = Arc::clone(&simulator);
        let cancel = cancel.clone();
        async move { simulator.run(cancel).await }
    });

    let outcome = tokio::select! {
        res = &mut task => res,
        _ = signal::ctrl_c() => {
            info!("interrupt received, stopping simulator");
            cancel.cancel();
            task.await
        }
    };

    let status = outcome
        .context("simulator task panicked")?
        .context("simulator failed")?;

    info!(
        sent = status.sent,
        malformed = status.malformed,
        acks = status.acks,
        nacks = status.nacks,
        counters = ?status.counters,
        "simulation finished"
    );
    Ok(())
}
