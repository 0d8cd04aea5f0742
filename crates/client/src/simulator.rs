//! Tag simulator
//!
//! Generates beacon lines for a fixed set of tags with per-tag counters,
//! the way field devices emit them, and writes them to a listener, a file or
//! stdout.
//!
//! Each tick picks a random tag, increments its counter and emits
//! `TAG,<id>,<cnt>,<YYYYMMDDHHMMSS.mmm>` stamped with local time, then sleeps
//! for a random interval. A configurable share of ticks emit a deliberately
//! malformed line instead; those do not advance any counter.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tagwatch_protocol::{Ack, TIMESTAMP_FORMAT, format_line};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::wire::BeaconClient;

/// Fewest distinct tags a simulator cycles through
pub const MIN_TAGS: usize = 3;

/// Where generated lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Beacon listener at `host:port`; each line waits for its reply
    Socket(String),
    /// Append to a file
    File(PathBuf),
    /// Print to stdout
    Stdout,
}

impl Output {
    /// Short name of the output kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Socket(_) => "socket",
            Self::File(_) => "file",
            Self::Stdout => "stdout",
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Socket(addr) => format!("socket {addr}"),
            Self::File(path) => format!("file {}", path.display()),
            Self::Stdout => "stdout".into(),
        }
    }
}

/// Simulator settings
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// Tag ids, at least [`MIN_TAGS`]
    pub tags: Vec<String>,
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Share of ticks that emit a malformed line, 0.0..=1.0
    pub malformed_ratio: f64,
    pub output: Output,
    /// Stop after this many lines; run until cancelled when `None`
    pub count: Option<u64>,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            tags: vec![
                "fa451f0755d8".into(),
                "ab123c4567ef".into(),
                "cd789e0123fa".into(),
            ],
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            malformed_ratio: 0.0,
            output: Output::Stdout,
            count: None,
        }
    }
}

/// Point-in-time simulator status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorStatus {
    pub running: bool,
    /// Output kind (`socket`, `file`, `stdout`)
    pub output: &'static str,
    /// Socket address or file path, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Last counter emitted per tag
    pub counters: BTreeMap<String, u64>,
    /// Lines written, malformed included
    pub sent: u64,
    pub malformed: u64,
    /// Replies received (socket output only)
    pub acks: u64,
    pub nacks: u64,
}

/// Beacon generator
pub struct TagSimulator {
    options: SimulatorOptions,
    counters: Vec<AtomicU64>,
    running: AtomicBool,
    sent: AtomicU64,
    malformed: AtomicU64,
    acks: AtomicU64,
    nacks: AtomicU64,
}

impl TagSimulator {
    /// Validate options and build a simulator
    ///
    /// # Errors
    ///
    /// Fewer than [`MIN_TAGS`] tags, an empty tag id, `min_interval` above
    /// `max_interval`, or a malformed ratio outside 0.0..=1.0.
    pub fn new(options: SimulatorOptions) -> Result<Self> {
        if options.tags.len() < MIN_TAGS {
            return Err(ClientError::TooFewTags {
                min: MIN_TAGS,
                got: options.tags.len(),
            });
        }
        if options.tags.iter().any(|t| t.is_empty()) {
            return Err(ClientError::invalid_option("tags", "tag ids must not be empty"));
        }
        if options.min_interval > options.max_interval {
            return Err(ClientError::invalid_option(
                "min_interval",
                "must not exceed max_interval",
            ));
        }
        if !(0.0..=1.0).contains(&options.malformed_ratio) {
            return Err(ClientError::invalid_option(
                "malformed_ratio",
                "must be within 0.0..=1.0",
            ));
        }

        let counters = options.tags.iter().map(|_| AtomicU64::new(0)).collect();
        Ok(Self {
            options,
            counters,
            running: AtomicBool::new(false),
            sent: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            acks: AtomicU64::new(0),
            nacks: AtomicU64::new(0),
        })
    }

    pub fn options(&self) -> &SimulatorOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Produce the next line, advancing the chosen tag's counter
    ///
    /// Malformed lines leave every counter untouched.
    pub fn next_line<R: Rng>(&self, rng: &mut R) -> String {
        let index = rng.random_range(0..self.options.tags.len());
        let tag_id = &self.options.tags[index];

        if self.options.malformed_ratio > 0.0 && rng.random_bool(self.options.malformed_ratio) {
            self.malformed.fetch_add(1, Ordering::Relaxed);
            return malformed_line(rng, tag_id);
        }

        let cnt = self.counters[index].fetch_add(1, Ordering::Relaxed) + 1;
        format_line(tag_id, cnt, &timestamp_now())
    }

    /// Random pause in `[min_interval, max_interval]`
    pub fn next_interval<R: Rng>(&self, rng: &mut R) -> Duration {
        let min = self.options.min_interval;
        let max = self.options.max_interval;
        if min == max {
            return min;
        }
        Duration::from_nanos(rng.random_range(min.as_nanos() as u64..=max.as_nanos() as u64))
    }

    /// Generate lines until `cancel` fires or `count` lines were written
    ///
    /// # Errors
    ///
    /// Opening the output or writing a line failed. Counters and status keep
    /// what was sent before the failure.
    pub async fn run(&self, cancel: CancellationToken) -> Result<SimulatorStatus> {
        let mut sink = Sink::open(&self.options.output).await?;
        let mut rng = StdRng::from_os_rng();

        self.running.store(true, Ordering::Relaxed);
        info!(
            output = %self.options.output.describe(),
            tags = self.options.tags.len(),
            "tag simulator started"
        );

        let outcome = self.generate(&mut sink, &mut rng, &cancel).await;

        self.running.store(false, Ordering::Relaxed);
        if let Err(e) = sink.close().await {
            debug!(error = %e, "error closing simulator output");
        }

        let status = self.status();
        match &outcome {
            Ok(()) => info!(sent = status.sent, "tag simulator stopped"),
            Err(e) => warn!(error = %e, sent = status.sent, "tag simulator failed"),
        }
        outcome.map(|()| status)
    }

    async fn generate(
        &self,
        sink: &mut Sink,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let line = self.next_line(rng);
            let reply = sink.emit(&line).await?;
            let sent = self.sent.fetch_add(1, Ordering::Relaxed) + 1;

            match reply {
                Some(Ack::Ack) => {
                    self.acks.fetch_add(1, Ordering::Relaxed);
                }
                Some(Ack::Nack) => {
                    self.nacks.fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
            debug!(line = %line, reply = ?reply, "beacon sent");

            if self.options.count.is_some_and(|limit| sent >= limit) {
                return Ok(());
            }

            let pause = self.next_interval(rng);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Snapshot of running state and counters
    pub fn status(&self) -> SimulatorStatus {
        let counters = self
            .options
            .tags
            .iter()
            .zip(&self.counters)
            .map(|(tag, cnt)| (tag.clone(), cnt.load(Ordering::Relaxed)))
            .collect();

        let target = match &self.options.output {
            Output::Socket(addr) => Some(addr.clone()),
            Output::File(path) => Some(path.display().to_string()),
            Output::Stdout => None,
        };

        SimulatorStatus {
            running: self.is_running(),
            output: self.options.output.kind(),
            target,
            counters,
            sent: self.sent.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            acks: self.acks.load(Ordering::Relaxed),
            nacks: self.nacks.load(Ordering::Relaxed),
        }
    }
}

/// Current local time as `YYYYMMDDHHMMSS.mmm`
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One of several broken shapes, each rejected by a strict parser
fn malformed_line<R: Rng>(rng: &mut R, tag_id: &str) -> String {
    let ts = timestamp_now();

    match rng.random_range(0..5u8) {
        // three fields
        0 => format!("TAG,{tag_id},{ts}"),
        1 => format!("TAG,{tag_id},-{},{ts}", rng.random_range(1..1000u32)),
        // date only
        2 => format!("TAG,{tag_id},1,{}", &ts[..8]),
        3 => format!("TGA,{tag_id},1,{ts}"),
        _ => "!!corrupted beacon frame!!".to_string(),
    }
}

enum Sink {
    Socket(BeaconClient),
    File(File),
    Stdout(Stdout),
}

impl Sink {
    async fn open(output: &Output) -> Result<Self> {
        match output {
            Output::Socket(addr) => Ok(Self::Socket(BeaconClient::connect(addr).await?)),
            Output::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                Ok(Self::File(file))
            }
            Output::Stdout => Ok(Self::Stdout(tokio::io::stdout())),
        }
    }

    /// Write one line; socket output returns the listener's reply
    async fn emit(&mut self, line: &str) -> Result<Option<Ack>> {
        match self {
            Self::Socket(client) => Ok(Some(client.send(line).await?)),
            Self::File(file) => {
                file.write_all(format!("{line}\n").as_bytes()).await?;
                file.flush().await?;
                Ok(None)
            }
            Self::Stdout(out) => {
                out.write_all(format!("{line}\n").as_bytes()).await?;
                out.flush().await?;
                Ok(None)
            }
        }
    }

    async fn close(self) -> Result<()> {
        match self {
            Self::Socket(client) => client.close().await,
            Self::File(mut file) => Ok(file.flush().await?),
            Self::Stdout(mut out) => Ok(out.flush().await?),
        }
    }
}
