//! Beacon simulator and seed tag configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Tag ids simulated when none are configured
pub const DEFAULT_SIMULATOR_TAGS: [&str; 3] = ["fa451f0755d8", "ab123c4567ef", "cd789e0123fa"];

/// Fewest tags a simulator may cycle through
pub const MIN_SIMULATOR_TAGS: usize = 3;

/// Where simulated beacons go
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimulatorOutput {
    /// Beacon listener over TCP (default)
    #[default]
    Socket,
    /// Append to `output_file`
    File,
    /// Print to stdout
    Stdout,
}

impl SimulatorOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::File => "file",
            Self::Stdout => "stdout",
        }
    }
}

/// Simulator configuration
///
/// ```toml
/// [simulator]
/// enabled = false
/// server = "127.0.0.1:8888"
/// tags = ["fa451f0755d8", "ab123c4567ef", "cd789e0123fa"]
/// min_interval = "1s"
/// max_interval = "5s"
/// malformed_ratio = 0.0
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Run the simulator inside `serve`
    /// Default: false
    pub enabled: bool,

    /// Listener address for socket output
    /// Default: "127.0.0.1:8888"
    pub server: String,

    /// Tag ids to cycle through (at least 3)
    pub tags: Vec<String>,

    /// Shortest pause between beacons
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,

    /// Longest pause between beacons
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,

    /// Share of deliberately malformed lines, 0.0..=1.0
    /// Default: 0.0
    pub malformed_ratio: f64,

    /// Default: socket
    pub output: SimulatorOutput,

    /// Target of file output
    /// Default: "tag_output.log"
    pub output_file: PathBuf,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "127.0.0.1:8888".into(),
            tags: DEFAULT_SIMULATOR_TAGS.iter().map(|s| s.to_string()).collect(),
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            malformed_ratio: 0.0,
            output: SimulatorOutput::Socket,
            output_file: PathBuf::from("tag_output.log"),
        }
    }
}

/// Tag registered at startup when absent
///
/// ```toml
/// [[tags]]
/// id = "fa451f0755d8"
/// description = "Helmet Tag for worker A"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TagSeed {
    pub id: String,
    #[serde(default)]
    pub description: String,
}
