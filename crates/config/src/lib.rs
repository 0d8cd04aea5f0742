//! Tagwatch Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a working config; only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tagwatch_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[listener]\nport = 9999").unwrap();
//! assert_eq!(config.listener.port, 9999);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [listener]
//! port = 8888
//!
//! [parser]
//! mode = "strict"
//!
//! [store]
//! path = "data/tags.db"
//!
//! [[tags]]
//! id = "fa451f0755d8"
//! description = "Helmet Tag for worker A"
//! ```
//!
//! See `configs/config.toml` for all available options.

mod api;
mod error;
mod listener;
mod logging;
mod simulator;
mod validation;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use api::{ApiConfig, ShutdownConfig, StoreConfig};
pub use error::{ConfigError, Result};
pub use listener::{ListenerSection, ParserConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput, LogTarget};
pub use simulator::{
    DEFAULT_SIMULATOR_TAGS, MIN_SIMULATOR_TAGS, SimulatorConfig, SimulatorOutput, TagSeed,
};

use serde::Deserialize;

/// Locations searched, in order, when no config path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/config.toml", "config.toml"];

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Beacon listener
    pub listener: ListenerSection,

    /// Beacon validation mode
    pub parser: ParserConfig,

    /// Tag state store location
    pub store: StoreConfig,

    /// HTTP facade
    pub api: ApiConfig,

    /// Graceful shutdown
    pub shutdown: ShutdownConfig,

    /// Built-in beacon simulator
    pub simulator: SimulatorConfig,

    /// Tags registered at startup
    pub tags: Vec<TagSeed>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Load from an explicit path, or the first default location that exists
    ///
    /// An explicit path that cannot be read is an error. With no explicit
    /// path and no file in the default locations, defaults are used.
    /// Returns the config and the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Self::load_from(explicit, &DEFAULT_CONFIG_PATHS)
    }

    fn load_from(explicit: Option<&Path>, candidates: &[&str]) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        match candidates.iter().map(PathBuf::from).find(|p| p.is_file()) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
