//! HTTP facade, store and shutdown configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// HTTP facade configuration
///
/// ```toml
/// [api]
/// enabled = true
/// host = "0.0.0.0"
/// port = 8000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Default: true
    pub enabled: bool,

    /// Default: "0.0.0.0"
    pub host: String,

    /// Default: 8000
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Store configuration
///
/// ```toml
/// [store]
/// path = "data/tags.db"   # ":memory:" for a throwaway store
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/tags.db"),
        }
    }
}

impl StoreConfig {
    /// Whether the store should live in memory only
    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

/// Shutdown configuration
///
/// ```toml
/// [shutdown]
/// grace_period = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time tasks get to finish after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
        }
    }
}
