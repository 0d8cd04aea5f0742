//! Beacon listener and parser configuration

use std::time::Duration;

use serde::Deserialize;
use tagwatch_protocol::{DEFAULT_MAX_LINE_LENGTH, ParseMode};

/// Beacon listener configuration
///
/// # Example
///
/// ```toml
/// [listener]
/// enabled = true
/// address = "127.0.0.1"
/// port = 8888
/// max_line_length = 1024
/// idle_timeout = "0s"     # "0s" never closes idle connections
/// max_connections = 0     # 0 = unbounded
/// nodelay = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerSection {
    /// Run the beacon listener in `serve`
    /// Default: true
    pub enabled: bool,

    /// Bind address
    /// Default: "127.0.0.1"
    pub address: String,

    /// Listen port
    /// Default: 8888
    pub port: u16,

    /// Longest accepted line in bytes, terminator excluded
    /// Default: 1024
    pub max_line_length: usize,

    /// Close connections idle for this long (0s = never)
    /// Default: 0s
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Simultaneous connection cap (0 = unbounded)
    /// Default: 0
    pub max_connections: usize,

    /// Disable Nagle's algorithm on accepted sockets
    /// Default: true
    pub nodelay: bool,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".into(),
            port: 8888,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            idle_timeout: Duration::ZERO,
            max_connections: 0,
            nodelay: true,
        }
    }
}

impl ListenerSection {
    /// Address the listener binds
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Parser configuration
///
/// ```toml
/// [parser]
/// mode = "strict"   # strict|permissive
/// ```
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub mode: ParseMode,
}
