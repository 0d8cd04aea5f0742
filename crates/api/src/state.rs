//! Application state
//!
//! Shared state for API handlers: the tag store, the beacon parser and, when
//! running inside `tagwatch serve`, the listener's metrics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tagwatch_protocol::BeaconParser;
use tagwatch_sources::ListenerMetrics;
use tagwatch_store::TagStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Tag state store
    pub store: Arc<TagStore>,
    /// Parser used by `POST /data`, shared with the listener
    pub parser: Arc<BeaconParser>,
    /// Listener metrics (populated when the listener runs in-process)
    pub listener: Option<Arc<ListenerMetrics>>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<TagStore>, parser: Arc<BeaconParser>) -> Self {
        Self {
            store,
            parser,
            listener: None,
            started_at: Instant::now(),
        }
    }

    /// Attach listener metrics
    pub fn with_listener_metrics(mut self, metrics: Arc<ListenerMetrics>) -> Self {
        self.listener = Some(metrics);
        self
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
