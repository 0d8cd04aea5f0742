//! Tagwatch - Sources
//!
//! Network sources that feed beacons to the parser and tag store.
//!
//! # Available Sources
//!
//! - **Beacon TCP** - newline-delimited beacons, one `ACK`/`NACK` reply per line
//!
//! # Design Principles
//!
//! - **Stateless adapter**: the source owns no tag state; parser and store are
//!   constructed by the caller and shared
//! - **Task per connection**: connections run on a `JoinSet` owned by the
//!   accept loop and observe the same cancellation token
//! - **Bounded reads**: line length is capped so a peer cannot grow buffers
//!   without limit
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tagwatch_protocol::BeaconParser;
//! use tagwatch_sources::{BeaconTcpSource, ListenerConfig};
//! use tagwatch_store::TagStore;
//! use tokio_util::sync::CancellationToken;
//!
//! let store = Arc::new(TagStore::open("data/tags.db").await?);
//! let parser = Arc::new(BeaconParser::strict());
//!
//! let source = BeaconTcpSource::new(ListenerConfig::default(), parser, store);
//! source.run(CancellationToken::new()).await?;
//! ```

pub mod tcp;

// Common types for sources
mod common;

pub use common::{MetricsSnapshot, SourceMetrics};
pub use tcp::{
    BeaconTcpSource, ListenerConfig, ListenerError, ListenerMetrics, ListenerMetricsSnapshot,
};
