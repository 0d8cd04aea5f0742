//! Tagwatch Client Library
//!
//! Client side of the beacon wire protocol:
//!
//! - [`BeaconClient`] - sends `TAG,...` lines and reads `ACK`/`NACK` replies
//! - [`TagSimulator`] - generates realistic beacon traffic for a set of tags
//!
//! Used by the `tagwatch simulate` and `tagwatch send` commands, and by tests
//! that drive a running listener.
//!
//! # Example
//!
//! ```ignore
//! use tagwatch_client::{Output, SimulatorOptions, TagSimulator};
//! use tokio_util::sync::CancellationToken;
//!
//! let sim = TagSimulator::new(SimulatorOptions {
//!     output: Output::Socket("127.0.0.1:8888".into()),
//!     count: Some(10),
//!     ..Default::default()
//! })?;
//! let status = sim.run(CancellationToken::new()).await?;
//! println!("sent {} beacons", status.sent);
//! ```

pub mod error;
pub mod simulator;
pub mod wire;

pub use error::{ClientError, Result};
pub use simulator::{
    MIN_TAGS, Output, SimulatorOptions, SimulatorStatus, TagSimulator, timestamp_now,
};
pub use wire::{BeaconClient, LineEnding};

#[cfg(test)]
#[path = "simulator_test.rs"]
mod simulator_test;
