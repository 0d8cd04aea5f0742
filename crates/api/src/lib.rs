//! Tagwatch API
//!
//! HTTP facade over the tag state store: registration, read views and a
//! JSON twin of the beacon wire protocol.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tagwatch_api::{AppState, serve};
//! use tagwatch_protocol::BeaconParser;
//! use tagwatch_store::TagStore;
//!
//! let state = AppState::new(Arc::new(TagStore::new_memory().await?), Arc::new(BeaconParser::strict()));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! serve(listener, state, cancel).await?;
//! ```
//!
//! # Endpoints
//!
//! - `GET /` - service banner
//! - `GET /health` - liveness and store status
//! - `GET /stats` - store, parser and listener counters
//! - `POST /tags` - register a tag (`409` if already registered)
//! - `GET /tags` - every registered tag with its state
//! - `GET /tag/{id}` - one registered tag
//! - `GET /tag/{id}/history?limit=N` - received beacons, newest first
//! - `POST /data` - submit one beacon line

pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;

// Re-exports
pub use error::{ApiError, Result};
pub use routes::build_router;
pub use server::serve;
pub use state::AppState;
