//! Tagwatch Tag State Store
//!
//! Turso-backed persistence for tag registrations, last-known tag state and
//! the append-only beacon history.
//!
//! # Tables
//!
//! | Table | Contains | Written by |
//! |-------|----------|------------|
//! | `registered_tags` | id, description, registration instant | `register` |
//! | `tag_states` | last counter and timestamp per observed tag | `ingest` |
//! | `tag_history` | every accepted beacon of a registered tag | `ingest` |
//!
//! # Usage
//!
//! ```ignore
//! use tagwatch_store::TagStore;
//!
//! // File-based (production)
//! let store = TagStore::open("data/tags.db").await?;
//!
//! // In-memory (testing)
//! let store = TagStore::new_memory().await?;
//!
//! store.register("fa451f0755d8", "dock door").await?;
//! let changed = store.ingest("fa451f0755d8", 197, "20251003140059.456").await?;
//! ```

mod db;
pub mod error;
mod history;
mod ingest;
pub mod models;
mod registry;

pub use db::TagStore;
pub use error::{Result, StoreError};
pub use ingest::IngestOutcome;
pub use models::{HistoryRecord, RegisteredTag, StoreStats, TagState, TagStatus, TagView};
