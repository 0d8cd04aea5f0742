//! Store models
//!
//! Rows of the three store tables plus the joined read views.

mod state;
mod tag;

pub use state::{HistoryRecord, StoreStats, TagState};
pub use tag::{RegisteredTag, TagStatus, TagView};
