//! Store error types

use thiserror::Error;

/// Tag store errors
///
/// A mutation that returns any of these was rolled back and not applied.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database engine error
    #[error("database error: {0}")]
    Database(#[from] turso::Error),

    /// Filesystem error while preparing the database location
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid input
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    /// Stored value could not be decoded
    #[error("corrupt {column} value: {value:?}")]
    Corrupt { column: &'static str, value: String },
}

impl StoreError {
    /// Create an invalid input error
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Create a corrupt column error
    pub fn corrupt(column: &'static str, value: impl Into<String>) -> Self {
        Self::Corrupt {
            column,
            value: value.into(),
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
