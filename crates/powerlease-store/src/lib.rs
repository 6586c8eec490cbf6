//! Persistence layer for powerlease
//!
//! Provides the lease table: a durable mapping from lease id to an optional
//! expiry time, with atomic renew, delete, sweep and liveness queries.

mod lease;
mod sqlite;
mod traits;

pub use lease::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row for lease '{id}': {message}")]
    CorruptRow { id: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
