//! Core power management for powerleased
//!
//! This crate is the heart of powerleased, containing:
//! - The reconciliation loop (lease presence -> wake / grace period / shutdown)
//! - The power service that owns the loop and exposes lease operations

mod reconciler;
mod service;

pub use reconciler::*;
pub use service::*;

use powerlease_store::StoreError;
use thiserror::Error;

/// Service-level errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Power service is already running")]
    AlreadyRunning,

    #[error("Power service has been stopped")]
    Stopped,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
