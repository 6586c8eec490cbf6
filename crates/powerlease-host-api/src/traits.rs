//! Power controller traits

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from power controller operations
#[derive(Debug, Error)]
pub enum PowerError {
    /// Socket-level failure; always retried on the next cycle
    #[error("Network error: {0}")]
    Network(String),

    /// The remote shutdown command failed to start, timed out or exited non-zero
    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PowerResult<T> = Result<T, PowerError>;

/// Power controller trait - implemented by platform-specific adapters
///
/// None of these operations may block for longer than their configured
/// timeouts; the reconciliation loop's cadence depends on it.
#[async_trait]
pub trait PowerController: Send + Sync {
    /// Broadcast a wake signal to the machine. No acknowledgement is expected.
    async fn wake(&self) -> PowerResult<()>;

    /// Bounded reachability check; `true` only if the machine answered in time
    async fn probe(&self, timeout: Duration) -> bool;

    /// Ask the machine to power off. `Ok` iff the command exited successfully.
    async fn shutdown(&self) -> PowerResult<()>;
}
