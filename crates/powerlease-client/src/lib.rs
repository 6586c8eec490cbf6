//! Client side of powerlease
//!
//! Provides:
//! - The Lease API seam and its blocking HTTP implementation
//! - `LeaseHandle`: a reference-counted handle that blocks callers until the
//!   managed machine is reachable, renewing its lease in the background

mod api;
mod handle;

pub use api::*;
pub use handle::*;

use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request timed out")]
    Timeout,

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Lease handle has been stopped")]
    Stopped,
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
