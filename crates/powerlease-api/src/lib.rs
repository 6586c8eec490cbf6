//! Wire types for the powerlease lease API
//!
//! This crate defines the stable HTTP contract between powerleased and its
//! clients: route paths, query parameters and JSON bodies.

mod routes;
mod types;

pub use routes::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
