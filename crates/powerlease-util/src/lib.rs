//! Shared utilities for powerlease
//!
//! This crate provides:
//! - ID types (LeaseId, MacAddress)
//! - Time utilities (wall clock with mock support, injectable clocks)
//! - Default paths for config and data directories
//! - The wake-on-demand poll signal shared by the server loop

mod ids;
mod paths;
mod poll;
mod time;

pub use ids::*;
pub use paths::*;
pub use poll::*;
pub use time::*;
