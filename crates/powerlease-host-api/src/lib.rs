//! Power controller trait interfaces for powerlease
//!
//! This crate defines the interface between the reconciliation loop and the
//! code that actually touches the network and runs commands. It contains no
//! platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
