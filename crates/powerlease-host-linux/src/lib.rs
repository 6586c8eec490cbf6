//! Linux power adapter for powerleased
//!
//! Provides:
//! - Wake-on-LAN magic packets over UDP broadcast
//! - TCP connect reachability probes
//! - Remote shutdown by running a configured command (ssh by default)

mod adapter;
mod probe;
mod remote;
mod wol;

pub use adapter::*;
pub use probe::*;
pub use remote::*;
pub use wol::*;
