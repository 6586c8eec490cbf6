//! powerleased library surface
//!
//! The binary wires configuration, store, power adapter and service together;
//! the HTTP router lives here so it can be driven from integration tests.

pub mod http;
