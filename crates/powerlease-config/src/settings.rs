//! Validated settings structures

use crate::schema::{RawConfig, RawDaemonConfig, RawLeaseConfig, RawMachineConfig};
use crate::validation::parse_socket_addr;
use powerlease_util::{default_data_dir, MacAddress};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP listen address
pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000);

/// Default Wake-on-LAN target: limited broadcast, discard port
pub const DEFAULT_BROADCAST: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::BROADCAST), 9);

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone)]
pub struct Settings {
    pub daemon: DaemonConfig,
    pub machine: MachineConfig,
    pub leases: LeaseConfig,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            machine: MachineConfig::from_raw(raw.machine),
            leases: LeaseConfig::from_raw(raw.leases),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            listen: raw
                .listen
                .and_then(|s| parse_socket_addr(&s).ok())
                .unwrap_or(DEFAULT_LISTEN),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN,
            data_dir: default_data_dir(),
        }
    }
}

/// The managed machine
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub host: String,
    pub mac: MacAddress,
    pub probe_port: u16,
    pub probe_timeout: Duration,
    pub broadcast: SocketAddr,
    pub shutdown_command: Vec<String>,
    pub shutdown_timeout: Duration,
}

impl MachineConfig {
    fn from_raw(raw: RawMachineConfig) -> Self {
        let shutdown_command = raw
            .shutdown_command
            .unwrap_or_else(|| default_shutdown_command(&raw.host));

        Self {
            mac: raw.mac.parse().unwrap_or(MacAddress::new([0; 6])),
            probe_port: raw.probe_port.unwrap_or(22),
            probe_timeout: Duration::from_millis(raw.probe_timeout_ms.unwrap_or(100)),
            broadcast: raw
                .broadcast
                .and_then(|s| parse_socket_addr(&s).ok())
                .unwrap_or(DEFAULT_BROADCAST),
            shutdown_command,
            shutdown_timeout: Duration::from_secs(raw.shutdown_timeout_seconds.unwrap_or(30)),
            host: raw.host,
        }
    }
}

/// `ssh shutdown-me@<host>`: a dedicated account whose login shell powers the box off
pub fn default_shutdown_command(host: &str) -> Vec<String> {
    vec!["ssh".to_string(), format!("shutdown-me@{}", host)]
}

/// Lease and reconciliation timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseConfig {
    pub default_ttl: Duration,
    pub grace_period: Duration,
    pub poll_interval: Duration,
    pub idle_interval: Duration,
}

impl LeaseConfig {
    fn from_raw(raw: RawLeaseConfig) -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: raw
                .default_ttl_seconds
                .map_or(defaults.default_ttl, Duration::from_secs),
            grace_period: raw
                .grace_period_seconds
                .map_or(defaults.grace_period, Duration::from_secs),
            poll_interval: raw
                .poll_interval_seconds
                .map_or(defaults.poll_interval, Duration::from_secs),
            idle_interval: raw
                .idle_interval_seconds
                .map_or(defaults.idle_interval, Duration::from_secs),
        }
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            grace_period: Duration::from_secs(60),
            poll_interval: Duration::from_secs(20),
            idle_interval: Duration::from_secs(600),
        }
    }
}
