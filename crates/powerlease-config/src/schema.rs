//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon-level settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// The managed machine
    pub machine: RawMachineConfig,

    /// Lease and reconciliation timing
    #[serde(default)]
    pub leases: RawLeaseConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// HTTP listen address (default: 0.0.0.0:8000)
    pub listen: Option<String>,

    /// Data directory for the lease database
    pub data_dir: Option<PathBuf>,
}

/// How to reach, wake and stop the managed machine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMachineConfig {
    /// Hostname or IP address
    pub host: String,

    /// Hardware address for Wake-on-LAN
    pub mac: String,

    /// TCP port probed for reachability (default: 22)
    pub probe_port: Option<u16>,

    /// Probe connect timeout in milliseconds (default: 100)
    pub probe_timeout_ms: Option<u64>,

    /// Where the magic packet is sent (default: 255.255.255.255:9)
    pub broadcast: Option<String>,

    /// argv of the remote shutdown command (default: ssh shutdown-me@<host>)
    pub shutdown_command: Option<Vec<String>>,

    /// Shutdown command timeout in seconds (default: 30)
    pub shutdown_timeout_seconds: Option<u64>,
}

/// Lease and reconciliation timing, all in seconds
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLeaseConfig {
    /// TTL given to anonymous renewals that don't name one (default: 300)
    pub default_ttl_seconds: Option<u64>,

    /// Delay between "no leases" and shutdown (default: 60)
    pub grace_period_seconds: Option<u64>,

    /// Loop cadence while leases exist or the machine is on (default: 20)
    pub poll_interval_seconds: Option<u64>,

    /// Loop cadence while idle and off (default: 600)
    pub idle_interval_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_machine() {
        let toml_str = r#"
            config_version = 1

            [machine]
            host = "nas.lan"
            mac = "aa:bb:cc:dd:ee:ff"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.machine.host, "nas.lan");
        assert!(config.daemon.listen.is_none());
        assert!(config.leases.default_ttl_seconds.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [daemon]
            listen = "127.0.0.1:9000"
            data_dir = "/var/lib/powerleased"

            [machine]
            host = "192.168.1.20"
            mac = "aa-bb-cc-dd-ee-ff"
            probe_port = 2222
            probe_timeout_ms = 250
            broadcast = "192.168.1.255:9"
            shutdown_command = ["ssh", "-p", "2222", "shutdown-me@192.168.1.20"]
            shutdown_timeout_seconds = 10

            [leases]
            default_ttl_seconds = 120
            grace_period_seconds = 30
            poll_interval_seconds = 5
            idle_interval_seconds = 300
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.machine.probe_port, Some(2222));
        assert_eq!(config.machine.shutdown_command.as_ref().unwrap().len(), 4);
        assert_eq!(config.leases.grace_period_seconds, Some(30));
    }
}
