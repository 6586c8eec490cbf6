//! Linux power controller implementation

use async_trait::async_trait;
use powerlease_host_api::{PowerController, PowerError, PowerResult};
use powerlease_util::MacAddress;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::probe::tcp_reachable;
use crate::remote::RemoteCommand;
use crate::wol::send_magic_packet;

/// How to reach the managed machine
#[derive(Debug, Clone)]
pub struct LinuxPowerConfig {
    pub host: String,
    pub mac: MacAddress,
    pub probe_port: u16,
    pub broadcast: SocketAddr,
    pub shutdown_command: Vec<String>,
    pub shutdown_timeout: Duration,
}

/// Wake-on-LAN, TCP probe and remote-command shutdown
pub struct LinuxPower {
    host: String,
    mac: MacAddress,
    probe_port: u16,
    broadcast: SocketAddr,
    shutdown: RemoteCommand,
}

impl LinuxPower {
    pub fn new(config: LinuxPowerConfig) -> Self {
        Self {
            host: config.host,
            mac: config.mac,
            probe_port: config.probe_port,
            broadcast: config.broadcast,
            shutdown: RemoteCommand::new(config.shutdown_command, config.shutdown_timeout),
        }
    }
}

#[async_trait]
impl PowerController for LinuxPower {
    async fn wake(&self) -> PowerResult<()> {
        info!(host = %self.host, mac = %self.mac, target = %self.broadcast, "Sending wake packet");
        send_magic_packet(self.mac, self.broadcast)
            .await
            .map_err(|e| PowerError::Network(format!("Failed to send magic packet: {}", e)))
    }

    async fn probe(&self, timeout: Duration) -> bool {
        tcp_reachable(&self.host, self.probe_port, timeout).await
    }

    async fn shutdown(&self) -> PowerResult<()> {
        info!(host = %self.host, command = ?self.shutdown.argv(), "Requesting shutdown");
        let result = self.shutdown.run().await;
        if let Err(e) = &result {
            warn!(host = %self.host, error = %e, "Shutdown command failed");
        }
        result
    }
}
