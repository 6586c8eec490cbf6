//! Reachability probe

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// Whether a TCP connection to `host:port` completes within `timeout`.
///
/// Resolution failures, refusals and timeouts all read as "not reachable".
pub async fn tcp_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    let result = tokio::time::timeout(timeout, TcpStream::connect((host, port))).await;

    match result {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            trace!(host, port, error = %e, "Probe connect failed");
            false
        }
        Err(_) => {
            trace!(host, port, ?timeout, "Probe timed out");
            false
        }
    }
}
