//! Wake-on-LAN magic packets

use powerlease_util::MacAddress;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Length of a magic packet: 6 sync bytes plus 16 copies of the MAC
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Build the magic packet for `mac`
pub fn magic_packet(mac: MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFF; MAGIC_PACKET_LEN];
    let octets = mac.octets();
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&octets);
    }
    packet
}

/// Send one magic packet to `target`. Delivery is not acknowledged.
pub async fn send_magic_packet(mac: MacAddress, target: SocketAddr) -> std::io::Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_broadcast(true)?;

    let packet = magic_packet(mac);
    let sent = socket.send_to(&packet, target).await?;
    debug!(%mac, %target, bytes = sent, "Magic packet sent");
    Ok(())
}
