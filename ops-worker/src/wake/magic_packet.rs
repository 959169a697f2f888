//! Wake-on-LAN magic packet construction and broadcast.

use anyhow::{anyhow, Result};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::constants::wake::LIMITED_BROADCAST;

pub const MAGIC_PACKET_LEN: usize = 102;

/// Accepts any separator (`:`, `-`, `.`) or none; 12 hex digits required.
pub fn parse_mac(mac: &str) -> Result<[u8; 6]> {
    let hex: String = mac.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let separators_ok = mac
        .chars()
        .all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '-' | '.' | ' '));
    if hex.len() != 12 || !separators_ok {
        return Err(anyhow!("Invalid MAC address '{}'", mac));
    }

    let mut out = [0u8; 6];
    for (i, byte) in out.iter_mut().enumerate() {
        let pair = hex
            .get(i * 2..i * 2 + 2)
            .ok_or_else(|| anyhow!("Invalid MAC address '{}'", mac))?;
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| anyhow!("Invalid MAC address '{}'", mac))?;
    }
    Ok(out)
}

/// 6 x 0xFF followed by the MAC repeated 16 times.
pub fn magic_packet(mac: [u8; 6]) -> [u8; MAGIC_PACKET_LEN] {
    let mut pkt = [0xFFu8; MAGIC_PACKET_LEN];
    for chunk in pkt[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac);
    }
    pkt
}

fn broadcast_address(hint: Option<&str>) -> Result<Ipv4Addr> {
    let target = hint.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(LIMITED_BROADCAST);
    target
        .parse::<Ipv4Addr>()
        .map_err(|_| anyhow!("Invalid broadcast address '{}'", target))
}

/// Sends one magic packet. Fire-and-forget: no acknowledgement exists.
pub async fn send_magic_packet(mac: &str, broadcast: Option<&str>, port: u16) -> Result<()> {
    let packet = magic_packet(parse_mac(mac)?);
    let target = SocketAddrV4::new(broadcast_address(broadcast)?, port);

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|e| anyhow!("Failed to bind UDP socket: {}", e))?;
    socket
        .set_broadcast(true)
        .map_err(|e| anyhow!("Failed to enable broadcast: {}", e))?;
    socket
        .send_to(&packet, target)
        .await
        .map_err(|e| anyhow!("Failed to send magic packet to {}: {}", target, e))?;

    debug!("Magic packet for {} sent to {}", mac, target);
    Ok(())
}
