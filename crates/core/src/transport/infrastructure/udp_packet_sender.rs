use std::net::{SocketAddr, UdpSocket};

use crate::transport::domain::packet_sender::PacketSender;

/// Fire-and-forget UDP sender bound to an ephemeral local port.
///
/// The socket is released when the sender is dropped.
pub struct UdpPacketSender {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpPacketSender {
    pub fn new(dest: SocketAddr) -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr: SocketAddr = if dest.is_ipv6() {
            "[::]:0".parse()?
        } else {
            "0.0.0.0:0".parse()?
        };
        let socket = UdpSocket::bind(bind_addr)?;
        log::debug!("UDP sender bound to {} -> {dest}", socket.local_addr()?);
        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(self.socket.local_addr()?)
    }
}

impl PacketSender for UdpPacketSender {
    fn send(&mut self, payload: &[u8]) -> Result<usize, Box<dyn std::error::Error>> {
        let sent = self.socket.send_to(payload, self.dest)?;
        log::debug!("Sent {sent} bytes to {}", self.dest);
        Ok(sent)
    }
}
