use crate::protocol::Packet;
use crate::Result;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

/// Outbound, fire-and-forget packet sink.
pub trait Transmitter {
    fn send(&self, payload: &[u8]) -> Result<()>;
}

impl<T: Transmitter + ?Sized> Transmitter for &T {
    fn send(&self, payload: &[u8]) -> Result<()> {
        (**self).send(payload)
    }
}

impl<T: Transmitter + ?Sized> Transmitter for Box<T> {
    fn send(&self, payload: &[u8]) -> Result<()> {
        (**self).send(payload)
    }
}

/// UDP transmitter with a fixed destination and local port.
///
/// Every send binds a fresh socket, sends one datagram and closes it again.
/// Nothing is kept between calls, so a failed send leaves no broken state.
#[derive(Debug, Clone)]
pub struct UdpTransmitter {
    remote: SocketAddr,
    local_port: u16,
}

impl UdpTransmitter {
    pub fn new(remote: SocketAddr, local_port: u16) -> Self {
        log::info!(
            "UDP transmitter: local port {} -> {}",
            local_port,
            remote
        );
        Self { remote, local_port }
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Local bind address in the same family as the destination.
    fn bind_addr(&self) -> SocketAddr {
        match self.remote {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.local_port)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, self.local_port)),
        }
    }
}

impl Transmitter for UdpTransmitter {
    fn send(&self, payload: &[u8]) -> Result<()> {
        let socket = UdpSocket::bind(self.bind_addr())?;
        let sent = socket.send_to(payload, self.remote)?;
        log::trace!("UDP sent {}/{} bytes to {}", sent, payload.len(), self.remote);
        Ok(())
    }
}

/// Send one packet, logging and dropping transport failures.
///
/// Returns whether the datagram left the host. A lost packet is never
/// retried; the next event produces a fresh one.
pub fn send_packet<T: Transmitter + ?Sized>(tx: &T, packet: Packet) -> bool {
    match tx.send(packet.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Dropping {:?} packet: {}", packet, e);
            false
        }
    }
}
