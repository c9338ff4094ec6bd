//! UDP transport shim.
//!
//! Owns the socket, turns datagrams into decoded packets and encodes replies.
//! Nothing here touches the ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::info;

use ledgerd_common::Result;
use ledgerd_protocol::{Packet, PACKET_SIZE};

/// Receive buffer, larger than a packet so oversized datagrams are detected.
const RECV_BUFFER_SIZE: usize = PACKET_SIZE * 4;

/// One received datagram.
#[derive(Debug)]
pub struct Inbound {
    /// Sender address.
    pub from: SocketAddr,
    /// Decoded packet, or why it could not be decoded.
    pub packet: Result<Packet>,
}

/// UDP socket shared by the receive loop and transfer tasks.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the server socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(local_addr = %socket.local_addr()?, "UDP socket bound");

        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next datagram.
    ///
    /// Only socket failures are returned as errors; decode failures are
    /// reported inside [`Inbound`].
    pub async fn recv(&self) -> Result<Inbound> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let (len, from) = self.socket.recv_from(&mut buf).await?;

        Ok(Inbound {
            from,
            packet: Packet::decode(&buf[..len]),
        })
    }

    /// Encode and send one packet.
    pub async fn send(&self, to: SocketAddr, packet: &Packet) -> Result<()> {
        self.socket.send_to(&packet.encode(), to).await?;
        Ok(())
    }
}
