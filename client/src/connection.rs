//! Socket to the ledger server.

use std::io::ErrorKind;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use ledgerd_common::{ClientId, LedgerError, Result};
use ledgerd_protocol::{Packet, PACKET_SIZE};

/// UDP socket connected to one server address.
///
/// Connecting fixes the local source address, which is the identity the
/// server keys this client's account by.
#[derive(Debug)]
pub struct ServerConnection {
    socket: UdpSocket,
    server: SocketAddr,
}

impl ServerConnection {
    /// Bind a local socket and connect it to `server`.
    pub async fn open(bind: SocketAddr, server: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(server).await?;
        Ok(Self { socket, server })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Identity the server sees for this socket.
    pub fn client_id(&self) -> Result<ClientId> {
        let local = self.local_addr()?;
        match ClientId::from_socket_addr(&local) {
            Some(id) if !local.ip().is_unspecified() => Ok(id),
            _ => Err(LedgerError::UnsupportedAddress(local.to_string())),
        }
    }

    /// Server address.
    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Send one packet to the server.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        self.socket.send(&packet.encode()).await?;
        Ok(())
    }

    /// Wait for the next decodable packet from the server.
    ///
    /// Undecodable datagrams are skipped, as are refusals reported for an
    /// earlier send. Returns `None` once `deadline` passes.
    pub async fn recv_until(&self, deadline: Instant) -> Result<Option<Packet>> {
        let mut buf = [0u8; PACKET_SIZE * 4];

        loop {
            let len = match timeout_at(deadline, self.socket.recv(&mut buf)).await {
                Ok(Ok(len)) => len,
                Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                    debug!(server = %self.server, "Server port unreachable");
                    continue;
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Ok(None),
            };

            match Packet::decode(&buf[..len]) {
                Ok(packet) => return Ok(Some(packet)),
                Err(e) => debug!(error = %e, "Ignoring undecodable reply"),
            }
        }
    }
}
