//! Ledger client with sequence numbering and retransmission.

use std::net::SocketAddr;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use ledgerd_common::{ClientId, LedgerError, Result};
use ledgerd_protocol::Packet;

use crate::config::ClientConfig;
use crate::connection::ServerConnection;

/// Server acknowledgment of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferAck {
    /// Sequence number the server recorded.
    pub sequence_number: u32,
    /// Sender balance after the transfer, saturated to 32 bits.
    pub balance: u32,
}

/// Client for one ledger server.
///
/// Requests are issued one at a time. A transfer is retransmitted unchanged
/// until an acknowledgment carrying its sequence number arrives, which the
/// server's sequence check makes safe.
///
/// Before its first transfer the client asks the server for the last sequence
/// number it recorded for this address, so a new client on a host that has
/// already transferred continues that host's sequence.
pub struct LedgerClient {
    /// Configuration.
    config: ClientConfig,
    /// Socket to the server.
    connection: ServerConnection,
    /// Last sequence number the server recorded for this client.
    last_acked: u32,
    /// Whether `last_acked` has been learned from the server.
    synchronized: bool,
    /// Balance from the last transfer acknowledgment.
    last_balance: Option<u32>,
    /// Correlation token for the next discovery.
    discovery_token: u32,
}

impl LedgerClient {
    /// Bind a local socket and prepare to talk to the configured server.
    #[instrument(skip(config), fields(server = %config.server_addr))]
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let connection =
            ServerConnection::open(config.bind_socket_addr()?, config.server_socket_addr()?).await?;
        info!(local_addr = %connection.local_addr()?, "Client socket bound");

        Ok(Self {
            config,
            connection,
            last_acked: 0,
            synchronized: false,
            last_balance: None,
            discovery_token: 0,
        })
    }

    /// Register with the server.
    ///
    /// Safe to repeat; the server grants the initial balance only once.
    pub async fn discover(&mut self) -> Result<()> {
        let token = self.discovery_token;
        self.discovery_token = self.discovery_token.wrapping_add(1);

        let request = Packet::Discovery {
            sequence_number: token,
        };
        self.exchange(&request, |reply| match *reply {
            Packet::DiscoveryAck { sequence_number } if sequence_number == token => Some(()),
            _ => None,
        })
        .await?;

        info!(server = %self.connection.server_addr(), "Discovered");
        Ok(())
    }

    /// Learn the last sequence number the server recorded for this client.
    ///
    /// Sends a zero-value transfer to this client's own account numbered 0,
    /// which the server never accepts. It answers by echoing its recorded
    /// sequence number and balance without changing either.
    pub async fn synchronize(&mut self) -> Result<u32> {
        let query = Packet::TransferRequest {
            sequence_number: 0,
            destination: self.connection.client_id()?,
            amount: 0,
        };
        let (last, balance) = self
            .exchange(&query, |reply| match *reply {
                Packet::TransferAck {
                    sequence_number,
                    balance,
                } => Some((sequence_number, balance)),
                _ => None,
            })
            .await?;

        self.last_acked = last;
        self.last_balance = Some(balance);
        self.synchronized = true;

        debug!(last_seq = last, balance, "Synchronized with server");
        Ok(last)
    }

    /// Transfer `amount` to `destination`.
    ///
    /// Returns once the server acknowledges this request's sequence number. An
    /// acknowledgment does not say whether value moved: a short balance
    /// consumes the sequence number too, leaving the balance unchanged.
    ///
    /// If the server reports a sequence number other than the one sent or the
    /// one before it, another sender sharing this address moved the sequence
    /// on. The client adopts the server's number and sends again.
    pub async fn transfer(&mut self, destination: ClientId, amount: u32) -> Result<TransferAck> {
        if !self.synchronized {
            self.synchronize().await?;
        }

        let mut resyncs = 0;
        loop {
            let sequence_number = self.next_sequence().ok_or(LedgerError::SequenceExhausted)?;
            let previous = self.last_acked;

            let request = Packet::TransferRequest {
                sequence_number,
                destination,
                amount,
            };
            let (acked, balance) = self
                .exchange(&request, |reply| match *reply {
                    Packet::TransferAck {
                        sequence_number: acked,
                        balance,
                    } if acked != previous => Some((acked, balance)),
                    _ => None,
                })
                .await?;

            self.last_acked = acked;
            self.last_balance = Some(balance);

            if acked == sequence_number {
                debug!(seq = sequence_number, dest = %destination, amount, balance, "Transfer acknowledged");
                return Ok(TransferAck {
                    sequence_number,
                    balance,
                });
            }

            resyncs += 1;
            warn!(
                sent = sequence_number,
                server_seq = acked,
                resyncs,
                "Sequence out of step with server"
            );
            if resyncs >= self.config.max_attempts {
                return Err(LedgerError::NoAcknowledgment {
                    sequence_number,
                    attempts: self.config.max_attempts,
                });
            }
        }
    }

    /// Balance reported by the last acknowledgment.
    pub fn last_balance(&self) -> Option<u32> {
        self.last_balance
    }

    /// Sequence number the next transfer will carry, if any remain.
    ///
    /// Until the first transfer synchronizes with the server this assumes the
    /// server has recorded nothing for this client.
    pub fn next_sequence(&self) -> Option<u32> {
        self.last_acked.checked_add(1)
    }

    /// Local socket address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.connection.local_addr()
    }

    // --- Private methods ---

    async fn exchange<T>(
        &self,
        request: &Packet,
        mut accept: impl FnMut(&Packet) -> Option<T>,
    ) -> Result<T> {
        let attempts = self.config.max_attempts;

        for attempt in 1..=attempts {
            self.connection.send(request).await?;

            let deadline = Instant::now() + self.config.ack_timeout;
            while let Some(reply) = self.connection.recv_until(deadline).await? {
                if let Some(value) = accept(&reply) {
                    return Ok(value);
                }
                debug!(
                    kind = ?reply.kind(),
                    seq = reply.sequence_number(),
                    "Ignoring stale reply"
                );
            }

            if attempt < attempts {
                debug!(attempt, seq = request.sequence_number(), "Retransmitting");
            }
        }

        warn!(
            kind = ?request.kind(),
            seq = request.sequence_number(),
            attempts,
            "No acknowledgment"
        );
        Err(LedgerError::NoAcknowledgment {
            sequence_number: request.sequence_number(),
            attempts,
        })
    }
}
