//! Discovery handling.

use std::sync::Arc;

use tracing::info;

use ledgerd_common::ClientId;
use ledgerd_ledger::Ledger;
use ledgerd_protocol::Packet;

use crate::metrics::SharedMetrics;

/// Admits clients into the ledger.
pub struct RegistrationHandler {
    ledger: Arc<Ledger>,
    metrics: SharedMetrics,
}

impl RegistrationHandler {
    /// Create a new registration handler.
    pub fn new(ledger: Arc<Ledger>, metrics: SharedMetrics) -> Self {
        Self { ledger, metrics }
    }

    /// Register `client` and build the discovery acknowledgment.
    ///
    /// Always succeeds. Repeated discoveries leave the ledger untouched but are
    /// still acknowledged. The sequence number is echoed verbatim and never
    /// validated.
    pub fn register(&self, client: ClientId, sequence_number: u32) -> Packet {
        let registration = self.ledger.get_or_create(client);
        self.metrics.discovery_handled();

        if registration.created {
            info!(
                client = %client,
                balance = registration.account.balance,
                total_balance = registration.total_balance,
                "New client registered"
            );
        } else {
            info!(client = %client, "Duplicate discovery");
        }

        Packet::DiscoveryAck { sequence_number }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerMetrics;

    #[test]
    fn test_register_echoes_sequence() {
        let ledger = Arc::new(Ledger::new(100));
        let metrics = Arc::new(ServerMetrics::new());
        let handler = RegistrationHandler::new(ledger.clone(), metrics.clone());

        let ack = handler.register(ClientId::new(9), 42);
        assert_eq!(ack, Packet::DiscoveryAck { sequence_number: 42 });
        assert_eq!(ledger.stats().total_balance, 100);

        // Sequence numbers on discovery carry no ordering.
        let ack = handler.register(ClientId::new(9), 3);
        assert_eq!(ack, Packet::DiscoveryAck { sequence_number: 3 });
        assert_eq!(ledger.stats().total_balance, 100);
        assert_eq!(metrics.snapshot().discoveries, 2);
    }
}
