//! Transfer request handling.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ledgerd_common::{format_timestamp, time, TransferOutcome, TransferRequest};
use ledgerd_ledger::Ledger;
use ledgerd_protocol::Packet;

use crate::metrics::SharedMetrics;

/// Applies transfer requests and builds their acknowledgments.
pub struct TransferHandler {
    ledger: Arc<Ledger>,
    metrics: SharedMetrics,
}

impl TransferHandler {
    /// Create a new transfer handler.
    pub fn new(ledger: Arc<Ledger>, metrics: SharedMetrics) -> Self {
        Self { ledger, metrics }
    }

    /// Apply `request` and build the transfer acknowledgment.
    ///
    /// Insufficient funds and unexpected sequence numbers are acknowledged like
    /// any other outcome; they differ only in the sequence number and balance
    /// echoed back.
    pub fn handle(&self, request: &TransferRequest) -> Packet {
        let receipt = self.ledger.apply_transfer(request);
        self.metrics.transfer_handled(receipt.outcome);

        match receipt.outcome {
            // Clients number their sequence queries 0, which is never accepted.
            TransferOutcome::Rejected { .. } if request.sequence_number == 0 => {
                debug!(
                    client = %request.sender,
                    last_seq = receipt.sequence_number,
                    "Sequence query"
                );
            }
            TransferOutcome::Rejected { expected } => {
                warn!(
                    client = %request.sender,
                    seq = request.sequence_number,
                    expected = ?expected,
                    last_seq = receipt.sequence_number,
                    "Unexpected sequence number"
                );
            }
            outcome => {
                info!(
                    timestamp = %format_timestamp(&time::now()),
                    client = %request.sender,
                    seq = request.sequence_number,
                    dest = %request.destination,
                    value = request.amount,
                    outcome = outcome.label(),
                    balance = receipt.balance,
                    "Transfer processed"
                );
            }
        }

        Packet::transfer_ack(receipt.sequence_number, receipt.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerMetrics;
    use ledgerd_common::ClientId;

    fn handler() -> (TransferHandler, Arc<Ledger>, SharedMetrics) {
        let ledger = Arc::new(Ledger::new(100));
        let metrics = Arc::new(ServerMetrics::new());
        (
            TransferHandler::new(ledger.clone(), metrics.clone()),
            ledger,
            metrics,
        )
    }

    fn ack(sequence_number: u32, balance: u32) -> Packet {
        Packet::TransferAck {
            sequence_number,
            balance,
        }
    }

    #[test]
    fn test_protocol_scenarios() {
        let (handler, ledger, metrics) = handler();
        let x = ClientId::new(1);
        let y = ClientId::new(2);

        // Applied.
        assert_eq!(handler.handle(&TransferRequest::new(x, y, 30, 1)), ack(1, 70));
        // Replay of the same request.
        assert_eq!(handler.handle(&TransferRequest::new(x, y, 30, 1)), ack(1, 70));
        // Insufficient funds still consumes the sequence number.
        assert_eq!(handler.handle(&TransferRequest::new(x, y, 1000, 2)), ack(2, 70));
        // Gap: echoes the last processed sequence.
        assert_eq!(handler.handle(&TransferRequest::new(x, y, 10, 5)), ack(2, 70));

        let stats = ledger.stats();
        assert_eq!(stats.transaction_count, 1);
        assert_eq!(stats.total_transferred, 30);
        assert_eq!(stats.total_balance, 200);

        let counters = metrics.snapshot();
        assert_eq!(counters.transfers_applied, 1);
        assert_eq!(counters.transfers_insufficient, 1);
        assert_eq!(counters.transfers_rejected, 2);
    }

    #[test]
    fn test_sequence_query_changes_nothing() {
        let (handler, ledger, _) = handler();
        let x = ClientId::new(1);
        let y = ClientId::new(2);
        handler.handle(&TransferRequest::new(x, y, 30, 1));
        let before = ledger.stats();

        // A zero-value request to oneself numbered 0 only reports the sequence.
        assert_eq!(handler.handle(&TransferRequest::new(x, x, 0, 0)), ack(1, 70));
        assert_eq!(ledger.stats(), before);
        assert_eq!(ledger.account(x).unwrap().last_sequence, 1);
    }
}
