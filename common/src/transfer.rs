//! Transfer request types.

use crate::ClientId;

/// One value-transfer instruction from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// Requesting client; the account that is debited.
    pub sender: ClientId,
    /// Account that is credited.
    pub destination: ClientId,
    /// Value to move.
    pub amount: u32,
    /// Per-sender sequence number, strictly increasing from 1.
    pub sequence_number: u32,
}

impl TransferRequest {
    /// Create a new transfer request.
    pub fn new(sender: ClientId, destination: ClientId, amount: u32, sequence_number: u32) -> Self {
        Self {
            sender,
            destination,
            amount,
            sequence_number,
        }
    }

    /// Check whether sender and destination are the same account.
    pub fn is_self_transfer(&self) -> bool {
        self.sender == self.destination
    }
}

/// Result of processing a transfer request against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Value moved; the sequence number was consumed.
    Applied,
    /// Balance too low; the sequence number was consumed, no value moved.
    InsufficientFunds,
    /// Sequence number was not the next expected one; nothing changed.
    Rejected {
        /// Sequence number the ledger would have accepted, if any.
        expected: Option<u32>,
    },
}

impl TransferOutcome {
    /// Check whether the request consumed its sequence number.
    pub fn consumed_sequence(&self) -> bool {
        !matches!(self, TransferOutcome::Rejected { .. })
    }

    /// Check whether value actually moved.
    pub fn is_applied(&self) -> bool {
        matches!(self, TransferOutcome::Applied)
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            TransferOutcome::Applied => "applied",
            TransferOutcome::InsufficientFunds => "insufficient_funds",
            TransferOutcome::Rejected { .. } => "rejected",
        }
    }
}

/// What the ledger reports back for a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// How the request was handled.
    pub outcome: TransferOutcome,
    /// Sequence number to echo: the request's own when consumed, otherwise the
    /// sender's last processed one.
    pub sequence_number: u32,
    /// Sender balance after processing.
    pub balance: i64,
}
