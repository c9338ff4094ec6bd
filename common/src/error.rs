//! Error types for ledgerd.

use thiserror::Error;

/// Main error type for ledgerd operations.
///
/// Out-of-sequence requests and insufficient funds are not errors; they are
/// acknowledged protocol outcomes (see `TransferOutcome`).
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Datagram does not have the fixed packet size.
    #[error("Malformed packet: expected {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },

    /// Packet kind is not one the protocol defines.
    #[error("Unknown packet kind: {0:#06x}")]
    UnknownPacketKind(u16),

    /// Sender address cannot be mapped to a client identity.
    #[error("Unsupported sender address: {0}")]
    UnsupportedAddress(String),

    /// Socket bind, send or receive failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No acknowledgment arrived after every retransmission.
    #[error("No acknowledgment for sequence {sequence_number} after {attempts} attempts")]
    NoAcknowledgment { sequence_number: u32, attempts: u32 },

    /// Client has used every sequence number.
    #[error("Sequence numbers exhausted")]
    SequenceExhausted,

    /// Recorded total balance drifted from the sum of account balances.
    #[error("Integrity violation: recorded total {recorded}, actual sum {actual}")]
    IntegrityViolation { recorded: i64, actual: i64 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Server has not been started.
    #[error("Server not started")]
    NotStarted,

    /// Server is shutting down.
    #[error("Server is shutting down")]
    ShuttingDown,
}

impl LedgerError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::Transport(_)
                | LedgerError::NoAcknowledgment { .. }
        )
    }

    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::MalformedPacket { .. } => "MALFORMED_PACKET",
            LedgerError::UnknownPacketKind(_) => "UNKNOWN_PACKET_KIND",
            LedgerError::UnsupportedAddress(_) => "UNSUPPORTED_ADDRESS",
            LedgerError::Transport(_) => "TRANSPORT_ERROR",
            LedgerError::NoAcknowledgment { .. } => "NO_ACKNOWLEDGMENT",
            LedgerError::SequenceExhausted => "SEQUENCE_EXHAUSTED",
            LedgerError::IntegrityViolation { .. } => "INTEGRITY_VIOLATION",
            LedgerError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            LedgerError::NotStarted => "NOT_STARTED",
            LedgerError::ShuttingDown => "SHUTTING_DOWN",
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

/// Result type alias for ledgerd operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
