//! Packet and outcome counters for the server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ledgerd_common::TransferOutcome;

/// Server metrics.
pub struct ServerMetrics {
    /// Datagrams taken off the socket.
    pub datagrams_received: AtomicU64,
    /// Datagrams dropped for having the wrong size.
    pub malformed_dropped: AtomicU64,
    /// Datagrams dropped for carrying an unknown kind.
    pub unknown_kind_dropped: AtomicU64,
    /// Well-formed packets the server does not handle (acks, unmappable senders).
    pub ignored_packets: AtomicU64,
    /// Discovery requests handled.
    pub discoveries: AtomicU64,
    /// Transfers that moved value.
    pub transfers_applied: AtomicU64,
    /// Transfers that consumed a sequence number without moving value.
    pub transfers_insufficient: AtomicU64,
    /// Transfers rejected for an unexpected sequence number.
    pub transfers_rejected: AtomicU64,
    /// Acknowledgments sent.
    pub acks_sent: AtomicU64,
    /// Failed sends.
    pub send_failures: AtomicU64,
    /// Failed receives.
    pub receive_failures: AtomicU64,
}

impl ServerMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            malformed_dropped: AtomicU64::new(0),
            unknown_kind_dropped: AtomicU64::new(0),
            ignored_packets: AtomicU64::new(0),
            discoveries: AtomicU64::new(0),
            transfers_applied: AtomicU64::new(0),
            transfers_insufficient: AtomicU64::new(0),
            transfers_rejected: AtomicU64::new(0),
            acks_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            receive_failures: AtomicU64::new(0),
        }
    }

    pub fn datagram_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_dropped(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unknown_kind_dropped(&self) {
        self.unknown_kind_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packet_ignored(&self) {
        self.ignored_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discovery_handled(&self) {
        self.discoveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a transfer was handled.
    pub fn transfer_handled(&self, outcome: TransferOutcome) {
        let counter = match outcome {
            TransferOutcome::Applied => &self.transfers_applied,
            TransferOutcome::InsufficientFunds => &self.transfers_insufficient,
            TransferOutcome::Rejected { .. } => &self.transfers_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ack_sent(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn receive_failed(&self) {
        self.receive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            unknown_kind_dropped: self.unknown_kind_dropped.load(Ordering::Relaxed),
            ignored_packets: self.ignored_packets.load(Ordering::Relaxed),
            discoveries: self.discoveries.load(Ordering::Relaxed),
            transfers_applied: self.transfers_applied.load(Ordering::Relaxed),
            transfers_insufficient: self.transfers_insufficient.load(Ordering::Relaxed),
            transfers_rejected: self.transfers_rejected.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub malformed_dropped: u64,
    pub unknown_kind_dropped: u64,
    pub ignored_packets: u64,
    pub discoveries: u64,
    pub transfers_applied: u64,
    pub transfers_insufficient: u64,
    pub transfers_rejected: u64,
    pub acks_sent: u64,
    pub send_failures: u64,
    pub receive_failures: u64,
}

impl MetricsSnapshot {
    /// Transfers handled with any outcome.
    pub fn transfers_total(&self) -> u64 {
        self.transfers_applied + self.transfers_insufficient + self.transfers_rejected
    }
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<ServerMetrics>;
