//! Simulation metrics.

use std::time::Duration;

/// What an acknowledged transfer did, judged by the balance it reported.
///
/// An acknowledgment carries no outcome code. Comparing the reported balance
/// with the previous one tells an applied transfer from one refused for short
/// funds, unless another sender moved value to this client in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckedOutcome {
    /// The balance fell by the amount sent.
    Applied,
    /// The balance did not move.
    Insufficient,
    /// The balance moved by something else, or the previous balance is unknown.
    Unclassified,
}

impl AckedOutcome {
    /// Classify an acknowledgment from the balance before and after it.
    ///
    /// A balance of `u32::MAX` may be saturated and says nothing.
    pub fn classify(before: Option<u32>, amount: u32, after: u32) -> Self {
        match before {
            Some(before) if before != u32::MAX => {
                if before.checked_sub(after) == Some(amount) {
                    AckedOutcome::Applied
                } else if before == after {
                    AckedOutcome::Insufficient
                } else {
                    AckedOutcome::Unclassified
                }
            }
            _ => AckedOutcome::Unclassified,
        }
    }
}

/// Counts and latencies for one simulator run.
#[derive(Debug, Clone, Default)]
pub struct SimulationMetrics {
    /// Acknowledged transfers that moved value.
    pub applied: u64,
    /// Acknowledged transfers refused for short funds.
    pub insufficient: u64,
    /// Acknowledged transfers whose effect could not be told.
    pub unclassified: u64,
    /// Transfers the server never acknowledged.
    pub failed: u64,
    /// Value moved by applied transfers.
    pub moved: u64,
    /// Round trip of each acknowledged transfer.
    latencies: Vec<Duration>,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acknowledged transfer of `amount`.
    pub fn record_ack(&mut self, outcome: AckedOutcome, amount: u32, latency: Duration) {
        match outcome {
            AckedOutcome::Applied => {
                self.applied += 1;
                self.moved += u64::from(amount);
            }
            AckedOutcome::Insufficient => self.insufficient += 1,
            AckedOutcome::Unclassified => self.unclassified += 1,
        }
        self.latencies.push(latency);
    }

    /// Record a transfer that was never acknowledged.
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Transfers sent, acknowledged or not.
    pub fn sent(&self) -> u64 {
        self.acknowledged() + self.failed
    }

    /// Transfers the server acknowledged.
    pub fn acknowledged(&self) -> u64 {
        self.applied + self.insufficient + self.unclassified
    }

    /// Mean acknowledgment round trip.
    pub fn mean_latency(&self) -> Duration {
        match u32::try_from(self.latencies.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => self.latencies.iter().sum::<Duration>() / count,
        }
    }

    /// Nearest-rank 99th percentile round trip.
    pub fn p99_latency(&self) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }

        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let rank = (sorted.len() * 99).div_ceil(100);
        sorted[rank.saturating_sub(1)]
    }
}
