//! Aggregate ledger statistics.

use ledgerd_common::{constants, format_timestamp, time, Timestamp};

/// Running totals maintained alongside the account table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// Transfers that moved value.
    pub transaction_count: u64,
    /// Sum of amounts moved by those transfers.
    pub total_transferred: u64,
    /// Sum of every account balance.
    pub total_balance: i64,
}

impl LedgerStats {
    /// Record value moved by one applied transfer.
    pub(crate) fn record_transfer(&mut self, amount: u32) {
        self.transaction_count = self.transaction_count.saturating_add(1);
        self.total_transferred = self.total_transferred.saturating_add(u64::from(amount));
    }

    /// Record a new account's initial grant.
    ///
    /// Grants are bounded by `MAX_INITIAL_BALANCE` and there are at most 2^32
    /// accounts, so the total cannot overflow.
    pub(crate) fn record_grant(&mut self, initial_balance: i64) {
        debug_assert!((0..=constants::MAX_INITIAL_BALANCE).contains(&initial_balance));
        self.total_balance += initial_balance;
    }
}

/// Point-in-time view of the ledger published to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Aggregate counters.
    pub stats: LedgerStats,
    /// Number of registered accounts.
    pub account_count: usize,
    /// When the snapshot was taken.
    pub taken_at: Timestamp,
}

impl StatsSnapshot {
    /// Snapshot the given counters now.
    pub fn capture(stats: LedgerStats, account_count: usize) -> Self {
        Self {
            stats,
            account_count,
            taken_at: time::now(),
        }
    }

    /// Console timestamp of the snapshot.
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.taken_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = LedgerStats::default();
        stats.record_grant(100);
        stats.record_grant(100);
        stats.record_transfer(30);
        stats.record_transfer(u32::MAX);

        assert_eq!(stats.total_balance, 200);
        assert_eq!(stats.transaction_count, 2);
        assert_eq!(stats.total_transferred, 30 + u64::from(u32::MAX));
    }
}
