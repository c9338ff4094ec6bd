//! Stats observer.
//!
//! Reports ledger statistics whenever the ledger changes, and on a fixed
//! interval while it is idle. Changes arriving faster than the observer runs are
//! coalesced into one report.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use ledgerd_common::time;
use ledgerd_ledger::{ChangeListener, StatsSnapshot};

/// Summary returned when the observer exits.
#[derive(Debug, Clone)]
pub struct ObserverReport {
    /// Number of reports emitted, including the initial one.
    pub snapshots_emitted: u64,
    /// Last snapshot reported.
    pub last: StatsSnapshot,
}

/// Background task printing ledger statistics.
pub struct StatsObserver {
    listener: ChangeListener,
    report_interval: Duration,
}

impl StatsObserver {
    /// Create a new observer.
    pub fn new(listener: ChangeListener, report_interval: Duration) -> Self {
        Self {
            listener,
            report_interval,
        }
    }

    /// Run until the ledger is closed.
    pub async fn run(mut self) -> ObserverReport {
        let mut last = self.listener.take_latest();
        report(&last);
        let mut snapshots_emitted = 1;

        let mut ticker = interval(self.report_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = self.listener.changed() => {
                    match changed {
                        Some(snapshot) => last = snapshot,
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    last = StatsSnapshot {
                        taken_at: time::now(),
                        ..self.listener.current()
                    };
                }
            }

            report(&last);
            snapshots_emitted += 1;
        }

        // Mutations racing the shutdown signal are not reported by `changed`.
        let latest = self.listener.current();
        if latest.stats != last.stats || latest.account_count != last.account_count {
            report(&latest);
            snapshots_emitted += 1;
            last = latest;
        }

        debug!(snapshots_emitted, "Stats observer stopped");

        ObserverReport {
            snapshots_emitted,
            last,
        }
    }
}

fn report(snapshot: &StatsSnapshot) {
    info!(
        timestamp = %snapshot.timestamp(),
        transaction_count = snapshot.stats.transaction_count,
        total_transferred = snapshot.stats.total_transferred,
        total_balance = snapshot.stats.total_balance,
        accounts = snapshot.account_count,
        "Ledger stats"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerd_common::{ClientId, TransferRequest};
    use ledgerd_ledger::Ledger;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_observer_stops_on_close() {
        let ledger = Arc::new(Ledger::new(100));
        let observer = StatsObserver::new(ledger.subscribe(), Duration::from_secs(3600));
        let handle = tokio::spawn(observer.run());

        ledger.get_or_create(ClientId::new(1));
        ledger.apply_transfer(&TransferRequest::new(ClientId::new(1), ClientId::new(2), 40, 1));
        tokio::task::yield_now().await;
        ledger.close();

        let report = handle.await.unwrap();
        assert!(report.snapshots_emitted >= 1);
        assert_eq!(report.last.stats, ledger.stats());
    }

    #[tokio::test]
    async fn test_observer_reports_final_state_after_burst() {
        let ledger = Arc::new(Ledger::new(100));
        let observer = StatsObserver::new(ledger.subscribe(), Duration::from_secs(3600));

        // Mutations before the observer starts collapse into its initial report.
        for i in 1..=50 {
            ledger.get_or_create(ClientId::new(i));
        }

        let handle = tokio::spawn(observer.run());
        tokio::task::yield_now().await;
        ledger.close();

        let report = handle.await.unwrap();
        assert_eq!(report.last.stats.total_balance, 5000);
        assert_eq!(report.last.account_count, 50);
        assert!(report.snapshots_emitted <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_reports_on_interval_when_idle() {
        let ledger = Arc::new(Ledger::new(100));
        let observer = StatsObserver::new(ledger.subscribe(), Duration::from_secs(10));
        let handle = tokio::spawn(observer.run());

        tokio::time::sleep(Duration::from_secs(35)).await;
        ledger.close();

        let report = handle.await.unwrap();
        // Initial report plus three idle ticks.
        assert_eq!(report.snapshots_emitted, 4);
        assert_eq!(report.last.stats.total_balance, 0);
    }
}
