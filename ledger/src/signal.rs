//! Change notification between the ledger and its observers.
//!
//! Backed by a `tokio::sync::watch` channel: observers see the latest value,
//! so a burst of mutations may be observed as a single change. Shutdown travels
//! on the same channel.

use tokio::sync::watch;

use crate::StatsSnapshot;

/// Value published on the ledger's change channel.
#[derive(Debug, Clone)]
pub struct LedgerSignal {
    /// Latest ledger snapshot.
    pub snapshot: StatsSnapshot,
    /// Set once the ledger is closed; observers should stop.
    pub shutdown: bool,
}

/// Receiving half of the ledger change signal.
#[derive(Debug, Clone)]
pub struct ChangeListener {
    rx: watch::Receiver<LedgerSignal>,
}

impl ChangeListener {
    pub(crate) fn new(rx: watch::Receiver<LedgerSignal>) -> Self {
        Self { rx }
    }

    /// Latest published snapshot, without waiting.
    pub fn current(&self) -> StatsSnapshot {
        self.rx.borrow().snapshot.clone()
    }

    /// Latest published snapshot, marking it as seen so that `changed` only
    /// wakes for later mutations.
    pub fn take_latest(&mut self) -> StatsSnapshot {
        self.rx.borrow_and_update().snapshot.clone()
    }

    /// Check whether shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        self.rx.borrow().shutdown
    }

    /// Wait for the next change and return the latest snapshot.
    ///
    /// Returns `None` once shutdown is signalled or the ledger is dropped.
    pub async fn changed(&mut self) -> Option<StatsSnapshot> {
        if self.is_shutdown() {
            return None;
        }

        self.rx.changed().await.ok()?;

        let signal = self.rx.borrow_and_update();
        if signal.shutdown {
            None
        } else {
            Some(signal.snapshot.clone())
        }
    }
}
