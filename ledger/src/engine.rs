//! Core ledger engine implementation.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use ledgerd_common::{
    constants, ClientId, LedgerError, Result, TransferOutcome, TransferReceipt, TransferRequest,
};

use crate::account::ClientAccount;
use crate::signal::{ChangeListener, LedgerSignal};
use crate::stats::{LedgerStats, StatsSnapshot};

/// Result of admitting a client.
#[derive(Debug, Clone)]
pub struct Registration {
    /// The client's account after registration.
    pub account: ClientAccount,
    /// Whether this call created the account.
    pub created: bool,
    /// Sum of all balances right after this call.
    pub total_balance: i64,
}

/// Account table plus running totals. Only ever touched under the ledger lock.
#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<ClientId, ClientAccount>,
    stats: LedgerStats,
}

impl LedgerState {
    /// Look up the account, creating it with the initial grant if absent.
    /// Also returns whether it was created.
    fn ensure_account(&mut self, address: ClientId, initial_balance: i64) -> (&mut ClientAccount, bool) {
        let mut created = false;
        let account = self.accounts.entry(address).or_insert_with(|| {
            created = true;
            ClientAccount::new(address, initial_balance)
        });

        if created {
            self.stats.record_grant(initial_balance);
            debug!(client = %address, initial_balance, "Account created");
        }

        (account, created)
    }

    /// Validate and apply one transfer. Returns the receipt and whether any
    /// state changed.
    fn apply(&mut self, request: &TransferRequest, initial_balance: i64) -> (TransferReceipt, bool) {
        let (_, destination_created) = self.ensure_account(request.destination, initial_balance);
        let (sender, sender_created) = self.ensure_account(request.sender, initial_balance);
        let mutated = destination_created || sender_created;

        let amount = i64::from(request.amount);

        if !sender.is_next_sequence(request.sequence_number) {
            let receipt = TransferReceipt {
                outcome: TransferOutcome::Rejected {
                    expected: sender.expected_sequence(),
                },
                sequence_number: sender.last_sequence,
                balance: sender.balance,
            };
            return (receipt, mutated);
        }

        sender.advance_sequence(request.sequence_number);

        let outcome = if sender.has_sufficient_funds(amount) {
            if !request.is_self_transfer() {
                sender.debit(amount);
            }
            TransferOutcome::Applied
        } else {
            TransferOutcome::InsufficientFunds
        };

        let receipt = TransferReceipt {
            outcome,
            sequence_number: request.sequence_number,
            balance: sender.balance,
        };

        if outcome.is_applied() {
            if !request.is_self_transfer() {
                if let Some(destination) = self.accounts.get_mut(&request.destination) {
                    destination.credit(amount);
                }
            }
            self.stats.record_transfer(request.amount);
        }

        (receipt, true)
    }

    fn balance_sum(&self) -> i64 {
        self.accounts.values().map(|account| account.balance).sum()
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::capture(self.stats, self.accounts.len())
    }
}

/// The shared ledger.
///
/// Every operation runs as a single critical section over the whole table,
/// so a check-then-mutate sequence is never observed half done. Each mutation
/// publishes a snapshot on the change signal while the lock is still held,
/// which keeps published snapshots in mutation order.
pub struct Ledger {
    state: Mutex<LedgerState>,
    notifier: watch::Sender<LedgerSignal>,
    initial_balance: i64,
}

impl Ledger {
    /// Create an empty ledger granting `initial_balance` to each new account.
    ///
    /// The grant is clamped to `0..=MAX_INITIAL_BALANCE`, which keeps every
    /// balance and the running total within `i64`.
    pub fn new(initial_balance: i64) -> Self {
        let clamped = initial_balance.clamp(0, constants::MAX_INITIAL_BALANCE);
        if clamped != initial_balance {
            warn!(requested = initial_balance, granted = clamped, "Initial balance out of range");
        }
        let initial_balance = clamped;

        let state = LedgerState::default();
        let (notifier, _) = watch::channel(LedgerSignal {
            snapshot: state.snapshot(),
            shutdown: false,
        });

        Self {
            state: Mutex::new(state),
            notifier,
            initial_balance,
        }
    }

    /// Balance granted to each new account.
    pub fn initial_balance(&self) -> i64 {
        self.initial_balance
    }

    /// Return the client's account, creating it with the initial grant if absent.
    ///
    /// Idempotent: a known client leaves the ledger untouched.
    #[instrument(skip(self), level = "debug")]
    pub fn get_or_create(&self, address: ClientId) -> Registration {
        let mut state = self.state.lock();
        let (account, created) = state.ensure_account(address, self.initial_balance);
        let account = account.clone();

        if created {
            self.publish(&state);
        }

        Registration {
            account,
            created,
            total_balance: state.stats.total_balance,
        }
    }

    /// Apply a transfer request.
    ///
    /// Both accounts are created on first reference. A request whose sequence
    /// number is not the sender's next one is rejected without touching any
    /// balance or sequence; the receipt then carries the sender's current
    /// state so the last acknowledgment can be replayed. A request with the
    /// right sequence number always consumes it, even when funds are short.
    #[instrument(
        skip(self, request),
        level = "debug",
        fields(sender = %request.sender, seq = request.sequence_number)
    )]
    pub fn apply_transfer(&self, request: &TransferRequest) -> TransferReceipt {
        let mut state = self.state.lock();
        let (receipt, mutated) = state.apply(request, self.initial_balance);

        if mutated {
            self.publish(&state);
        }

        receipt
    }

    /// Get a copy of a client's account.
    pub fn account(&self, address: ClientId) -> Option<ClientAccount> {
        self.state.lock().accounts.get(&address).cloned()
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    /// Current aggregate counters.
    pub fn stats(&self) -> LedgerStats {
        self.state.lock().stats
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.state.lock().snapshot()
    }

    /// Check that the recorded total balance equals the sum of all accounts.
    pub fn verify_integrity(&self) -> Result<()> {
        let state = self.state.lock();
        let actual = state.balance_sum();

        if actual != state.stats.total_balance {
            return Err(LedgerError::IntegrityViolation {
                recorded: state.stats.total_balance,
                actual,
            });
        }

        Ok(())
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> ChangeListener {
        ChangeListener::new(self.notifier.subscribe())
    }

    /// Signal shutdown to every listener. Blocked waits return immediately.
    pub fn close(&self) {
        self.notifier.send_modify(|signal| signal.shutdown = true);
    }

    /// Check whether [`Ledger::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.notifier.borrow().shutdown
    }

    fn publish(&self, state: &LedgerState) {
        debug_assert_eq!(state.stats.total_balance, state.balance_sum());

        let snapshot = state.snapshot();
        self.notifier.send_modify(|signal| signal.snapshot = snapshot);
    }
}
