//! Client account definitions for the ledger.

use ledgerd_common::ClientId;

/// One registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAccount {
    /// Client identity, unique key in the ledger.
    pub address: ClientId,
    /// Highest transfer sequence number processed for this client. Never decreases.
    pub last_sequence: u32,
    /// Current balance.
    pub balance: i64,
}

impl ClientAccount {
    /// Create a new account holding the initial grant.
    pub fn new(address: ClientId, initial_balance: i64) -> Self {
        Self {
            address,
            last_sequence: 0,
            balance: initial_balance,
        }
    }

    /// Sequence number the next transfer must carry, or `None` once the
    /// sequence space is exhausted.
    pub fn expected_sequence(&self) -> Option<u32> {
        self.last_sequence.checked_add(1)
    }

    /// Check if `sequence_number` is the next one to process.
    pub fn is_next_sequence(&self, sequence_number: u32) -> bool {
        self.expected_sequence() == Some(sequence_number)
    }

    /// Record `sequence_number` as processed.
    pub(crate) fn advance_sequence(&mut self, sequence_number: u32) {
        debug_assert!(sequence_number > self.last_sequence);
        self.last_sequence = sequence_number;
    }

    /// Check if account has sufficient funds for a transfer.
    pub fn has_sufficient_funds(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    pub(crate) fn debit(&mut self, amount: i64) {
        self.balance -= amount;
    }

    pub(crate) fn credit(&mut self, amount: i64) {
        self.balance += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account() {
        let account = ClientAccount::new(ClientId::new(1), 100);
        assert_eq!(account.last_sequence, 0);
        assert_eq!(account.balance, 100);
        assert!(account.is_next_sequence(1));
        assert!(!account.is_next_sequence(0));
        assert!(!account.is_next_sequence(2));
    }

    #[test]
    fn test_sequence_space_exhausted() {
        let mut account = ClientAccount::new(ClientId::new(1), 100);
        account.advance_sequence(u32::MAX);
        assert_eq!(account.expected_sequence(), None);
        assert!(!account.is_next_sequence(0));
    }

    #[test]
    fn test_funds_check() {
        let account = ClientAccount::new(ClientId::new(1), 70);
        assert!(account.has_sufficient_funds(70));
        assert!(!account.has_sufficient_funds(71));
    }
}
