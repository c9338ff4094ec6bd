//! ledgerd Ledger
//!
//! In-memory balance table with sequence-gated transfers, aggregate statistics
//! and a coalescing change signal for observers.

pub mod engine;
pub mod account;
pub mod stats;
pub mod signal;

pub use engine::{Ledger, Registration};
pub use account::ClientAccount;
pub use stats::{LedgerStats, StatsSnapshot};
pub use signal::{ChangeListener, LedgerSignal};
