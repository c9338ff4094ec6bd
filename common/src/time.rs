//! Time utilities and protocol constants for ledgerd.

use chrono::{DateTime, Local};

/// Protocol defaults.
pub mod constants {
    use std::time::Duration;

    /// Default UDP listen port.
    pub const DEFAULT_PORT: u16 = 4000;

    /// Balance granted to every newly created account.
    pub const DEFAULT_INITIAL_BALANCE: i64 = 100;

    /// Largest grant the ledger accepts.
    ///
    /// Client identities are 32 bits, so at most 2^32 accounts exist. Keeping
    /// each grant below 2^31 bounds the sum of all balances below `i64::MAX`.
    pub const MAX_INITIAL_BALANCE: i64 = i64::MAX >> 32;

    /// Default cap on transfers processed in parallel.
    pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: u32 = 1024;

    /// Default interval between unsolicited stats reports.
    pub fn default_report_interval() -> Duration {
        Duration::from_secs(10)
    }

    /// Default client wait before retransmitting a request.
    pub fn default_ack_timeout() -> Duration {
        Duration::from_millis(250)
    }

    /// Default number of client send attempts per request.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
}

/// Local wall-clock timestamp used on the console surface.
pub type Timestamp = DateTime<Local>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Local::now()
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
