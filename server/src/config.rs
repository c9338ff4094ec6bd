//! Server configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use ledgerd_common::{constants, LedgerError, Result};

/// Transfer dispatch configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum transfers processed in parallel. The receive loop waits for a
    /// free slot before taking on another transfer.
    pub max_concurrent_transfers: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: constants::DEFAULT_MAX_CONCURRENT_TRANSFERS,
        }
    }
}

/// Stats observer configuration.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Interval between reports when the ledger is idle.
    pub report_interval: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            report_interval: constants::default_report_interval(),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Node ID used in logs.
    pub node_id: Option<String>,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Balance granted to each new account.
    pub initial_balance: i64,
    /// Dispatch configuration.
    pub dispatch: DispatchConfig,
    /// Observer configuration.
    pub observer: ObserverConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            listen_addr: "0.0.0.0".to_string(),
            listen_port: constants::DEFAULT_PORT,
            initial_balance: constants::DEFAULT_INITIAL_BALANCE,
            dispatch: DispatchConfig::default(),
            observer: ObserverConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("LEDGER_NODE_ID") {
            config.node_id = Some(id);
        }

        if let Ok(addr) = std::env::var("LEDGER_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(port) = std::env::var("LEDGER_LISTEN_PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Ok(balance) = std::env::var("LEDGER_INITIAL_BALANCE") {
            if let Ok(balance) = balance.parse() {
                config.initial_balance = balance;
            }
        }

        if let Ok(max) = std::env::var("LEDGER_MAX_CONCURRENT_TRANSFERS") {
            if let Ok(max) = max.parse() {
                config.dispatch.max_concurrent_transfers = max;
            }
        }

        if let Ok(secs) = std::env::var("LEDGER_REPORT_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.observer.report_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Address to bind the UDP socket to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_addr.parse().map_err(|_| {
            LedgerError::ConfigurationError(format!("Invalid listen address: {}", self.listen_addr))
        })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.listen_port == 0 {
            return Err(LedgerError::ConfigurationError(
                "Listen port cannot be 0".to_string(),
            ));
        }

        if self.initial_balance < 0 {
            return Err(LedgerError::ConfigurationError(
                "Initial balance cannot be negative".to_string(),
            ));
        }

        if self.initial_balance > constants::MAX_INITIAL_BALANCE {
            return Err(LedgerError::ConfigurationError(format!(
                "Initial balance cannot exceed {}",
                constants::MAX_INITIAL_BALANCE
            )));
        }

        if self.dispatch.max_concurrent_transfers == 0 {
            return Err(LedgerError::ConfigurationError(
                "Max concurrent transfers must be at least 1".to_string(),
            ));
        }

        if self.observer.report_interval.is_zero() {
            return Err(LedgerError::ConfigurationError(
                "Report interval cannot be zero".to_string(),
            ));
        }

        Ok(())
    }
}
