//! Client configuration.

use std::net::SocketAddr;
use std::time::Duration;

use ledgerd_common::{constants, LedgerError, Result};

/// Configuration for the ledger client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, `host:port`.
    pub server_addr: String,
    /// Local address to bind; port 0 picks an ephemeral port.
    pub bind_addr: String,
    /// How long to wait for an acknowledgment before retransmitting.
    pub ack_timeout: Duration,
    /// Transmissions per request, including the first.
    pub max_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", constants::DEFAULT_PORT),
            bind_addr: "0.0.0.0:0".to_string(),
            ack_timeout: constants::default_ack_timeout(),
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    /// Configuration for a server at `server_addr`, other settings default.
    pub fn for_server(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("LEDGER_SERVER_ADDR") {
            config.server_addr = addr;
        }

        if let Ok(addr) = std::env::var("LEDGER_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(ms) = std::env::var("LEDGER_ACK_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.ack_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(attempts) = std::env::var("LEDGER_MAX_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                config.max_attempts = attempts;
            }
        }

        config
    }

    /// Parsed server address.
    ///
    /// The server identifies clients by IPv4 address, so only IPv4 servers are
    /// reachable.
    pub fn server_socket_addr(&self) -> Result<SocketAddr> {
        let addr: SocketAddr = self.server_addr.parse().map_err(|_| {
            LedgerError::ConfigurationError(format!("Invalid server address: {}", self.server_addr))
        })?;

        if !addr.is_ipv4() {
            return Err(LedgerError::UnsupportedAddress(addr.to_string()));
        }
        Ok(addr)
    }

    /// Parsed local bind address.
    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|_| {
            LedgerError::ConfigurationError(format!("Invalid bind address: {}", self.bind_addr))
        })
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.server_socket_addr()?;
        self.bind_socket_addr()?;

        if self.ack_timeout.is_zero() {
            return Err(LedgerError::ConfigurationError(
                "Ack timeout cannot be zero".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(LedgerError::ConfigurationError(
                "Max attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
