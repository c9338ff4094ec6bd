//! ledgerd Server
//!
//! A datagram ledger: clients discover themselves to the server, then send
//! sequenced transfer requests against a shared account table. Every request is
//! acknowledged with the authoritative sequence number and balance, so a client
//! can safely retransmit until it hears back.

pub mod config;
pub mod metrics;
pub mod observer;
pub mod registration;
pub mod server;
pub mod state;
pub mod transfer;
pub mod transport;

pub use config::ServerConfig;
pub use server::LedgerServer;
pub use transport::UdpTransport;
