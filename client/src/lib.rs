//! ledgerd Client Library
//!
//! Client side of the ledgerd datagram protocol: discovery, sequenced transfers
//! and retransmission until the server acknowledges.

pub mod client;
pub mod config;
pub mod connection;

pub use client::{LedgerClient, TransferAck};
pub use config::ClientConfig;
