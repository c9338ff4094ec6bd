//! ledgerd Common Types
//!
//! Shared types used across the ledgerd workspace: client identities, transfer
//! requests, the error taxonomy and time helpers.

pub mod identifiers;
pub mod transfer;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use transfer::*;
pub use error::*;
pub use time::*;
