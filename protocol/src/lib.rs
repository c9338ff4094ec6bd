//! ledgerd Wire Protocol
//!
//! Fixed-size binary packets exchanged between ledger clients and the server.
//! Every datagram carries exactly one [`Packet`] of [`PACKET_SIZE`] bytes.

pub mod kind;
pub mod packet;

pub use kind::PacketKind;
pub use packet::{Packet, PACKET_SIZE};
