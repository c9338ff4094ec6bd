//! Packet layout and codec.
//!
//! ```text
//! offset  width  field
//!      0      2  kind (PacketKind)
//!      2      2  reserved, zero
//!      4      4  sequence_number
//!      8      4  TransferRequest: destination | TransferAck: balance
//!     12      4  TransferRequest: amount
//! ```
//!
//! All integers are big-endian. Payload bytes a kind does not use are written as
//! zero and ignored on decode, as are the reserved bytes.

use ledgerd_common::{ClientId, LedgerError, Result};

use crate::PacketKind;

/// Size of every encoded packet.
pub const PACKET_SIZE: usize = 16;

/// A decoded wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Registration request. The sequence number is a correlation token only.
    Discovery { sequence_number: u32 },
    /// Transfer from the sending client to `destination`.
    TransferRequest {
        sequence_number: u32,
        destination: ClientId,
        amount: u32,
    },
    /// Reply to `Discovery`, echoing its sequence number.
    DiscoveryAck { sequence_number: u32 },
    /// Reply to `TransferRequest` with the authoritative sequence and balance.
    TransferAck { sequence_number: u32, balance: u32 },
}

impl Packet {
    /// Packet kind.
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Discovery { .. } => PacketKind::Discovery,
            Packet::TransferRequest { .. } => PacketKind::TransferRequest,
            Packet::DiscoveryAck { .. } => PacketKind::DiscoveryAck,
            Packet::TransferAck { .. } => PacketKind::TransferAck,
        }
    }

    /// Sequence number carried by any kind.
    pub fn sequence_number(&self) -> u32 {
        match *self {
            Packet::Discovery { sequence_number }
            | Packet::TransferRequest { sequence_number, .. }
            | Packet::DiscoveryAck { sequence_number }
            | Packet::TransferAck { sequence_number, .. } => sequence_number,
        }
    }

    /// Build a transfer acknowledgment from a signed ledger balance.
    ///
    /// The wire field is unsigned 32-bit; larger balances saturate.
    pub fn transfer_ack(sequence_number: u32, balance: i64) -> Self {
        let balance = u32::try_from(balance.max(0)).unwrap_or(u32::MAX);
        Packet::TransferAck {
            sequence_number,
            balance,
        }
    }

    /// Encode into the fixed-size wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0..2].copy_from_slice(&self.kind().to_u16().to_be_bytes());
        buf[4..8].copy_from_slice(&self.sequence_number().to_be_bytes());

        match *self {
            Packet::TransferRequest {
                destination,
                amount,
                ..
            } => {
                buf[8..12].copy_from_slice(&destination.as_u32().to_be_bytes());
                buf[12..16].copy_from_slice(&amount.to_be_bytes());
            }
            Packet::TransferAck { balance, .. } => {
                buf[8..12].copy_from_slice(&balance.to_be_bytes());
            }
            Packet::Discovery { .. } | Packet::DiscoveryAck { .. } => {}
        }

        buf
    }

    /// Decode one datagram.
    ///
    /// # Errors
    ///
    /// - `MalformedPacket` if the datagram is not exactly [`PACKET_SIZE`] bytes.
    /// - `UnknownPacketKind` if the kind field holds an undefined value.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let buf: &[u8; PACKET_SIZE] = bytes.try_into().map_err(|_| LedgerError::MalformedPacket {
            expected: PACKET_SIZE,
            actual: bytes.len(),
        })?;

        let raw_kind = u16::from_be_bytes([buf[0], buf[1]]);
        let kind = PacketKind::from_u16(raw_kind).ok_or(LedgerError::UnknownPacketKind(raw_kind))?;
        let sequence_number = read_u32(buf, 4);

        let packet = match kind {
            PacketKind::Discovery => Packet::Discovery { sequence_number },
            PacketKind::TransferRequest => Packet::TransferRequest {
                sequence_number,
                destination: ClientId::new(read_u32(buf, 8)),
                amount: read_u32(buf, 12),
            },
            PacketKind::DiscoveryAck => Packet::DiscoveryAck { sequence_number },
            PacketKind::TransferAck => Packet::TransferAck {
                sequence_number,
                balance: read_u32(buf, 8),
            },
        };

        Ok(packet)
    }
}

fn read_u32(buf: &[u8; PACKET_SIZE], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
