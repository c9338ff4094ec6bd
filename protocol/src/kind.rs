//! Packet kind codes.

/// Packet kind, stored as a big-endian `u16` in the first two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PacketKind {
    /// Client registration handshake.
    Discovery = 1,
    /// Value transfer instruction.
    TransferRequest = 2,
    /// Server reply to a discovery.
    DiscoveryAck = 3,
    /// Server reply to a transfer request.
    TransferAck = 4,
}

impl PacketKind {
    /// Convert from the wire value. Unknown values yield `None`.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(PacketKind::Discovery),
            2 => Some(PacketKind::TransferRequest),
            3 => Some(PacketKind::DiscoveryAck),
            4 => Some(PacketKind::TransferAck),
            _ => None,
        }
    }

    /// Convert to the wire value.
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}
