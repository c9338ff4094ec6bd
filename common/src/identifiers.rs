//! Identifier types for ledgerd clients.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Identity of a ledger client.
///
/// Clients are keyed by the IPv4 address they send from, so every socket on a
/// host shares one account. The same 32-bit value travels on the wire as the
/// destination of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u32);

impl ClientId {
    /// Create a client ID from its raw wire value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Derive the identity of a datagram sender.
    ///
    /// IPv4-mapped IPv6 senders resolve to their IPv4 address. Other IPv6
    /// senders have no identity.
    pub fn from_socket_addr(addr: &SocketAddr) -> Option<Self> {
        match addr.ip() {
            IpAddr::V4(ip) => Some(Self::from(ip)),
            IpAddr::V6(ip) => ip.to_ipv4_mapped().map(Self::from),
        }
    }

    /// Get the raw wire value.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Get the identity as an IPv4 address.
    pub fn to_ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ipv4())
    }
}

impl From<Ipv4Addr> for ClientId {
    fn from(ip: Ipv4Addr) -> Self {
        Self(u32::from(ip))
    }
}

impl From<u32> for ClientId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
