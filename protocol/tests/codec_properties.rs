//! Property tests for the packet codec.

use ledgerd_common::{ClientId, LedgerError};
use ledgerd_protocol::{Packet, PACKET_SIZE};
use proptest::prelude::*;

fn arb_packet() -> impl Strategy<Value = Packet> {
    prop_oneof![
        any::<u32>().prop_map(|sequence_number| Packet::Discovery { sequence_number }),
        (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(sequence_number, dest, amount)| {
            Packet::TransferRequest {
                sequence_number,
                destination: ClientId::new(dest),
                amount,
            }
        }),
        any::<u32>().prop_map(|sequence_number| Packet::DiscoveryAck { sequence_number }),
        (any::<u32>(), any::<u32>()).prop_map(|(sequence_number, balance)| Packet::TransferAck {
            sequence_number,
            balance
        }),
    ]
}

proptest! {
    #[test]
    fn prop_encode_decode_identity(packet in arb_packet()) {
        let bytes = packet.encode();
        prop_assert_eq!(bytes.len(), PACKET_SIZE);
        prop_assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        match Packet::decode(&bytes) {
            Ok(packet) => {
                prop_assert_eq!(bytes.len(), PACKET_SIZE);
                prop_assert_eq!(packet.encode()[4..8].to_vec(), bytes[4..8].to_vec());
            }
            Err(LedgerError::MalformedPacket { actual, .. }) => {
                prop_assert_ne!(actual, PACKET_SIZE);
            }
            Err(LedgerError::UnknownPacketKind(kind)) => {
                prop_assert!(kind == 0 || kind > 4);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}
