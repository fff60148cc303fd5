//! Property-based tests for message header/E2E header round-tripping.

use bytes::Bytes;
use proptest::prelude::*;
use someip_wire::header::{Header, MessageType, PROTOCOL_VERSION};
use someip_wire::message::{E2eHeader, Message, WireConfig};

fn arb_header() -> impl Strategy<Value = Header> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        0u8..=0xFEu8,
    )
        .prop_map(|(service_id, method_id, client_id, session_id, interface_version)| Header {
            service_id,
            method_id,
            length: 8,
            client_id,
            session_id,
            protocol_version: PROTOCOL_VERSION,
            interface_version,
            message_type: MessageType::Notification,
            return_code: 0x00,
        })
}

proptest! {
    #[test]
    fn round_trip_without_e2e(header in arb_header(), payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let m = Message::new(header, None, Bytes::from(payload));
        let bytes = m.serialize();
        let back = Message::deserialize(&bytes).expect("valid message round-trips");
        prop_assert_eq!(back.header().service_id, m.header().service_id);
        prop_assert_eq!(back.header().method_id, m.header().method_id);
        prop_assert_eq!(back.payload().clone(), m.payload().clone());
        prop_assert_eq!(back.serialize().len(), 16 + m.payload().len());
    }

    #[test]
    fn round_trip_with_e2e_via_wire_config(
        header in arb_header(),
        payload in proptest::collection::vec(any::<u8>(), 0..2048),
        crc in any::<u32>(),
        counter in any::<u32>(),
        data_id in 1u16..=u16::MAX,
        freshness in any::<u16>(),
    ) {
        let e2e = E2eHeader { crc, counter, data_id, freshness };
        let m = Message::new(header, Some(e2e), Bytes::from(payload));
        let bytes = m.serialize();

        let mut config = WireConfig::new();
        config.set_e2e_presence(header.service_id, header.method_id, true);

        let back = Message::deserialize_with(&bytes, &config).expect("valid message round-trips");
        prop_assert_eq!(back.e2e_header().copied(), Some(e2e));
        prop_assert_eq!(back.serialize().len(), 16 + 12 + m.payload().len());
    }
}

#[test]
fn reject_short_buffer() {
    assert!(Message::deserialize(&[0u8; 4]).is_err());
}

#[test]
fn reject_invalid_protocol_version() {
    let header = Header {
        service_id: 1,
        method_id: 1,
        length: 8,
        client_id: 0,
        session_id: 0,
        protocol_version: 0x02,
        interface_version: 0x01,
        message_type: MessageType::Notification,
        return_code: 0,
    };
    let m = Message::new(header, None, Bytes::new());
    assert!(Message::deserialize(&m.serialize()).is_err());
}
