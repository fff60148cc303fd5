//! Drives the full `someip-core` facade (E2E protection, TP segmentation,
//! reassembly, and SD dispatch) through [`SimEnv`] and [`SimTransport`]
//! instead of real sockets and real time.

use std::time::Duration;

use bytes::Bytes;
use someip_core::{Config, Inbound, Stack};
use someip_e2e::E2eConfig;
use someip_harness::{SimEnv, SimTransport};
use someip_sd::SdConfig;
use someip_tp::TpConfig;
use someip_wire::header::{Header, MessageType, PROTOCOL_VERSION};
use someip_wire::Message;

fn header(service_id: u16, method_id: u16, message_type: MessageType) -> Header {
    Header {
        service_id,
        method_id,
        length: 8,
        client_id: 0x0001,
        session_id: 0x0001,
        protocol_version: PROTOCOL_VERSION,
        interface_version: 1,
        message_type,
        return_code: 0,
    }
}

#[tokio::test]
async fn e2e_protected_message_round_trips_through_the_stack() {
    let mut config = Config::default();
    config.enable_e2e(0x1234, 0x0001, E2eConfig::new(0x00AB));
    let env = SimEnv::new(1);
    let transport = SimTransport::<u32>::new();
    let stack = Stack::new(env, config);

    let message = Message::new(header(0x1234, 0x0001, MessageType::Notification), None, Bytes::from_static(b"door open"));
    stack.send(&transport, &7u32, message).await.unwrap();

    let sent = transport.drain();
    assert_eq!(sent.len(), 1);

    match stack.receive(7u32, &sent[0].bytes).unwrap() {
        Some(Inbound::Message { message, .. }) => {
            assert_eq!(message.payload().as_ref(), b"door open");
        }
        other => panic!("expected a validated application message, got {other:?}"),
    }
}

#[tokio::test]
async fn oversized_message_is_segmented_and_reassembled() {
    let config = Config { tp: TpConfig { max_segment_size: 256, ..TpConfig::default() }, ..Config::default() };
    let env = SimEnv::new(2);
    let transport = SimTransport::<u32>::new();
    let stack = Stack::new(env, config);

    let payload = vec![0x7Eu8; 900];
    let message = Message::new(
        header(0x2000, 0x0002, MessageType::Notification),
        None,
        Bytes::from(payload.clone()),
    );
    stack.send(&transport, &3u32, message).await.unwrap();

    let sent = transport.drain();
    assert!(sent.len() > 1, "900 bytes at a 256-byte segment size must split into multiple datagrams");

    let mut reassembled = None;
    for datagram in &sent {
        if let Some(inbound) = stack.receive(3u32, &datagram.bytes).unwrap() {
            reassembled = Some(inbound);
        }
    }
    match reassembled.expect("the final segment completes reassembly") {
        Inbound::Message { message, .. } => assert_eq!(message.payload().to_vec(), payload),
        other => panic!("expected an application message, got {other:?}"),
    }
}

#[tokio::test]
async fn incomplete_segment_set_expires_after_the_configured_timeout() {
    let config = Config {
        tp: TpConfig { max_segment_size: 128, reassembly_timeout: Duration::from_millis(100), ..TpConfig::default() },
        ..Config::default()
    };
    let env = SimEnv::new(3);
    let transport = SimTransport::<u32>::new();
    let stack = Stack::new(env.clone(), config);

    let payload = vec![0x11u8; 500];
    let message = Message::new(header(0x2000, 0x0003, MessageType::Notification), None, Bytes::from(payload));
    stack.send(&transport, &9u32, message).await.unwrap();
    let sent = transport.drain();
    assert!(sent.len() > 1);

    assert!(stack.receive(9u32, &sent[0].bytes).unwrap().is_none());

    env.advance(Duration::from_millis(150));
    let expired = stack.expire_reassemblies();
    assert_eq!(expired.len(), 1);
}

#[tokio::test]
async fn service_discovery_datagrams_are_routed_as_service_discovery() {
    let config = Config { sd: SdConfig::default(), ..Config::default() };
    let env = SimEnv::new(4);
    let transport = SimTransport::<u32>::new();
    let stack = Stack::new(env, config);

    let sd = someip_sd::SdMessage {
        session_id: 1,
        reboot: false,
        unicast: true,
        entries: vec![someip_sd::SdEntry::Find {
            service_id: 0x1234,
            instance_id: 0xFFFF,
            major_version: 0xFF,
            ttl: 3,
            minor_version: 0xFFFF_FFFF,
            options: someip_sd::OptionRun::none(),
        }],
        options: vec![],
    };
    stack.send_sd(&transport, &sd).await.unwrap();
    let sent = transport.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].to.is_none(), "SD datagrams go out multicast");

    match stack.receive(5u32, &sent[0].bytes).unwrap() {
        Some(Inbound::ServiceDiscovery { sd: received, .. }) => {
            assert_eq!(received.entries.len(), 1);
        }
        other => panic!("expected a service discovery event, got {other:?}"),
    }
}
