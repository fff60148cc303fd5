//! Property-based tests for SD entry/option codec round-tripping.

use proptest::prelude::*;
use someip_sd::{OptionRun, SdEntry, SdMessage, SdOption};
use std::net::Ipv4Addr;

fn arb_option() -> impl Strategy<Value = SdOption> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>(), any::<u16>()).prop_map(
        |(a, b, c, d, port)| SdOption::Ipv4Endpoint {
            address: Ipv4Addr::new(a, b, c, d),
            proto: someip_sd::L4Proto::Udp,
            port,
        },
    )
}

proptest! {
    /// Every SD payload this implementation emits parses back to the same
    /// entries and options, and every option index an entry references
    /// stays within bounds of the parsed options array (§4.7, §8).
    #[test]
    fn sd_message_round_trips_with_valid_option_references(
        options in proptest::collection::vec(arb_option(), 1..4),
        index in 0u8..4,
        service_id in any::<u16>(),
        instance_id in any::<u16>(),
        major_version in any::<u8>(),
        ttl in 0u32..=0x00FF_FFFF,
        minor_version in any::<u32>(),
        session_id in any::<u16>(),
        reboot in any::<bool>(),
        unicast in any::<bool>(),
    ) {
        let index = index % options.len() as u8;
        let entries = vec![SdEntry::Offer {
            service_id,
            instance_id,
            major_version,
            ttl,
            minor_version,
            options: OptionRun::single(index),
        }];

        let sd = SdMessage { session_id, reboot, unicast, entries, options };
        let message = sd.to_message();
        let back = SdMessage::from_message(&message).expect("valid SD message round-trips");

        prop_assert_eq!(back.session_id, sd.session_id);
        prop_assert_eq!(back.reboot, sd.reboot);
        prop_assert_eq!(back.unicast, sd.unicast);
        prop_assert_eq!(&back.options, &sd.options);
        prop_assert_eq!(&back.entries, &sd.entries);

        for entry in &back.entries {
            for idx in entry.options().indices() {
                prop_assert!(idx < back.options.len());
            }
        }
    }
}
