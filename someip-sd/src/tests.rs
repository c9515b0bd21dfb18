use std::net::Ipv4Addr;

use proptest::prelude::*;

use crate::definitions::{Entry, EntryKind, L4Protocol, SdMessage, SdOption};
use crate::errors::SdParseError;
use crate::generator::{build_sd_frame, build_sd_payload};
use crate::parser::{parse_sd_message, parse_sd_payload};

fn udp_endpoint(address: [u8; 4], port: u16) -> SdOption {
    SdOption::Ipv4Endpoint {
        address: Ipv4Addr::from(address),
        protocol: L4Protocol::Udp,
        port,
    }
}

#[test]
#[allow(clippy::unwrap_used)]
fn generate_offer_with_endpoint() {
    let message = SdMessage {
        reboot: false,
        unicast: true,
        entries: vec![Entry::offer(
            0x0100,
            0x0001,
            1,
            0,
            3,
            vec![udp_endpoint([192, 168, 1, 10], 30500)],
        )],
    };

    let payload = build_sd_payload(&message).unwrap();
    assert_eq!(
        payload,
        vec![
            0x40, 0x00, 0x00, 0x00, // flags, reserved
            0x00, 0x00, 0x00, 0x10, // entries length
            0x01, 0x00, 0x00, 0x10, // OfferService, indices, 1 option in run 1
            0x01, 0x00, 0x00, 0x01, // service, instance
            0x01, 0x00, 0x00, 0x03, // major, ttl
            0x00, 0x00, 0x00, 0x00, // minor
            0x00, 0x00, 0x00, 0x0C, // options length
            0x00, 0x09, 0x04, // option header: 9 bytes, IPv4 endpoint
            0x00, 0xC0, 0xA8, 0x01, 0x0A, // reserved, 192.168.1.10
            0x00, 0x11, // reserved, UDP
            0x77, 0x24, // port 30500
        ]
    );

    let parsed = parse_sd_payload(&payload).unwrap();
    assert_eq!(parsed, message);
}

#[test]
#[allow(clippy::unwrap_used)]
fn generate_and_parse_find() {
    let message = SdMessage {
        reboot: false,
        unicast: true,
        entries: vec![Entry::find(0x0100, 0xFFFF, 1, 0xFF_FFFF)],
    };
    let payload = build_sd_payload(&message).unwrap();
    let parsed = parse_sd_payload(&payload).unwrap();
    assert_eq!(parsed.entries[0].kind, EntryKind::FindService);
    assert_eq!(parsed.entries[0].ttl, 0xFF_FFFF);
    assert_eq!(parsed.entries[0].minor_version, 0xFFFF_FFFF);
    assert!(parsed.entries[0].options1.is_empty());
}

#[test]
#[allow(clippy::unwrap_used)]
fn options_are_deduplicated() {
    let endpoint = udp_endpoint([10, 0, 0, 1], 30509);
    let message = SdMessage {
        reboot: false,
        unicast: true,
        entries: vec![
            Entry::offer(0x1111, 1, 1, 0, 30, vec![endpoint.clone()]),
            Entry::offer(0x2222, 1, 1, 0, 30, vec![endpoint.clone()]),
        ],
    };

    let payload = build_sd_payload(&message).unwrap();
    // 8 byte preamble + 32 bytes of entries + 4 byte options length + a
    // single 12 byte option
    assert_eq!(payload.len(), 8 + 32 + 4 + 12);

    // both entries still resolve to the shared option
    let parsed = parse_sd_payload(&payload).unwrap();
    assert_eq!(parsed, message);
}

#[test]
#[allow(clippy::unwrap_used)]
fn distinct_options_are_kept_apart() {
    let message = SdMessage {
        reboot: false,
        unicast: true,
        entries: vec![
            Entry::offer(0x1111, 1, 1, 0, 30, vec![udp_endpoint([10, 0, 0, 1], 1)]),
            Entry::offer(0x2222, 1, 1, 0, 30, vec![udp_endpoint([10, 0, 0, 2], 2)]),
        ],
    };
    let payload = build_sd_payload(&message).unwrap();
    assert_eq!(payload.len(), 8 + 32 + 4 + 24);
    assert_eq!(parse_sd_payload(&payload).unwrap(), message);
}

#[test]
#[allow(clippy::unwrap_used)]
fn subscribe_and_ack_round_trip() {
    let subscribe = Entry::subscribe(
        0x0100,
        0x0001,
        1,
        0x0001,
        300,
        vec![udp_endpoint([192, 168, 1, 20], 40000)],
    );
    let ack = Entry::subscribe_ack(&subscribe, 300);
    let nack = Entry::subscribe_ack(&subscribe, 0);
    assert!(!ack.is_subscribe_nack());
    assert!(nack.is_subscribe_nack());

    let message = SdMessage {
        reboot: true,
        unicast: true,
        entries: vec![subscribe, ack],
    };
    let payload = build_sd_payload(&message).unwrap();
    let parsed = parse_sd_payload(&payload).unwrap();
    assert_eq!(parsed, message);
    assert!(parsed.reboot);
    assert_eq!(parsed.entries[0].eventgroup_id, 0x0001);
    assert_eq!(parsed.entries[0].minor_version, 0);
}

#[test]
#[allow(clippy::unwrap_used)]
fn unknown_options_survive_round_trips() {
    let message = SdMessage {
        reboot: false,
        unicast: false,
        entries: vec![Entry::offer(
            0x0100,
            1,
            1,
            0,
            30,
            vec![
                SdOption::Unknown {
                    option_type: 0x42,
                    body: vec![0x13, 0x37],
                },
                SdOption::Configuration(vec![0x05, b'a', b'b', b'c', b'=', b'1', 0x00]),
            ],
        )],
    };
    let payload = build_sd_payload(&message).unwrap();
    assert_eq!(parse_sd_payload(&payload).unwrap(), message);
}

#[test]
#[allow(clippy::unwrap_used)]
fn sd_frame_invariants_are_checked() {
    let message = SdMessage {
        reboot: false,
        unicast: true,
        entries: vec![],
    };
    let mut frame = build_sd_frame(&message, 0x0001).unwrap();
    assert!(parse_sd_message(&frame).is_ok());

    frame.header.client_id = 0x1234;
    assert_eq!(
        parse_sd_message(&frame),
        Err(SdParseError::NotAnSdMessage)
    );
}

#[test]
fn truncated_payload_is_rejected() {
    assert_eq!(
        parse_sd_payload(&[0x40, 0x00, 0x00]),
        Err(SdParseError::BufferTooSmall)
    );

    // entries length larger than the buffer
    let payload = [0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20];
    assert_eq!(
        parse_sd_payload(&payload),
        Err(SdParseError::MalformedEntries)
    );
}

prop_compose! {
    fn entry_any()(
        kind in prop::sample::select(vec![
            EntryKind::FindService,
            EntryKind::OfferService,
            EntryKind::SubscribeEventgroup,
            EntryKind::SubscribeEventgroupAck,
        ]),
        service_id in any::<u16>(),
        instance_id in any::<u16>(),
        major_version in any::<u8>(),
        ttl in 0u32..=0xFF_FFFF,
        last in any::<u32>(),
        endpoint in prop::option::of((any::<[u8; 4]>(), any::<u16>())),
    ) -> Entry {
        let eventgroup = kind.is_eventgroup_entry();
        Entry {
            kind,
            service_id,
            instance_id,
            major_version,
            ttl,
            minor_version: if eventgroup { 0 } else { last },
            eventgroup_id: if eventgroup { last as u16 } else { 0 },
            options1: endpoint
                .map(|(address, port)| vec![udp_endpoint(address, port)])
                .unwrap_or_default(),
            options2: vec![],
        }
    }
}

proptest! {
    #[test]
    #[allow(clippy::unwrap_used)]
    fn sd_payload_round_trip(
        reboot in any::<bool>(),
        unicast in any::<bool>(),
        entries in proptest::collection::vec(entry_any(), 0..8),
    ) {
        let message = SdMessage { reboot, unicast, entries };
        let payload = build_sd_payload(&message).unwrap();
        let parsed = parse_sd_payload(&payload).unwrap();
        // deduplication on the wire never loses an association
        prop_assert_eq!(parsed, message);
    }
}

#[test]
#[allow(clippy::unwrap_used)]
fn dangling_option_index_is_rejected() {
    let message = SdMessage {
        reboot: false,
        unicast: true,
        entries: vec![Entry::offer(
            0x0100,
            1,
            1,
            0,
            30,
            vec![udp_endpoint([10, 0, 0, 1], 1)],
        )],
    };
    let mut payload = build_sd_payload(&message).unwrap();
    // point the entry at option 5 of a single-option array
    payload[9] = 5;
    assert_eq!(
        parse_sd_payload(&payload),
        Err(SdParseError::OptionIndexOutOfRange {
            index: 5,
            available: 1,
        })
    );
}
