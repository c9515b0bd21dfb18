use proptest::prelude::*;

use crate::definitions::{Header, Message, MessageType, ReturnCode, SD_METHOD_ID, SD_SERVICE_ID};
use crate::parser::{parse_frames, parse_header, parse_message, SomeipParseError};

fn minimal_message() -> Message {
    Message {
        header: Header {
            service_id: 0x1234,
            method_id: 0x5678,
            client_id: 0x9ABC,
            session_id: 0x0001,
            interface_version: 0x01,
            message_type: MessageType::Request,
            return_code: ReturnCode::Ok,
        },
        payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
    }
}

#[test]
#[allow(clippy::unwrap_used)]
fn generate_minimal_message() {
    let frame = minimal_message().try_build().unwrap();
    assert_eq!(frame.len(), 20);
    assert_eq!(
        frame,
        vec![
            0x12, 0x34, 0x56, 0x78, // message ID
            0x00, 0x00, 0x00, 0x0C, // length
            0x9A, 0xBC, 0x00, 0x01, // request ID
            0x01, // protocol version
            0x01, // interface version
            0x00, // message type
            0x00, // return code
            0xDE, 0xAD, 0xBE, 0xEF, // payload
        ]
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn generate_and_parse_minimal_message() {
    let message = minimal_message();
    let frame = message.try_build().unwrap();
    let parsed = parse_message(&frame).unwrap();
    assert_eq!(message, parsed);
    assert_eq!(parsed.header.message_id(), 0x1234_5678);
    assert_eq!(parsed.header.request_id(), 0x9ABC_0001);
}

#[test]
#[allow(clippy::unwrap_used)]
fn header_only_parse_skips_the_length_check() {
    let mut frame = minimal_message().try_build().unwrap();
    // a header-only parse tolerates a length field pointing past the buffer
    frame[4..8].copy_from_slice(&0xFFFFu32.to_be_bytes());
    let header = parse_header(&frame).unwrap();
    assert_eq!(header, minimal_message().header);
}

#[test]
fn id_helpers() {
    let mut header = minimal_message().header;
    assert!(!header.is_event());
    assert!(!header.is_sd());

    header.method_id = 0x8042;
    assert!(header.is_event());

    header.service_id = SD_SERVICE_ID;
    header.method_id = SD_METHOD_ID;
    assert!(header.is_sd());
}

#[test]
fn parse_rejects_short_buffer() {
    assert_eq!(
        parse_message(&[0x00; 15]),
        Err(SomeipParseError::BufferTooSmall)
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn parse_rejects_undersized_length() {
    let mut frame = minimal_message().try_build().unwrap();
    // length field below the 8 byte minimum
    frame[4..8].copy_from_slice(&7u32.to_be_bytes());
    assert_eq!(parse_message(&frame), Err(SomeipParseError::MalformedLength));
}

#[test]
#[allow(clippy::unwrap_used)]
fn parse_rejects_length_beyond_buffer() {
    let mut frame = minimal_message().try_build().unwrap();
    frame[4..8].copy_from_slice(&13u32.to_be_bytes());
    assert_eq!(parse_message(&frame), Err(SomeipParseError::MalformedLength));
}

#[test]
#[allow(clippy::unwrap_used)]
fn parse_rejects_wrong_protocol_version() {
    let mut frame = minimal_message().try_build().unwrap();
    frame[12] = 0x02;
    assert_eq!(
        parse_message(&frame),
        Err(SomeipParseError::WrongProtocolVersion(0x02))
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn parse_preserves_unassigned_values() {
    let mut frame = minimal_message().try_build().unwrap();
    frame[14] = 0x42; // message type
    frame[15] = 0xA5; // return code
    let parsed = parse_message(&frame).unwrap();
    assert_eq!(parsed.header.message_type, MessageType::Other(0x42));
    assert_eq!(parsed.header.return_code, ReturnCode::Other(0xA5));
    // and the values survive a rebuild untouched
    let rebuilt = parsed.try_build().unwrap();
    assert_eq!(rebuilt, frame);
}

#[test]
#[allow(clippy::unwrap_used)]
fn frame_iterator_walks_concatenated_frames() {
    let first = minimal_message();
    let mut second = minimal_message();
    second.header.session_id = 0x0002;
    second.payload = vec![];

    let mut buffer = first.try_build().unwrap();
    buffer.extend(second.try_build().unwrap());

    let frames: Vec<_> = parse_frames(&buffer).collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].as_ref().unwrap(), &first);
    assert_eq!(frames[1].as_ref().unwrap(), &second);
}

#[test]
#[allow(clippy::unwrap_used)]
fn frame_iterator_stops_after_error() {
    let mut buffer = minimal_message().try_build().unwrap();
    buffer.extend([0xFF; 3]);

    let mut iterator = parse_frames(&buffer);
    assert!(iterator.next().unwrap().is_ok());
    assert_eq!(
        iterator.next().unwrap(),
        Err(SomeipParseError::BufferTooSmall)
    );
    assert!(iterator.next().is_none());
}

prop_compose! {
    fn header_any()(
        service_id in any::<u16>(),
        method_id in any::<u16>(),
        client_id in any::<u16>(),
        session_id in any::<u16>(),
        interface_version in any::<u8>(),
        message_type in any::<u8>(),
        return_code in any::<u8>(),
    ) -> Header {
        Header {
            service_id,
            method_id,
            client_id,
            session_id,
            interface_version,
            message_type: MessageType::from_u8(message_type),
            return_code: ReturnCode::from_u8(return_code),
        }
    }
}

proptest! {
    #[test]
    #[allow(clippy::unwrap_used)]
    fn message_round_trip(
        header in header_any(),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let message = Message { header, payload };
        let frame = message.try_build().unwrap();
        prop_assert_eq!(frame.len(), 16 + message.payload.len());
        let parsed = parse_message(&frame).unwrap();
        prop_assert_eq!(message, parsed);
    }
}
