//! Module containing network level header structs for pieces of the protocol

use zerocopy::network_endian::{U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

use super::params::{TP_OFFSET_UNIT, TP_RESERVED_MASK};

/// Protocol header of a SOME/IP message
///
/// Every SOME/IP frame starts with this fixed 16 byte header, independent of
/// whether it carries an RPC call, an event notification, a TP segment or a
/// service discovery payload.
///
/// ```text
///                          1                   2                   3
///      0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |          Service ID           |       Method / Event ID       |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                            Length                             |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |           Client ID           |          Session ID           |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     | Protocol Vers | Interface Vers| Message Type  |  Return Code  |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                                                               |
///     ~                        Payload (variable)                     ~
///     |                                                               |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The payload is not part of the header and thus not included in the struct.
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct RawHeader {
    /// Identifier of the service this message belongs to
    pub service_id: U16,
    /// Identifier of the method or event within the service; the top bit is
    /// set for events and cleared for methods
    pub method_id: U16,
    /// Number of bytes covered by this frame counted from the Client ID field
    /// through the end of the payload, i.e. `8 + payload length`; the
    /// Message ID and Length fields themselves are not counted
    pub length: U32,
    /// Identifier of the calling client, unique within the sending ECU
    pub client_id: U16,
    /// Session identifier distinguishing in-flight calls of the same client;
    /// 0 is reserved for "no session"
    pub session_id: U16,
    /// Version of the SOME/IP header format, must be 0x01
    pub protocol_version: u8,
    /// Major version of the service interface the sender talks to
    pub interface_version: u8,
    /// Kind of the message, see the MessageType values; bit 0x20 marks a
    /// TP segment
    pub message_type: u8,
    /// Result of the operation for responses, E_OK for requests
    pub return_code: u8,
}

/// Protocol header of a TP segment
///
/// When a SOME/IP message exceeds the UDP segment limit it is split into
/// segments. Each segment is a complete SOME/IP frame whose message type
/// carries the TP flag and whose payload starts with this 4 byte header.
///
/// ```text
///                          1                   2                   3
///      0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |               Offset (28 bit)                         |R R R|M|
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                                                               |
///     ~                     Segment payload (variable)                ~
///     |                                                               |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The offset is expressed in units of 16 bytes, so the byte offset of the
/// segment within the original payload is `offset * 16`. The R bits are
/// reserved, sent as zero and ignored on receipt. M is the "more segments"
/// flag which is cleared on the final segment only.
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct RawTpHeader {
    /// Combined offset, reserved bits and more flag
    pub offset_and_flags: U32,
}

impl RawTpHeader {
    /// Build the combined field from a byte offset and the more flag
    ///
    /// The byte offset must be a multiple of 16, the caller is responsible
    /// for only passing aligned values.
    pub fn new(byte_offset: u32, more_segments: bool) -> Self {
        let units = byte_offset / TP_OFFSET_UNIT;
        Self {
            offset_and_flags: U32::new(units << 4 | u32::from(more_segments)),
        }
    }

    /// Byte offset of this segment inside the original payload
    pub fn byte_offset(&self) -> u32 {
        (self.offset_and_flags.get() >> 4) * TP_OFFSET_UNIT
    }

    /// Whether further segments follow this one
    pub fn more_segments(&self) -> bool {
        self.offset_and_flags.get() & 1 == 1
    }

    /// Value of the reserved bits, only relevant for diagnostics
    pub fn reserved_bits(&self) -> u32 {
        (self.offset_and_flags.get() & TP_RESERVED_MASK) >> 1
    }
}

/// Protocol header of the end-to-end protection data
///
/// The E2E header is not self describing on the wire: both peers must agree
/// out of band that a given message id carries one and at which byte offset
/// inside the payload it lives.
///
/// ```text
///                          1                   2                   3
///      0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                              CRC                              |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                            Counter                            |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |            Data ID            |        Freshness Value        |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, PartialEq, Eq, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct RawE2eHeader {
    /// Checksum over the protected region, computed with this field zeroed
    pub crc: U32,
    /// Monotonic counter used for replay detection, wraps at a configured
    /// maximum
    pub counter: U32,
    /// Identifier of the protected data stream
    pub data_id: U16,
    /// Monotonic tick used for staleness detection
    pub freshness_value: U16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes() {
        assert_eq!(size_of::<RawHeader>(), 16);
        assert_eq!(size_of::<RawTpHeader>(), 4);
        assert_eq!(size_of::<RawE2eHeader>(), 12);
    }

    #[test]
    fn tp_header_offset_units() {
        let tp = RawTpHeader::new(3000 - 952, true);
        assert_eq!(tp.byte_offset(), 2048);
        assert!(tp.more_segments());
        assert_eq!(tp.reserved_bits(), 0);

        let last = RawTpHeader::new(0, false);
        assert_eq!(last.byte_offset(), 0);
        assert!(!last.more_segments());
    }

    #[test]
    fn tp_header_wire_encoding() {
        // offset 1024 bytes = 64 units, more = 1
        let tp = RawTpHeader::new(1024, true);
        assert_eq!(tp.as_bytes(), &[0x00, 0x00, 0x04, 0x01]);
    }
}
