//! Parser for the TP segment header

use zerocopy::FromBytes;

use crate::definitions::{Message, RawTpHeader, TP_HEADER_LENGTH};
use crate::parser::errors::SomeipParseError;

/// The TP header and segment data carried by one TP frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpSegment<'a> {
    /// Byte offset of the segment data inside the original payload
    pub byte_offset: u32,
    /// Whether further segments follow
    pub more_segments: bool,
    /// The slice of the original payload carried by this frame
    pub data: &'a [u8],
}

/// Split the payload of a TP frame into its TP header and segment data
///
/// The reserved bits of the TP header are ignored. The caller is expected to
/// have checked the TP flag of the message type; the function only validates
/// that the payload can hold the TP header.
pub fn parse_tp_segment(message: &Message) -> Result<TpSegment<'_>, SomeipParseError> {
    let header = RawTpHeader::ref_from_prefix(&message.payload)
        .ok_or(SomeipParseError::TruncatedTpSegment)?;

    Ok(TpSegment {
        byte_offset: header.byte_offset(),
        more_segments: header.more_segments(),
        data: &message.payload[TP_HEADER_LENGTH..],
    })
}
