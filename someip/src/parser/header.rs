//! Parsers of the header

use zerocopy::FromBytes;

use crate::definitions::{Header, MessageType, RawHeader, PROTOCOL_VERSION};
use crate::parser::errors::SomeipParseError;

/// Parse the fixed header, without validating the length field
///
/// Unassigned message type and return code values are preserved in the
/// result so the caller can decide how to treat them.
pub fn parse_header(buf: &[u8]) -> Result<Header, SomeipParseError> {
    let header = RawHeader::ref_from_prefix(buf).ok_or(SomeipParseError::BufferTooSmall)?;

    if header.protocol_version != PROTOCOL_VERSION {
        return Err(SomeipParseError::WrongProtocolVersion(
            header.protocol_version,
        ));
    }

    if !MessageType::from_u8(header.message_type).is_known() {
        log::warn!(
            "Unassigned message type {:#04x} in frame {:#06x}/{:#06x}",
            header.message_type,
            header.service_id.get(),
            header.method_id.get(),
        );
    }

    Ok(Header::from(header))
}
