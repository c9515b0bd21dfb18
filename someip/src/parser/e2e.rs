//! Parser for the end-to-end protection header

use zerocopy::FromBytes;

use crate::definitions::{RawE2eHeader, E2E_HEADER_LENGTH};
use crate::parser::errors::SomeipParseError;

/// Extract the E2E header embedded in a payload at the given byte offset
///
/// The header is not self describing; the offset comes from the E2E
/// configuration both peers agreed on.
pub fn parse_e2e_header(payload: &[u8], offset: usize) -> Result<RawE2eHeader, SomeipParseError> {
    if offset > payload.len() || payload.len() - offset < E2E_HEADER_LENGTH {
        return Err(SomeipParseError::E2eHeaderOutOfBounds);
    }

    RawE2eHeader::read_from_prefix(&payload[offset..]).ok_or(SomeipParseError::E2eHeaderOutOfBounds)
}
