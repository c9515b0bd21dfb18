//! Implementations converting high-level SOME/IP structs into
//! network-encoded byte arrays

use thiserror::Error;
use zerocopy::network_endian::{U16, U32};
use zerocopy::AsBytes;

use crate::definitions::{
    Message, RawE2eHeader, RawHeader, E2E_HEADER_LENGTH, HEADER_LENGTH, LENGTH_TAIL,
    PROTOCOL_VERSION,
};

/// Errors that can occur while building a frame
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// The payload exceeds what the 32 bit length field can express
    #[error("Payload too large for the length field")]
    PayloadTooLarge,

    /// The E2E header slot does not fit the payload at the configured offset
    #[error("E2E header does not fit the payload at the configured offset")]
    E2eHeaderOutOfBounds,
}

impl Message {
    /// Build the network representation of this message
    ///
    /// The resulting buffer is exactly `16 + payload.len()` bytes, with the
    /// length field derived from the payload size.
    pub fn try_build(&self) -> Result<Vec<u8>, GeneratorError> {
        if self.payload.len() > (u32::MAX - LENGTH_TAIL) as usize {
            return Err(GeneratorError::PayloadTooLarge);
        }

        let header = RawHeader {
            service_id: U16::new(self.header.service_id),
            method_id: U16::new(self.header.method_id),
            length: U32::new(self.wire_length()),
            client_id: U16::new(self.header.client_id),
            session_id: U16::new(self.header.session_id),
            protocol_version: PROTOCOL_VERSION,
            interface_version: self.header.interface_version,
            message_type: self.header.message_type.as_u8(),
            return_code: self.header.return_code.as_u8(),
        };

        let mut frame = Vec::with_capacity(HEADER_LENGTH + self.payload.len());
        frame.extend_from_slice(header.as_bytes());
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }
}

/// Overwrite the E2E header slot inside a payload
///
/// The payload must already have room for the header at the given offset;
/// growing the payload is the job of the protection engine.
pub fn write_e2e_header(
    payload: &mut [u8],
    offset: usize,
    header: &RawE2eHeader,
) -> Result<(), GeneratorError> {
    if offset > payload.len() || payload.len() - offset < E2E_HEADER_LENGTH {
        return Err(GeneratorError::E2eHeaderOutOfBounds);
    }
    payload[offset..offset + E2E_HEADER_LENGTH].copy_from_slice(header.as_bytes());
    Ok(())
}
