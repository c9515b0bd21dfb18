//! The errors of the parsers

use thiserror::Error;

/// The errors that can occur while parsing a SOME/IP frame
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum SomeipParseError {
    /// The buffer cannot hold a fixed header; maps to INVALID_ARGUMENT
    /// since no framing decision can be made at all
    #[error("Buffer is too small to parse the header")]
    BufferTooSmall,

    /// The length field is below 8 or larger than the remaining buffer
    #[error("Length field violates the framing invariants")]
    MalformedLength,

    /// The frame speaks a protocol version other than 0x01
    #[error("Unsupported protocol version {0:#04x}")]
    WrongProtocolVersion(u8),

    /// A frame flagged as TP segment is too short to hold the TP header
    #[error("TP segment is too short to hold the TP header")]
    TruncatedTpSegment,

    /// The configured E2E header offset points outside the payload
    #[error("E2E header does not fit the payload at the configured offset")]
    E2eHeaderOutOfBounds,
}
