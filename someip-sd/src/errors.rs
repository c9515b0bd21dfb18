//! The errors of the service discovery codec

use someip::primitives::DecodeError;
use thiserror::Error;

/// The errors that can occur while parsing a service discovery message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdParseError {
    /// The payload ended before a field was complete
    #[error("Buffer is too small to parse the payload")]
    BufferTooSmall,

    /// The entries array length is not a multiple of the entry size or
    /// exceeds the payload
    #[error("Entries array violates the framing invariants")]
    MalformedEntries,

    /// An option length contradicts the options array bounds
    #[error("Options array violates the framing invariants")]
    MalformedOptions,

    /// An entry references an option index past the end of the array
    #[error("Entry references option {index} but only {available} exist")]
    OptionIndexOutOfRange {
        /// First index the entry asked for
        index: usize,
        /// Number of options actually present
        available: usize,
    },

    /// The carrying SOME/IP frame does not satisfy the SD invariants
    #[error("Frame is not a well-formed service discovery message")]
    NotAnSdMessage,

    /// Too many options in one run to express in a 4 bit count
    #[error("Option run exceeds the 4 bit count limit")]
    TooManyOptions,

    /// Too many options overall to reference with 8 bit indices
    #[error("Options array exceeds the 8 bit index limit")]
    TooManyOptionsTotal,
}

impl From<DecodeError> for SdParseError {
    fn from(_value: DecodeError) -> Self {
        Self::BufferTooSmall
    }
}
