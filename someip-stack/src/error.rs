//! The uniform result enumeration of the stack

use someip::parser::SomeipParseError;
use someip::primitives::DecodeError;
use someip_sd::SdParseError;
use thiserror::Error;

/// The error kinds every fallible stack operation reports
///
/// Codec errors are never retried; reassembly errors discard the affected
/// context and are surfaced exactly once.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The caller supplied nonsensical input, or a replay was detected
    #[error("Invalid argument")]
    InvalidArgument,

    /// A required subsystem has not been set up yet
    #[error("Subsystem is not initialized")]
    NotInitialized,

    /// Wire bytes violate the format invariants
    #[error("Malformed message")]
    MalformedMessage,

    /// The peer speaks an unsupported protocol version
    #[error("Wrong protocol version")]
    WrongProtocolVersion,

    /// The peer speaks an unexpected interface version
    #[error("Wrong interface version")]
    WrongInterfaceVersion,

    /// A reassembly deadline was hit or an E2E freshness check failed
    #[error("Timeout")]
    Timeout,

    /// The transport failed to deliver
    #[error("Peer is not reachable")]
    NotReachable,

    /// The addressed service exists but is not ready
    #[error("Service is not ready")]
    NotReady,

    /// The addressed service is unknown
    #[error("Unknown service")]
    UnknownService,

    /// The addressed method is unknown
    #[error("Unknown method")]
    UnknownMethod,
}

impl From<SomeipParseError> for StackError {
    fn from(value: SomeipParseError) -> Self {
        match value {
            SomeipParseError::BufferTooSmall => StackError::InvalidArgument,
            SomeipParseError::WrongProtocolVersion(_) => StackError::WrongProtocolVersion,
            SomeipParseError::MalformedLength
            | SomeipParseError::TruncatedTpSegment
            | SomeipParseError::E2eHeaderOutOfBounds => StackError::MalformedMessage,
        }
    }
}

impl From<DecodeError> for StackError {
    fn from(_value: DecodeError) -> Self {
        StackError::MalformedMessage
    }
}

impl From<SdParseError> for StackError {
    fn from(_value: SdParseError) -> Self {
        StackError::MalformedMessage
    }
}
