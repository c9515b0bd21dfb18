//! SOME/IP parameters and protocol constants as defined in the AUTOSAR
//! protocol specification (PRS_SOMEIPProtocol)

use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// The protocol version this implementation speaks
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Size of the fixed SOME/IP header in bytes
pub const HEADER_LENGTH: usize = 16;

/// Number of header bytes covered by the length field (Client ID through
/// Return Code); the payload size of a frame is `length - LENGTH_TAIL`
pub const LENGTH_TAIL: u32 = 8;

/// Size of the TP header prefixed to the payload of a TP segment
pub const TP_HEADER_LENGTH: usize = 4;

/// Size of the end-to-end protection header in bytes
pub const E2E_HEADER_LENGTH: usize = 12;

/// Flag in the message type field marking a frame as a TP segment
pub const TP_FLAG: u8 = 0x20;

/// Granularity of the TP offset field in bytes
pub const TP_OFFSET_UNIT: u32 = 16;

/// Mask of the reserved bits inside the low nibble of the TP header
pub const TP_RESERVED_MASK: u32 = 0b1110;

/// Flag in the method id field marking an event rather than a method
pub const EVENT_FLAG: u16 = 0x8000;

/// Service id used by all service discovery messages
pub const SD_SERVICE_ID: u16 = 0xFFFF;

/// Method id used by all service discovery messages
pub const SD_METHOD_ID: u16 = 0x8100;

/// Client id used by all service discovery messages
pub const SD_CLIENT_ID: u16 = 0x0000;

/// Maximum payload of a single SOME/IP frame sent over UDP
pub const MAX_PAYLOAD_LEN_UDP: usize = 1400;

/// Maximum payload of a TP segment; all segments except the final one must
/// additionally be a multiple of 16 bytes, which this value already is
pub const TP_MAX_SEGMENT_LEN: usize = 1392;

/// Kind of a SOME/IP message
///
/// The values with the [TP_FLAG] bit set mark frames whose payload is a TP
/// segment of a larger message of the corresponding base type. Values not
/// assigned by the specification are preserved as [MessageType::Other] so
/// that a frame can round-trip unchanged and the caller can still see the
/// raw value.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, EnumIter, Serialize, Deserialize)]
pub enum MessageType {
    /// A request expecting a response
    Request,
    /// A fire-and-forget request
    RequestNoReturn,
    /// An event notification
    Notification,
    /// The response to a request
    Response,
    /// The response to a request that failed
    Error,
    /// TP segment of a [MessageType::Request]
    TpRequest,
    /// TP segment of a [MessageType::RequestNoReturn]
    TpRequestNoReturn,
    /// TP segment of a [MessageType::Notification]
    TpNotification,
    /// TP segment of a [MessageType::Response]
    TpResponse,
    /// TP segment of a [MessageType::Error]
    TpError,
    /// A value not assigned by the specification
    Other(u8),
}

impl MessageType {
    /// Decode the wire value, never failing
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => MessageType::Request,
            0x01 => MessageType::RequestNoReturn,
            0x02 => MessageType::Notification,
            0x80 => MessageType::Response,
            0x81 => MessageType::Error,
            0x20 => MessageType::TpRequest,
            0x21 => MessageType::TpRequestNoReturn,
            0x22 => MessageType::TpNotification,
            0x23 => MessageType::TpResponse,
            0x24 => MessageType::TpError,
            other => MessageType::Other(other),
        }
    }

    /// Encode into the wire value
    pub fn as_u8(self) -> u8 {
        match self {
            MessageType::Request => 0x00,
            MessageType::RequestNoReturn => 0x01,
            MessageType::Notification => 0x02,
            MessageType::Response => 0x80,
            MessageType::Error => 0x81,
            MessageType::TpRequest => 0x20,
            MessageType::TpRequestNoReturn => 0x21,
            MessageType::TpNotification => 0x22,
            MessageType::TpResponse => 0x23,
            MessageType::TpError => 0x24,
            MessageType::Other(other) => other,
        }
    }

    /// Whether this value is one of the assigned enumerators
    pub fn is_known(self) -> bool {
        !matches!(self, MessageType::Other(_))
    }

    /// Whether the frame is a TP segment
    pub fn is_tp(self) -> bool {
        self.as_u8() & TP_FLAG == TP_FLAG
    }

    /// The TP segment variant of this message type
    ///
    /// Note that the assigned TP values are not a plain bit-or of the base
    /// value and [TP_FLAG]: TP_RESPONSE is 0x23 and TP_ERROR is 0x24.
    pub fn with_tp_flag(self) -> Self {
        match self {
            MessageType::Request => MessageType::TpRequest,
            MessageType::RequestNoReturn => MessageType::TpRequestNoReturn,
            MessageType::Notification => MessageType::TpNotification,
            MessageType::Response => MessageType::TpResponse,
            MessageType::Error => MessageType::TpError,
            other => other,
        }
    }

    /// The base message type of a TP segment
    pub fn without_tp_flag(self) -> Self {
        match self {
            MessageType::TpRequest => MessageType::Request,
            MessageType::TpRequestNoReturn => MessageType::RequestNoReturn,
            MessageType::TpNotification => MessageType::Notification,
            MessageType::TpResponse => MessageType::Response,
            MessageType::TpError => MessageType::Error,
            other => other,
        }
    }
}

/// Result of the operation a SOME/IP message reports
///
/// Requests and notifications carry [ReturnCode::Ok]; responses carry the
/// outcome of the dispatched call. As with [MessageType], unassigned values
/// are preserved as [ReturnCode::Other].
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, EnumIter, Serialize, Deserialize)]
pub enum ReturnCode {
    /// No error occurred
    Ok,
    /// An unspecified error occurred
    NotOk,
    /// The requested service id is unknown
    UnknownService,
    /// The requested method id is unknown
    UnknownMethod,
    /// The service is known but not ready to accept requests
    NotReady,
    /// The service is known but unreachable
    NotReachable,
    /// The operation did not finish within the configured deadline
    Timeout,
    /// The protocol version of the frame is not supported
    WrongProtocolVersion,
    /// The interface version of the frame does not match the service
    WrongInterfaceVersion,
    /// The frame violates the wire format
    MalformedMessage,
    /// A value not assigned by the specification
    Other(u8),
}

impl ReturnCode {
    /// Decode the wire value, never failing
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => ReturnCode::Ok,
            0x01 => ReturnCode::NotOk,
            0x02 => ReturnCode::UnknownService,
            0x03 => ReturnCode::UnknownMethod,
            0x04 => ReturnCode::NotReady,
            0x05 => ReturnCode::NotReachable,
            0x06 => ReturnCode::Timeout,
            0x07 => ReturnCode::WrongProtocolVersion,
            0x08 => ReturnCode::WrongInterfaceVersion,
            0x09 => ReturnCode::MalformedMessage,
            other => ReturnCode::Other(other),
        }
    }

    /// Encode into the wire value
    pub fn as_u8(self) -> u8 {
        match self {
            ReturnCode::Ok => 0x00,
            ReturnCode::NotOk => 0x01,
            ReturnCode::UnknownService => 0x02,
            ReturnCode::UnknownMethod => 0x03,
            ReturnCode::NotReady => 0x04,
            ReturnCode::NotReachable => 0x05,
            ReturnCode::Timeout => 0x06,
            ReturnCode::WrongProtocolVersion => 0x07,
            ReturnCode::WrongInterfaceVersion => 0x08,
            ReturnCode::MalformedMessage => 0x09,
            ReturnCode::Other(other) => other,
        }
    }

    /// Whether this value is one of the assigned enumerators
    pub fn is_known(self) -> bool {
        !matches!(self, ReturnCode::Other(_))
    }
}
