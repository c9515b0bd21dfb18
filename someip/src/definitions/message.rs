//! The high level representations of SOME/IP frames

use serde::{Deserialize, Serialize};

use super::header::RawHeader;
use super::params::{
    MessageType, ReturnCode, EVENT_FLAG, LENGTH_TAIL, SD_METHOD_ID, SD_SERVICE_ID,
};

/// High level representation of a SOME/IP header
///
/// The length field of the wire format is not stored here: it is derived
/// from the payload size on build and validated against the buffer on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    /// Identifier of the service
    pub service_id: u16,
    /// Identifier of the method or event
    pub method_id: u16,
    /// Identifier of the calling client
    pub client_id: u16,
    /// Session identifier, 0 meaning "no session"
    pub session_id: u16,
    /// Version of the service interface
    pub interface_version: u8,
    /// Kind of the message
    pub message_type: MessageType,
    /// Result carried by the message
    pub return_code: ReturnCode,
}

impl Header {
    /// The 32 bit message identifier, service id in the upper half
    pub fn message_id(&self) -> u32 {
        u32::from(self.service_id) << 16 | u32::from(self.method_id)
    }

    /// The 32 bit request identifier, client id in the upper half
    pub fn request_id(&self) -> u32 {
        u32::from(self.client_id) << 16 | u32::from(self.session_id)
    }

    /// Whether the method id carries the event flag
    pub fn is_event(&self) -> bool {
        self.method_id & EVENT_FLAG == EVENT_FLAG
    }

    /// Whether this frame belongs to the service discovery control plane
    pub fn is_sd(&self) -> bool {
        self.service_id == SD_SERVICE_ID && self.method_id == SD_METHOD_ID
    }
}

impl From<&RawHeader> for Header {
    fn from(raw: &RawHeader) -> Self {
        Header {
            service_id: raw.service_id.get(),
            method_id: raw.method_id.get(),
            client_id: raw.client_id.get(),
            session_id: raw.session_id.get(),
            interface_version: raw.interface_version,
            message_type: MessageType::from_u8(raw.message_type),
            return_code: ReturnCode::from_u8(raw.return_code),
        }
    }
}

/// High level representation of a complete SOME/IP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The fixed header of the message
    pub header: Header,
    /// The payload carried after the header
    pub payload: Vec<u8>,
}

impl Message {
    /// The value of the wire length field for this message
    pub fn wire_length(&self) -> u32 {
        LENGTH_TAIL + self.payload.len() as u32
    }

    /// Whether the message is a TP segment
    pub fn is_tp(&self) -> bool {
        self.header.message_type.is_tp()
    }
}
