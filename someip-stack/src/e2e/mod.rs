//! End-to-end protection of individual messages
//!
//! Protection is pluggable: a profile implements the [E2eProfile] trait and
//! is registered in the process-wide [registry]. The built-in
//! [standard::StandardProfile] combines a CRC, a replay counter and a
//! freshness tick in a single 12 byte header.

use serde::{Deserialize, Serialize};
use someip::definitions::Message;

use crate::error::StackError;

pub mod registry;
pub mod standard;

/// The checksum algorithm a profile applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrcType {
    /// CRC-8/SAE-J1850
    Crc8,
    /// CRC-16/CCITT
    Crc16,
    /// CRC-32/IEEE-802.3
    Crc32,
}

impl CrcType {
    /// Decode the configuration value, unassigned values fall back to the
    /// default CRC-16
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => CrcType::Crc8,
            2 => CrcType::Crc32,
            _ => CrcType::Crc16,
        }
    }
}

/// Options to configure the protection of one data stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct E2eConfig {
    /// Identifier of the profile to apply
    pub profile_id: u32,
    /// Name of the profile to apply, used when the id is not registered
    pub profile_name: String,
    /// Identifier of the protected data stream
    pub data_id: u16,
    /// Byte offset of the header inside the payload
    pub offset: usize,
    /// Whether the checksum is computed and checked
    pub enable_crc: bool,
    /// Whether the replay counter is maintained and checked
    pub enable_counter: bool,
    /// Whether the freshness tick is maintained and checked
    pub enable_freshness: bool,
    /// Value at which the replay counter wraps back to 0
    pub max_counter_value: u32,
    /// Largest accepted age of a freshness tick in milliseconds
    pub freshness_timeout_ms: u32,
    /// The checksum algorithm to apply
    pub crc_type: CrcType,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            profile_id: 0,
            profile_name: "standard".to_string(),
            data_id: 0,
            offset: 8,
            enable_crc: true,
            enable_counter: true,
            enable_freshness: true,
            max_counter_value: u32::MAX,
            freshness_timeout_ms: 1000,
            crc_type: CrcType::Crc16,
        }
    }
}

/// A pluggable end-to-end protection profile
///
/// Implementations carry their own counter and replay state internally, so
/// both operations take shared references and may be called from any
/// thread.
pub trait E2eProfile: Send + Sync {
    /// Protect an outgoing message in place
    fn protect(&self, message: &mut Message, config: &E2eConfig) -> Result<(), StackError>;

    /// Validate an incoming message
    ///
    /// A checksum mismatch or a replayed counter yields
    /// [StackError::InvalidArgument], a stale freshness tick yields
    /// [StackError::Timeout].
    fn validate(&self, message: &Message, config: &E2eConfig) -> Result<(), StackError>;

    /// Number of bytes the profile embeds into the payload
    fn header_size(&self) -> u32;

    /// Human readable name of the profile, unique within the registry
    fn name(&self) -> &str;

    /// Numeric id of the profile, unique within the registry
    fn id(&self) -> u32;
}

impl std::fmt::Debug for dyn E2eProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("E2eProfile")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// Protect a message with the profile selected by the configuration
pub fn protect(message: &mut Message, config: &E2eConfig) -> Result<(), StackError> {
    registry::lookup(config)?.protect(message, config)
}

/// Validate a message with the profile selected by the configuration
pub fn validate(message: &Message, config: &E2eConfig) -> Result<(), StackError> {
    registry::lookup(config)?.validate(message, config)
}
