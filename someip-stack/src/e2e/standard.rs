//! The built-in reference protection profile

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use someip::crc::{crc16_ccitt, crc32_ieee, crc8_sae_j1850};
use someip::definitions::{Message, RawE2eHeader, E2E_HEADER_LENGTH};
use someip::generator::write_e2e_header;
use someip::parser::parse_e2e_header;
use someip::zerocopy::network_endian::{U16, U32};

use crate::e2e::{CrcType, E2eConfig, E2eProfile};
use crate::error::StackError;

/// Number of accepted counters remembered per data id for replay detection
const REPLAY_WINDOW: usize = 4096;

#[derive(Debug, Default)]
struct ReplayState {
    seen: HashSet<u32>,
    order: VecDeque<u32>,
}

impl ReplayState {
    /// Record a counter, reporting whether it is fresh
    fn check_and_insert(&mut self, counter: u32) -> bool {
        // a wrap back to the start of the sequence begins a new cycle in
        // which the old counters are valid again
        if counter == 0 && self.order.back().is_some_and(|last| *last != 0) {
            self.seen.clear();
            self.order.clear();
        }
        if !self.seen.insert(counter) {
            return false;
        }
        self.order.push_back(counter);
        if self.order.len() > REPLAY_WINDOW {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// The standard profile: CRC, replay counter and freshness tick in one
/// 12 byte header
///
/// This is profile id 0 and registered by default. Its wire layout is not
/// one of the AUTOSAR P profiles; peers interoperate only when both ends
/// run this implementation.
#[derive(Debug)]
pub struct StandardProfile {
    epoch: Instant,
    counters: Mutex<HashMap<u16, u32>>,
    replays: Mutex<HashMap<u16, ReplayState>>,
}

impl StandardProfile {
    /// Create the profile with fresh counter and replay state
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            counters: Mutex::new(HashMap::new()),
            replays: Mutex::new(HashMap::new()),
        }
    }

    /// Monotonic millisecond tick truncated to the wire width
    fn freshness_now(&self) -> u16 {
        self.epoch.elapsed().as_millis() as u16
    }

    #[allow(clippy::unwrap_used)]
    fn next_counter(&self, data_id: u16, max: u32) -> u32 {
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry(data_id).or_insert(0);
        let value = *counter;
        *counter = if value >= max { 0 } else { value + 1 };
        value
    }

    fn checksum(crc_type: CrcType, data: &[u8]) -> u32 {
        match crc_type {
            CrcType::Crc8 => u32::from(crc8_sae_j1850(data)),
            CrcType::Crc16 => u32::from(crc16_ccitt(data)),
            CrcType::Crc32 => crc32_ieee(data),
        }
    }

    /// CRC over the payload with the header's CRC field zeroed
    fn protected_region_crc(
        payload: &[u8],
        offset: usize,
        crc_type: CrcType,
    ) -> u32 {
        let mut region = payload.to_vec();
        region[offset..offset + 4].fill(0);
        Self::checksum(crc_type, &region)
    }
}

impl Default for StandardProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl E2eProfile for StandardProfile {
    fn protect(&self, message: &mut Message, config: &E2eConfig) -> Result<(), StackError> {
        let offset = config.offset;
        if offset > message.payload.len() {
            return Err(StackError::InvalidArgument);
        }

        // make room for the header unless the caller already reserved it
        message
            .payload
            .splice(offset..offset, [0u8; E2E_HEADER_LENGTH]);

        let counter = if config.enable_counter {
            self.next_counter(config.data_id, config.max_counter_value)
        } else {
            0
        };
        let freshness = if config.enable_freshness {
            self.freshness_now()
        } else {
            0
        };

        let mut header = RawE2eHeader {
            crc: U32::new(0),
            counter: U32::new(counter),
            data_id: U16::new(config.data_id),
            freshness_value: U16::new(freshness),
        };
        write_e2e_header(&mut message.payload, offset, &header)
            .map_err(|_| StackError::InvalidArgument)?;

        if config.enable_crc {
            let crc = Self::protected_region_crc(&message.payload, offset, config.crc_type);
            header.crc = U32::new(crc);
            write_e2e_header(&mut message.payload, offset, &header)
                .map_err(|_| StackError::InvalidArgument)?;
        }

        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    fn validate(&self, message: &Message, config: &E2eConfig) -> Result<(), StackError> {
        let header = parse_e2e_header(&message.payload, config.offset)?;

        if config.enable_crc {
            let expected =
                Self::protected_region_crc(&message.payload, config.offset, config.crc_type);
            if header.crc.get() != expected {
                return Err(StackError::InvalidArgument);
            }
        }

        if config.enable_counter {
            let mut replays = self.replays.lock().unwrap();
            let state = replays.entry(header.data_id.get()).or_default();
            if !state.check_and_insert(header.counter.get()) {
                return Err(StackError::InvalidArgument);
            }
        }

        if config.enable_freshness {
            let age = self.freshness_now().wrapping_sub(header.freshness_value.get());
            if u32::from(age) > config.freshness_timeout_ms {
                return Err(StackError::Timeout);
            }
        }

        Ok(())
    }

    fn header_size(&self) -> u32 {
        E2E_HEADER_LENGTH as u32
    }

    fn name(&self) -> &str {
        "standard"
    }

    fn id(&self) -> u32 {
        0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use someip::definitions::{Header, MessageType, ReturnCode};

    use super::*;

    fn message(payload: Vec<u8>) -> Message {
        Message {
            header: Header {
                service_id: 0x1234,
                method_id: 0x0001,
                client_id: 0x0001,
                session_id: 0x0001,
                interface_version: 1,
                message_type: MessageType::Notification,
                return_code: ReturnCode::Ok,
            },
            payload,
        }
    }

    fn config() -> E2eConfig {
        E2eConfig {
            data_id: 0x2A2A,
            offset: 0,
            ..E2eConfig::default()
        }
    }

    #[test]
    fn protect_then_validate_succeeds() {
        let profile = StandardProfile::new();
        let config = config();

        let mut msg = message(vec![0x10, 0x20, 0x30, 0x40]);
        profile.protect(&mut msg, &config).unwrap();
        assert_eq!(msg.payload.len(), 4 + E2E_HEADER_LENGTH);
        profile.validate(&msg, &config).unwrap();
    }

    #[test]
    fn any_single_bit_flip_is_detected() {
        let profile = StandardProfile::new();
        let config = config();

        let mut msg = message(vec![0xAA, 0xBB, 0xCC]);
        profile.protect(&mut msg, &config).unwrap();

        for byte in 0..msg.payload.len() {
            // the CRC field itself is not part of the protected region
            if byte < 4 {
                continue;
            }
            for bit in 0..8 {
                let mut tampered = msg.clone();
                tampered.payload[byte] ^= 1 << bit;
                assert_eq!(
                    profile.validate(&tampered, &config),
                    Err(StackError::InvalidArgument),
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn flipped_crc_is_detected() {
        let profile = StandardProfile::new();
        let config = config();
        let mut msg = message(vec![0xAA]);
        profile.protect(&mut msg, &config).unwrap();
        msg.payload[0] ^= 0x01;
        assert_eq!(
            profile.validate(&msg, &config),
            Err(StackError::InvalidArgument)
        );
    }

    #[test]
    fn replayed_counter_is_rejected() {
        let profile = StandardProfile::new();
        let config = config();

        let mut msg = message(vec![0x01, 0x02]);
        profile.protect(&mut msg, &config).unwrap();
        profile.validate(&msg, &config).unwrap();
        assert_eq!(
            profile.validate(&msg, &config),
            Err(StackError::InvalidArgument)
        );
    }

    #[test]
    fn counter_wraps_at_configured_maximum() {
        let profile = StandardProfile::new();
        let config = E2eConfig {
            max_counter_value: 2,
            enable_freshness: false,
            ..config()
        };

        let mut counters = vec![];
        for _ in 0..5 {
            let mut msg = message(vec![0x00]);
            profile.protect(&mut msg, &config).unwrap();
            let header = parse_e2e_header(&msg.payload, config.offset).unwrap();
            counters.push(header.counter.get());
        }
        assert_eq!(counters, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn header_lands_at_configured_offset() {
        let profile = StandardProfile::new();
        let config = E2eConfig {
            offset: 2,
            ..config()
        };

        let mut msg = message(vec![0x11, 0x22, 0x33]);
        profile.protect(&mut msg, &config).unwrap();
        assert_eq!(msg.payload.len(), 3 + E2E_HEADER_LENGTH);
        assert_eq!(msg.payload[0], 0x11);
        assert_eq!(msg.payload[1], 0x22);
        assert_eq!(msg.payload[14], 0x33);
        profile.validate(&msg, &config).unwrap();
    }

    #[test]
    fn offset_past_payload_is_invalid() {
        let profile = StandardProfile::new();
        let config = E2eConfig {
            offset: 9,
            ..config()
        };
        let mut msg = message(vec![0x00; 4]);
        assert_eq!(
            profile.protect(&mut msg, &config),
            Err(StackError::InvalidArgument)
        );
    }
}
