//! The checksum routines used by the end-to-end protection
//!
//! Three classic CRCs, all bit-by-bit MSB first without input or output
//! reflection:
//!
//! - CRC-8/SAE-J1850: polynomial 0x1D, init 0xFF, no final XOR
//! - CRC-16/CCITT: polynomial 0x1021, init 0xFFFF, no final XOR
//! - CRC-32/IEEE-802.3: polynomial 0x04C11DB7, init 0xFFFFFFFF, table
//!   driven, final XOR 0xFFFFFFFF
//!
//! The CRC-32 lookup table is built lazily exactly once and shared between
//! threads.

use std::sync::OnceLock;

const CRC8_POLYNOMIAL: u8 = 0x1D;
const CRC16_POLYNOMIAL: u16 = 0x1021;
const CRC32_POLYNOMIAL: u32 = 0x04C1_1DB7;

static CRC32_TABLE: OnceLock<[u32; 256]> = OnceLock::new();

/// Compute the CRC-8/SAE-J1850 checksum of `data`
pub fn crc8_sae_j1850(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                crc << 1 ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Compute the CRC-16/CCITT checksum of `data`
///
/// Each input byte is shifted into the high byte of the register before the
/// polynomial division.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                crc << 1 ^ CRC16_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Compute the CRC-32/IEEE-802.3 checksum of `data`
pub fn crc32_ieee(data: &[u8]) -> u32 {
    let table = CRC32_TABLE.get_or_init(build_crc32_table);

    let mut crc: u32 = 0xFFFF_FFFF;
    for byte in data {
        let index = (crc >> 24 ^ u32::from(*byte)) & 0xFF;
        crc = crc << 8 ^ table[index as usize];
    }
    crc ^ 0xFFFF_FFFF
}

fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (index, entry) in table.iter_mut().enumerate() {
        let mut crc = (index as u32) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                crc << 1 ^ CRC32_POLYNOMIAL
            } else {
                crc << 1
            };
        }
        *entry = crc;
    }
    table
}
