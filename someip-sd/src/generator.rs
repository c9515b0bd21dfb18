//! Generator of the service discovery payload
//!
//! Options are deduplicated on the wire: when two entries reference runs
//! with identical byte representations, the run is emitted once and both
//! entries point at it via their index fields.

use someip::definitions::{
    Header, Message, MessageType, ReturnCode, SD_CLIENT_ID, SD_METHOD_ID, SD_SERVICE_ID,
};
use someip::primitives::ByteWriter;
use someip::zerocopy::network_endian::{U16, U32};
use someip::zerocopy::AsBytes;

use crate::definitions::{SdMessage, SdOption};
use crate::errors::SdParseError;
use crate::wire::{
    RawEntry, RawIpv4OptionBody, RawIpv6OptionBody, RawOptionHeader, FLAG_REBOOT, FLAG_UNICAST,
};

/// Largest option run expressible in a 4 bit count
const MAX_RUN_LENGTH: usize = 15;

/// Largest option array addressable with 8 bit indices
const MAX_OPTIONS_TOTAL: usize = 256;

/// Build the payload of a service discovery message
pub fn build_sd_payload(message: &SdMessage) -> Result<Vec<u8>, SdParseError> {
    let mut option_array: Vec<Vec<u8>> = vec![];
    let mut records = Vec::with_capacity(message.entries.len());

    for entry in &message.entries {
        let run1: Vec<Vec<u8>> = entry.options1.iter().map(encode_option).collect();
        let run2: Vec<Vec<u8>> = entry.options2.iter().map(encode_option).collect();
        let (index1, count1) = place_run(&mut option_array, &run1)?;
        let (index2, count2) = place_run(&mut option_array, &run2)?;

        let last_word = if entry.kind.is_eventgroup_entry() {
            u32::from(entry.eventgroup_id)
        } else {
            entry.minor_version
        };

        records.push(RawEntry {
            entry_type: entry.kind.as_u8(),
            index1,
            index2,
            option_counts: RawEntry::pack_option_counts(count1, count2),
            service_id: U16::new(entry.service_id),
            instance_id: U16::new(entry.instance_id),
            major_version: entry.major_version,
            ttl: RawEntry::ttl_bytes(entry.ttl),
            last_word: U32::new(last_word),
        });
    }

    let mut flags = 0u8;
    if message.reboot {
        flags |= FLAG_REBOOT;
    }
    if message.unicast {
        flags |= FLAG_UNICAST;
    }

    let mut writer = ByteWriter::new();
    writer.write_u8(flags);
    writer.write_u8(0);
    writer.write_u8(0);
    writer.write_u8(0);

    let mut entry_bytes = vec![];
    for record in &records {
        entry_bytes.extend_from_slice(record.as_bytes());
    }
    writer.write_length_prefixed(&entry_bytes);

    let options_flat: Vec<u8> = option_array.concat();
    writer.write_length_prefixed(&options_flat);

    Ok(writer.into_bytes())
}

/// Build the complete SOME/IP frame carrying a service discovery payload
pub fn build_sd_frame(message: &SdMessage, session_id: u16) -> Result<Message, SdParseError> {
    Ok(Message {
        header: Header {
            service_id: SD_SERVICE_ID,
            method_id: SD_METHOD_ID,
            client_id: SD_CLIENT_ID,
            session_id,
            interface_version: 0x01,
            message_type: MessageType::Notification,
            return_code: ReturnCode::Ok,
        },
        payload: build_sd_payload(message)?,
    })
}

/// Find or append a run inside the options array, returning its start index
/// and length
fn place_run(
    option_array: &mut Vec<Vec<u8>>,
    run: &[Vec<u8>],
) -> Result<(u8, usize), SdParseError> {
    if run.is_empty() {
        return Ok((0, 0));
    }
    if run.len() > MAX_RUN_LENGTH {
        return Err(SdParseError::TooManyOptions);
    }

    for start in 0..option_array.len().saturating_sub(run.len() - 1) {
        if option_array[start..start + run.len()] == *run {
            return Ok((start as u8, run.len()));
        }
    }

    let start = option_array.len();
    if start + run.len() > MAX_OPTIONS_TOTAL {
        return Err(SdParseError::TooManyOptionsTotal);
    }
    option_array.extend_from_slice(run);
    Ok((start as u8, run.len()))
}

/// Encode a single option including its header
fn encode_option(option: &SdOption) -> Vec<u8> {
    let (option_type, body): (u8, Vec<u8>) = match option {
        SdOption::Ipv4Endpoint {
            address,
            protocol,
            port,
        } => (0x04, ipv4_body(address.octets(), *protocol, *port)),
        SdOption::Ipv4Multicast {
            address,
            protocol,
            port,
        } => (0x14, ipv4_body(address.octets(), *protocol, *port)),
        SdOption::Ipv6Endpoint {
            address,
            protocol,
            port,
        } => (0x06, ipv6_body(address.octets(), *protocol, *port)),
        SdOption::Ipv6Multicast {
            address,
            protocol,
            port,
        } => (0x16, ipv6_body(address.octets(), *protocol, *port)),
        SdOption::Configuration(records) => (0x01, records.clone()),
        SdOption::Unknown { option_type, body } => (*option_type, body.clone()),
    };

    let header = RawOptionHeader {
        length: U16::new(body.len() as u16),
        option_type,
    };
    let mut bytes = Vec::with_capacity(size_of::<RawOptionHeader>() + body.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

fn ipv4_body(octets: [u8; 4], protocol: crate::definitions::L4Protocol, port: u16) -> Vec<u8> {
    RawIpv4OptionBody {
        reserved: 0,
        address: octets,
        reserved2: 0,
        protocol: protocol.as_u8(),
        port: U16::new(port),
    }
    .as_bytes()
    .to_vec()
}

fn ipv6_body(octets: [u8; 16], protocol: crate::definitions::L4Protocol, port: u16) -> Vec<u8> {
    RawIpv6OptionBody {
        reserved: 0,
        address: octets,
        reserved2: 0,
        protocol: protocol.as_u8(),
        port: U16::new(port),
    }
    .as_bytes()
    .to_vec()
}
