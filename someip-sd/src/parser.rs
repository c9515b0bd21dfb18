//! Parser of the service discovery payload

use someip::definitions::{Message, MessageType, ReturnCode, SD_CLIENT_ID};
use someip::primitives::ByteReader;
use someip::zerocopy::FromBytes;

use crate::definitions::{Entry, EntryKind, L4Protocol, SdMessage, SdOption};
use crate::errors::SdParseError;
use crate::wire::{
    RawEntry, RawIpv4OptionBody, RawIpv6OptionBody, RawOptionHeader, ENTRY_LENGTH, FLAG_REBOOT,
    FLAG_UNICAST, OPTION_HEADER_LENGTH,
};

/// Parse a complete SOME/IP frame as a service discovery message
///
/// Beyond the payload framing this validates the invariants every SD frame
/// must satisfy: the SD message id, client id 0, message type NOTIFICATION
/// and return code E_OK.
pub fn parse_sd_message(message: &Message) -> Result<SdMessage, SdParseError> {
    if !message.header.is_sd()
        || message.header.client_id != SD_CLIENT_ID
        || message.header.message_type != MessageType::Notification
        || message.header.return_code != ReturnCode::Ok
    {
        return Err(SdParseError::NotAnSdMessage);
    }

    parse_sd_payload(&message.payload)
}

/// Parse the payload of a service discovery message
pub fn parse_sd_payload(buf: &[u8]) -> Result<SdMessage, SdParseError> {
    let mut reader = ByteReader::new(buf);

    let flags = reader.read_u8()?;
    // 3 reserved bytes after the flags
    for _ in 0..3 {
        reader.read_u8()?;
    }

    let entries_len = reader.read_u32()? as usize;
    if entries_len % ENTRY_LENGTH != 0 || entries_len > reader.remaining() {
        return Err(SdParseError::MalformedEntries);
    }
    let mut raw_entries = Vec::with_capacity(entries_len / ENTRY_LENGTH);
    for _ in 0..entries_len / ENTRY_LENGTH {
        let chunk = reader.read_bytes(ENTRY_LENGTH)?;
        raw_entries.push(RawEntry::read_from(chunk).ok_or(SdParseError::MalformedEntries)?);
    }

    let options_len = reader.read_u32()? as usize;
    if options_len > reader.remaining() {
        return Err(SdParseError::MalformedOptions);
    }
    let options = parse_options(buf, reader.position(), options_len)?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for raw in &raw_entries {
        entries.push(resolve_entry(raw, &options)?);
    }

    Ok(SdMessage {
        reboot: flags & FLAG_REBOOT != 0,
        unicast: flags & FLAG_UNICAST != 0,
        entries,
    })
}

/// Parse the options array into its decoded options, in index order
fn parse_options(
    buf: &[u8],
    start: usize,
    options_len: usize,
) -> Result<Vec<SdOption>, SdParseError> {
    let region = &buf[start..start + options_len];
    let mut options = vec![];

    let mut offset = 0;
    while offset < region.len() {
        let header = RawOptionHeader::ref_from_prefix(&region[offset..])
            .ok_or(SdParseError::MalformedOptions)?;
        let body_start = offset + OPTION_HEADER_LENGTH;
        let body_len = header.length.get() as usize;
        if body_len > region.len() - body_start {
            return Err(SdParseError::MalformedOptions);
        }
        let body = &region[body_start..body_start + body_len];

        options.push(parse_option(header.option_type, body)?);
        offset = body_start + body_len;
    }

    Ok(options)
}

fn parse_option(option_type: u8, body: &[u8]) -> Result<SdOption, SdParseError> {
    match option_type {
        0x01 => Ok(SdOption::Configuration(body.to_vec())),
        0x04 | 0x14 => {
            let body =
                RawIpv4OptionBody::read_from(body).ok_or(SdParseError::MalformedOptions)?;
            let address = body.address.into();
            let protocol = L4Protocol::from_u8(body.protocol);
            let port = body.port.get();
            Ok(if option_type == 0x04 {
                SdOption::Ipv4Endpoint {
                    address,
                    protocol,
                    port,
                }
            } else {
                SdOption::Ipv4Multicast {
                    address,
                    protocol,
                    port,
                }
            })
        }
        0x06 | 0x16 => {
            let body =
                RawIpv6OptionBody::read_from(body).ok_or(SdParseError::MalformedOptions)?;
            let address = body.address.into();
            let protocol = L4Protocol::from_u8(body.protocol);
            let port = body.port.get();
            Ok(if option_type == 0x06 {
                SdOption::Ipv6Endpoint {
                    address,
                    protocol,
                    port,
                }
            } else {
                SdOption::Ipv6Multicast {
                    address,
                    protocol,
                    port,
                }
            })
        }
        other => {
            log::warn!("Uninterpreted SD option type {other:#04x} with {} bytes", body.len());
            Ok(SdOption::Unknown {
                option_type: other,
                body: body.to_vec(),
            })
        }
    }
}

/// Attach the referenced option runs to an entry
fn resolve_entry(raw: &RawEntry, options: &[SdOption]) -> Result<Entry, SdParseError> {
    let kind = EntryKind::from_u8(raw.entry_type);
    let last_word = raw.last_word.get();

    let options1 = resolve_run(options, raw.index1 as usize, raw.option_count_1())?;
    let options2 = resolve_run(options, raw.index2 as usize, raw.option_count_2())?;

    Ok(Entry {
        kind,
        service_id: raw.service_id.get(),
        instance_id: raw.instance_id.get(),
        major_version: raw.major_version,
        ttl: raw.ttl_value(),
        minor_version: if kind.is_eventgroup_entry() { 0 } else { last_word },
        eventgroup_id: if kind.is_eventgroup_entry() {
            last_word as u16
        } else {
            0
        },
        options1,
        options2,
    })
}

fn resolve_run(
    options: &[SdOption],
    index: usize,
    count: usize,
) -> Result<Vec<SdOption>, SdParseError> {
    if count == 0 {
        return Ok(vec![]);
    }
    if index + count > options.len() {
        return Err(SdParseError::OptionIndexOutOfRange {
            index,
            available: options.len(),
        });
    }
    Ok(options[index..index + count].to_vec())
}
