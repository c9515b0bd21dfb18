//! Parser for complete frames

use zerocopy::FromBytes;

use crate::definitions::{
    Header, Message, RawHeader, HEADER_LENGTH, LENGTH_TAIL, PROTOCOL_VERSION,
};
use crate::parser::errors::SomeipParseError;

/// Parse a single frame from the start of the buffer
///
/// Validation order matters: the buffer must hold a full header before the
/// length field is trusted, the length field must be consistent with the
/// buffer before the payload is sliced, and only then is the protocol
/// version checked.
///
/// Trailing bytes after the frame are ignored; use [parse_frames] to walk a
/// buffer holding several back-to-back frames.
pub fn parse_message(buf: &[u8]) -> Result<Message, SomeipParseError> {
    let (message, _) = parse_message_prefix(buf)?;
    Ok(message)
}

/// Parse a frame and additionally return its total size in the buffer
pub fn parse_message_prefix(buf: &[u8]) -> Result<(Message, usize), SomeipParseError> {
    let header = RawHeader::ref_from_prefix(buf).ok_or(SomeipParseError::BufferTooSmall)?;

    let length = header.length.get();
    if length < LENGTH_TAIL || length as usize - LENGTH_TAIL as usize > buf.len() - HEADER_LENGTH {
        return Err(SomeipParseError::MalformedLength);
    }

    if header.protocol_version != PROTOCOL_VERSION {
        return Err(SomeipParseError::WrongProtocolVersion(
            header.protocol_version,
        ));
    }

    let payload_len = (length - LENGTH_TAIL) as usize;
    let payload = buf[HEADER_LENGTH..HEADER_LENGTH + payload_len].to_vec();

    Ok((
        Message {
            header: Header::from(header),
            payload,
        },
        HEADER_LENGTH + payload_len,
    ))
}

/// Iterator over the frames of a buffer holding several of them back to back
///
/// A UDP datagram or a TCP read may carry more than one SOME/IP frame. The
/// iterator yields each frame in order and stops after the first error, as
/// the framing beyond a malformed length field is unrecoverable.
#[derive(Debug, Clone)]
pub struct FrameIterator<'a> {
    rest: &'a [u8],
    poisoned: bool,
}

impl<'a> FrameIterator<'a> {
    /// Iterate over the frames of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            rest: buf,
            poisoned: false,
        }
    }
}

impl Iterator for FrameIterator<'_> {
    type Item = Result<Message, SomeipParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned || self.rest.is_empty() {
            return None;
        }
        match parse_message_prefix(self.rest) {
            Ok((message, consumed)) => {
                self.rest = &self.rest[consumed..];
                Some(Ok(message))
            }
            Err(err) => {
                self.poisoned = true;
                Some(Err(err))
            }
        }
    }
}

/// Iterate over the frames of a buffer
pub fn parse_frames(buf: &[u8]) -> FrameIterator<'_> {
    FrameIterator::new(buf)
}
