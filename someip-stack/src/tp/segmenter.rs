//! Splitting oversize messages into TP segments

use someip::definitions::{Message, RawTpHeader, TP_HEADER_LENGTH, TP_OFFSET_UNIT};
use someip::zerocopy::AsBytes;

use crate::error::StackError;

/// Whether a message must be segmented before it fits the given limit
pub fn needs_segmentation(message: &Message, max_segment_size: usize) -> bool {
    message.payload.len() > max_segment_size
}

/// Split a message into a lazy sequence of TP segments
///
/// Every yielded segment is a complete SOME/IP frame sharing the original
/// message id, request id and interface version, with the TP variant of the
/// message type. All slices except the final one span the same multiple of
/// 16 bytes.
pub fn segment(message: Message, max_segment_size: usize) -> Result<Segmenter, StackError> {
    let slice_len = max_segment_size & !(TP_OFFSET_UNIT as usize - 1);
    if slice_len == 0 {
        return Err(StackError::InvalidArgument);
    }

    Ok(Segmenter {
        message,
        slice_len,
        offset: 0,
    })
}

/// Iterator over the TP segments of one message
#[derive(Debug, Clone)]
pub struct Segmenter {
    message: Message,
    slice_len: usize,
    offset: usize,
}

impl Iterator for Segmenter {
    type Item = Message;

    fn next(&mut self) -> Option<Self::Item> {
        let payload = &self.message.payload;
        if self.offset >= payload.len() {
            return None;
        }

        let end = (self.offset + self.slice_len).min(payload.len());
        let more_segments = end < payload.len();

        let tp_header = RawTpHeader::new(self.offset as u32, more_segments);
        let mut segment_payload = Vec::with_capacity(TP_HEADER_LENGTH + (end - self.offset));
        segment_payload.extend_from_slice(tp_header.as_bytes());
        segment_payload.extend_from_slice(&payload[self.offset..end]);

        let mut header = self.message.header;
        header.message_type = header.message_type.with_tp_flag();

        self.offset = end;
        Some(Message {
            header,
            payload: segment_payload,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use someip::definitions::{Header, MessageType, ReturnCode};
    use someip::parser::parse_tp_segment;

    use super::*;

    fn oversize_message(len: usize) -> Message {
        Message {
            header: Header {
                service_id: 0x1234,
                method_id: 0x0042,
                client_id: 0x0001,
                session_id: 0x0007,
                interface_version: 1,
                message_type: MessageType::Notification,
                return_code: ReturnCode::Ok,
            },
            payload: (0..len).map(|i| i as u8).collect(),
        }
    }

    #[test]
    fn segments_are_aligned_and_ordered() {
        let message = oversize_message(3000);
        let segments: Vec<_> = segment(message.clone(), 1024).unwrap().collect();
        assert_eq!(segments.len(), 3);

        for (index, frame) in segments.iter().enumerate() {
            assert_eq!(frame.header.message_type, MessageType::TpNotification);
            assert_eq!(frame.header.session_id, message.header.session_id);

            let tp = parse_tp_segment(frame).unwrap();
            assert_eq!(tp.byte_offset as usize, index * 1024);
            assert_eq!(tp.more_segments, index < 2);
            if tp.more_segments {
                assert_eq!(tp.data.len(), 1024);
            } else {
                assert_eq!(tp.data.len(), 3000 - 2048);
            }
        }
    }

    #[test]
    fn unaligned_limit_is_rounded_down() {
        let message = oversize_message(100);
        let segments: Vec<_> = segment(message, 90).unwrap().collect();
        // 90 rounds down to 80, leaving 20 bytes for the final segment
        assert_eq!(segments.len(), 2);
        let first = parse_tp_segment(&segments[0]).unwrap();
        assert_eq!(first.data.len(), 80);
        let last = parse_tp_segment(&segments[1]).unwrap();
        assert_eq!(last.data.len(), 20);
        assert!(!last.more_segments);
    }

    #[test]
    fn limit_below_the_offset_unit_is_rejected() {
        assert_eq!(
            segment(oversize_message(100), 15).err(),
            Some(StackError::InvalidArgument)
        );
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let message = oversize_message(2048);
        let segments: Vec<_> = segment(message, 1024).unwrap().collect();
        assert_eq!(segments.len(), 2);
        let last = parse_tp_segment(&segments[1]).unwrap();
        assert_eq!(last.data.len(), 1024);
        assert!(!last.more_segments);
    }
}
