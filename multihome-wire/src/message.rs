//! Netlink message framing: the 16-byte header and the decode iterator
//! over a receive buffer.

use crate::{align, attr::AttrIter, consts::NLMSG_ERROR, Error};

/// The fixed `nlmsghdr` preceding every netlink message.
///
/// All fields are native-endian, as on the kernel interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetlinkHeader {
    /// Total message length in bytes, header included, padding excluded.
    pub length: u32,
    /// Message content type (`RTM_*` or an `NLMSG_*` control type).
    pub message_type: u16,
    /// `NLM_F_*` flag word.
    pub flags: u16,
    /// Sequence number; 0 for kernel-originated notifications.
    pub sequence_number: u32,
    /// Sending port id; 0 for the kernel.
    pub port_number: u32,
}

impl NetlinkHeader {
    /// Encoded size of the header in bytes.
    pub const SIZE: usize = 16;

    /// Parse a header from the front of `bytes`. Returns `None` if fewer
    /// than [`Self::SIZE`] bytes are available.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            length: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            message_type: u16::from_ne_bytes(bytes[4..6].try_into().unwrap()),
            flags: u16::from_ne_bytes(bytes[6..8].try_into().unwrap()),
            sequence_number: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            port_number: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
        })
    }

    /// Write the header into the first [`Self::SIZE`] bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.length.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.message_type.to_ne_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.sequence_number.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.port_number.to_ne_bytes());
    }
}

/// A borrowed view of one netlink message within a receive buffer.
///
/// The view spans exactly `header.length` bytes, header included, so
/// [`Message::as_bytes`] can be cloned verbatim for request derivation.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    header: NetlinkHeader,
    bytes: &'a [u8],
}

impl<'a> Message<'a> {
    pub fn header(&self) -> &NetlinkHeader {
        &self.header
    }

    pub fn message_type(&self) -> u16 {
        self.header.message_type
    }

    pub fn sequence_number(&self) -> u32 {
        self.header.sequence_number
    }

    /// The full message, header included, exactly as received.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The payload after the 16-byte header: family struct plus attributes.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[NetlinkHeader::SIZE..]
    }

    /// Cursor over the attributes following a family struct of
    /// `family_len` bytes.
    pub fn attrs(&self, family_len: usize) -> AttrIter<'a> {
        AttrIter::new(self.payload(), family_len)
    }
}

/// Decoded payload of an [`NLMSG_ERROR`] message: the error code and, when
/// present, the header of the request being answered.
///
/// An `error` of 0 is an acknowledgement; negative values are `-errno`.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMessage {
    pub error: i32,
    pub request_header: Option<NetlinkHeader>,
}

impl ErrorMessage {
    /// Parse the payload of a message whose type is [`NLMSG_ERROR`].
    pub fn parse(message: &Message<'_>) -> Option<Self> {
        debug_assert_eq!(message.message_type(), NLMSG_ERROR);
        let payload = message.payload();
        if payload.len() < 4 {
            return None;
        }
        let error = i32::from_ne_bytes(payload[0..4].try_into().unwrap());
        Some(Self { error, request_header: NetlinkHeader::parse(&payload[4..]) })
    }

    /// The sequence number this error answers: the embedded request
    /// header's when present, the outer header's otherwise.
    pub fn answered_sequence(&self, outer: &NetlinkHeader) -> u32 {
        self.request_header.map(|h| h.sequence_number).unwrap_or(outer.sequence_number)
    }
}

/// Iterator yielding [`Message`] views over a receive buffer.
///
/// Finite and not restartable. A message advertising more bytes than the
/// buffer holds yields [`Error::Truncated`] and ends the iteration; a
/// short trailing fragment (fewer bytes than a header) ends it silently,
/// matching `NLMSG_OK`.
pub struct MessageIter<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> MessageIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0, failed: false }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<Message<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let remaining = &self.buf[self.offset..];
        let header = NetlinkHeader::parse(remaining)?;
        let advertised = header.length as usize;
        if advertised < NetlinkHeader::SIZE || advertised > remaining.len() {
            self.failed = true;
            return Some(Err(Error::Truncated { advertised, available: remaining.len() }));
        }
        let message = Message { header, bytes: &remaining[..advertised] };
        self.offset += align(advertised);
        Some(Ok(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{NLM_F_MULTI, RTM_NEWLINK};

    fn raw_message(message_type: u16, seq: u32, payload: &[u8]) -> Vec<u8> {
        let header = NetlinkHeader {
            length: (NetlinkHeader::SIZE + payload.len()) as u32,
            message_type,
            flags: NLM_F_MULTI,
            sequence_number: seq,
            port_number: 0,
        };
        let mut buf = vec![0u8; NetlinkHeader::SIZE];
        header.write_to(&mut buf);
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn header_round_trip() {
        let header = NetlinkHeader {
            length: 44,
            message_type: RTM_NEWLINK,
            flags: NLM_F_MULTI,
            sequence_number: 7,
            port_number: 99,
        };
        let mut buf = [0u8; NetlinkHeader::SIZE];
        header.write_to(&mut buf);
        assert_eq!(NetlinkHeader::parse(&buf), Some(header));
    }

    #[test]
    fn iterates_batch_with_padding() {
        // First message has a 5-byte payload, so the second starts on the
        // next 4-byte boundary.
        let mut buf = raw_message(RTM_NEWLINK, 1, &[1, 2, 3, 4, 5]);
        buf.resize(align(buf.len()), 0);
        buf.extend_from_slice(&raw_message(RTM_NEWLINK, 2, &[6, 7, 8, 9]));

        let messages: Vec<_> = MessageIter::new(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sequence_number(), 1);
        assert_eq!(messages[0].payload(), &[1, 2, 3, 4, 5]);
        assert_eq!(messages[1].sequence_number(), 2);
        assert_eq!(messages[1].payload(), &[6, 7, 8, 9]);
    }

    #[test]
    fn truncated_message_fails() {
        let mut buf = raw_message(RTM_NEWLINK, 1, &[0u8; 8]);
        // Advertise more bytes than the buffer holds.
        buf[0..4].copy_from_slice(&64u32.to_ne_bytes());

        let mut iter = MessageIter::new(&buf);
        assert!(matches!(iter.next(), Some(Err(Error::Truncated { advertised: 64, .. }))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn short_trailing_fragment_ends_iteration() {
        let mut buf = raw_message(RTM_NEWLINK, 1, &[]);
        buf.extend_from_slice(&[0u8; 7]);

        let mut iter = MessageIter::new(&buf);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
    }

    #[test]
    fn error_message_prefers_embedded_sequence() {
        let mut payload = (-17i32).to_ne_bytes().to_vec();
        let request = NetlinkHeader {
            length: 36,
            message_type: RTM_NEWLINK,
            flags: 0,
            sequence_number: 1_000_000_004,
            port_number: 0,
        };
        let mut embedded = [0u8; NetlinkHeader::SIZE];
        request.write_to(&mut embedded);
        payload.extend_from_slice(&embedded);

        let raw = raw_message(NLMSG_ERROR, 1_000_000_004, &payload);
        let message = MessageIter::new(&raw).next().unwrap().unwrap();
        let error = ErrorMessage::parse(&message).unwrap();
        assert_eq!(error.error, -17);
        assert_eq!(error.answered_sequence(message.header()), 1_000_000_004);
    }
}
