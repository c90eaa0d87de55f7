//! Owned-buffer message emission.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{align, attr::ATTR_HEADER_LEN, Error, NetlinkHeader};

/// Default emission bound. Matches the transport's transmit buffer so the
/// request queue can never hold a message `sendmsg` would reject.
pub const DEFAULT_BOUND: usize = 64 * 1024;

/// Builds one outbound netlink message: header, family struct, then
/// attributes, each aligned to 4 bytes. The header length field is filled
/// in by [`MessageBuilder::finish`].
#[derive(Debug)]
pub struct MessageBuilder {
    buf: BytesMut,
    bound: usize,
}

impl MessageBuilder {
    pub fn new(message_type: u16, flags: u16, sequence_number: u32) -> Self {
        Self::with_bound(message_type, flags, sequence_number, DEFAULT_BOUND)
    }

    pub fn with_bound(message_type: u16, flags: u16, sequence_number: u32, bound: usize) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.resize(NetlinkHeader::SIZE, 0);
        let header = NetlinkHeader {
            length: 0,
            message_type,
            flags,
            sequence_number,
            port_number: 0,
        };
        header.write_to(&mut buf);
        Self { buf, bound }
    }

    /// Append the family-specific fixed struct. The struct follows the
    /// header unpadded; padding up to the first attribute is applied
    /// lazily so attribute-less messages keep the kernel's
    /// `NLMSG_LENGTH(sizeof(struct …))` length.
    pub fn family(mut self, family: &[u8]) -> Self {
        self.buf.put_slice(family);
        self
    }

    /// Append one attribute, padding the buffer to a 4-byte boundary
    /// first. The attribute's length field holds the unpadded value.
    pub fn attr(mut self, kind: u16, value: &[u8]) -> Result<Self, Error> {
        let start = align(self.buf.len());
        let len = start + ATTR_HEADER_LEN + value.len();
        if len > self.bound {
            return Err(Error::Overflow { len, bound: self.bound });
        }
        self.buf.resize(start, 0);
        self.buf.put_u16_ne((ATTR_HEADER_LEN + value.len()) as u16);
        self.buf.put_u16_ne(kind);
        self.buf.put_slice(value);
        Ok(self)
    }

    /// Append a 4-byte native-endian attribute.
    pub fn attr_u32(self, kind: u16, value: u32) -> Result<Self, Error> {
        self.attr(kind, &value.to_ne_bytes())
    }

    /// Finalise the header length field and yield the owned bytes.
    pub fn finish(mut self) -> Bytes {
        let length = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&length.to_ne_bytes());
        self.buf.freeze()
    }
}
