#![cfg_attr(not(test), warn(unused_crate_dependencies))]

//! Netlink wire format support: message framing, attribute TLVs and the
//! rtnetlink family headers this project speaks.
//!
//! Netlink messages are TLV-framed. Every message starts with a 16-byte
//! [`NetlinkHeader`], followed by a family-specific fixed struct (see
//! [`family`]), followed by a sequence of attributes, each padded to a
//! 4-byte boundary (see [`attr`]).
//!
//! The codec is deliberately byte-oriented: decoded messages are borrowed
//! views over the receive buffer ([`Message`]) and can be cloned verbatim,
//! so request derivation can rewrite a single attribute in place without
//! re-encoding (and silently dropping) attributes it does not know about.

use thiserror::Error;

pub mod attr;
pub mod builder;
pub mod consts;
pub mod family;
pub mod message;

pub use attr::{Attr, AttrIter};
pub use builder::MessageBuilder;
pub use message::{ErrorMessage, Message, MessageIter, NetlinkHeader};

/// Alignment unit for netlink headers and attributes, from `NLMSG_ALIGNTO`.
pub const ALIGNTO: usize = 4;

/// Align `len` up to the next 4-byte boundary.
#[inline]
pub const fn align(len: usize) -> usize {
    (len + ALIGNTO - 1) & !(ALIGNTO - 1)
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A message or attribute advertised more bytes than the buffer holds.
    #[error("truncated message: {advertised} bytes advertised, {available} available")]
    Truncated { advertised: usize, available: usize },
    /// An emitted message would exceed the transmit buffer bound.
    #[error("message of {len} bytes exceeds the {bound}-byte transmit bound")]
    Overflow { len: usize, bound: usize },
}
