//! The raw `AF_NETLINK/NETLINK_ROUTE` socket.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};

use bytes::{Bytes, BytesMut};
use nix::{
    errno::Errno,
    sys::socket::{
        self,
        sockopt::{RcvBuf, SndBuf},
        AddressFamily, MsgFlags, NetlinkAddr, SockFlag, SockProtocol, SockType,
    },
};
use tracing::trace;

use crate::Error;
use multihome_wire::consts::{
    RTMGRP_IPV4_IFADDR, RTMGRP_IPV4_ROUTE, RTMGRP_IPV6_IFADDR, RTMGRP_IPV6_ROUTE, RTMGRP_LINK,
    RTMGRP_NOTIFY,
};

/// Transmit buffer size. Also the emission bound for built requests, so
/// the queue can never hold a message the socket would reject.
pub const SEND_BUFFER_SIZE: usize = 64 * 1024;

/// Kernel-side receive buffer. Sized generously so bulk dumps do not
/// back-pressure inside the kernel.
pub const RECEIVE_BUFFER_SIZE: usize = 1024 * 1024;

/// Per-`recv` buffer, a multiple of the header size. 64 KiB rather than
/// one page: netlink truncates a multipart chunk silently when the
/// read buffer is smaller than the chunk, and chunk size tracks page
/// size on some platforms.
pub const RECEIVE_CHUNK: usize = 64 * 1024;

/// The multicast groups this daemon subscribes to.
pub const MULTICAST_GROUPS: u32 = RTMGRP_LINK
    | RTMGRP_NOTIFY
    | RTMGRP_IPV4_IFADDR
    | RTMGRP_IPV6_IFADDR
    | RTMGRP_IPV4_ROUTE
    | RTMGRP_IPV6_ROUTE;

/// A bound routing-netlink socket.
///
/// Closed on drop; the daemon closes it after the signal descriptor,
/// opposite to creation order.
#[derive(Debug)]
pub struct RouteSocket {
    fd: OwnedFd,
}

impl RouteSocket {
    /// Open a `NETLINK_ROUTE` socket bound to the given multicast
    /// groups, with the buffer sizes above.
    pub fn open(groups: u32) -> Result<Self, Error> {
        let fd = socket::socket(
            AddressFamily::Netlink,
            SockType::Raw,
            SockFlag::SOCK_CLOEXEC,
            SockProtocol::NetlinkRoute,
        )?;
        socket::setsockopt(&fd, SndBuf, &SEND_BUFFER_SIZE)?;
        socket::setsockopt(&fd, RcvBuf, &RECEIVE_BUFFER_SIZE)?;
        socket::bind(fd.as_raw_fd(), &NetlinkAddr::new(0, groups))?;
        Ok(Self { fd })
    }

    /// Send one encoded message to the kernel (pid 0, no groups).
    pub fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        let kernel = NetlinkAddr::new(0, 0);
        let sent = socket::sendto(self.fd.as_raw_fd(), bytes, &kernel, MsgFlags::empty())?;
        trace!(bytes = sent, "sent netlink request");
        Ok(())
    }

    /// Read one batch of messages.
    ///
    /// With `nonblocking`, an empty batch is returned when nothing is
    /// queued; a blocking read retries on `EINTR`.
    pub fn receive(&self, nonblocking: bool) -> Result<Bytes, Error> {
        let flags = if nonblocking { MsgFlags::MSG_DONTWAIT } else { MsgFlags::empty() };
        let mut buf = BytesMut::zeroed(RECEIVE_CHUNK);
        loop {
            match socket::recv(self.fd.as_raw_fd(), &mut buf, flags) {
                Ok(received) => {
                    trace!(bytes = received, "received netlink batch");
                    buf.truncate(received);
                    return Ok(buf.freeze());
                }
                Err(Errno::EAGAIN) if nonblocking => return Ok(Bytes::new()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }
}

impl AsFd for RouteSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
