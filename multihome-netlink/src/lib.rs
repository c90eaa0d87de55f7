#![cfg_attr(not(test), warn(unused_crate_dependencies))]

//! The routing-netlink transport layer: a raw `NETLINK_ROUTE` socket,
//! the outbound request queue, single-slot acknowledgement tracking and
//! the request builders that derive mutating requests from observed
//! kernel state.
//!
//! Linux-only; everything here ultimately talks to `AF_NETLINK`.

use thiserror::Error;

pub mod ack;
pub mod queue;
pub mod requests;
pub mod socket;

pub use ack::{AckTracker, ACK_TIMEOUT};
pub use queue::{RequestQueue, SequenceCounter};
pub use socket::RouteSocket;

#[derive(Debug, Error)]
pub enum Error {
    /// A socket-level send/receive failure.
    #[error("netlink socket error: {0}")]
    Socket(#[from] nix::errno::Errno),
    /// A wire-level encoding failure.
    #[error(transparent)]
    Wire(#[from] multihome_wire::Error),
    /// An acknowledgement wait exceeded its budget.
    #[error("timed out waiting for acknowledgement of sequence {seq}")]
    AckTimeout { seq: u32 },
}
