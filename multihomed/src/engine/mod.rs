//! The reconciliation engine: one owned value holding the mode, the
//! interface mapping, the sequence counter, the request queue and the
//! acknowledgement slot, with one handler per message class.
//!
//! Handlers never propagate errors; they log and continue. Everything a
//! handler derives goes through the request queue, so enqueue order is
//! preserved on the wire.

mod addr;
mod link;
mod route;
mod rule;

use bytes::Bytes;
use nix::libc;
use tracing::{debug, info, trace, warn};

use multihome_netlink::{requests, AckTracker, RequestQueue, SequenceCounter};
use multihome_wire::{
    consts::{
        NLMSG_DONE, NLMSG_ERROR, NLMSG_NOOP, NLMSG_OVERRUN, RTM_DELADDR, RTM_DELLINK,
        RTM_DELROUTE, RTM_DELRULE, RTM_GETADDR, RTM_GETLINK, RTM_GETROUTE, RTM_GETRULE,
        RTM_NEWADDR, RTM_NEWLINK, RTM_NEWROUTE, RTM_NEWRULE,
    },
    ErrorMessage, Message, MessageIter,
};

use crate::{config::TableMap, resolver::ResolveLinkName};

/// Reconciler policy selector. Not a protocol state: it only gates which
/// derived requests the handlers emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Observe only; never derive requests.
    #[default]
    Undefined,
    /// Steady state: mirror main-table routes, maintain source rules.
    Operational,
    /// Teardown: delete everything observed in a custom table.
    Reset,
}

pub struct Engine<R> {
    pub(crate) mapping: TableMap,
    pub(crate) resolver: R,
    pub(crate) mode: Mode,
    pub(crate) sequences: SequenceCounter,
    pub(crate) queue: RequestQueue,
    pub(crate) ack: AckTracker,
}

impl<R: ResolveLinkName> Engine<R> {
    pub fn new(mapping: TableMap, resolver: R) -> Self {
        Self {
            mapping,
            resolver,
            mode: Mode::Undefined,
            sequences: SequenceCounter::new(),
            queue: RequestQueue::new(),
            ack: AckTracker::new(),
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        info!(?mode, "mode transition");
        self.mode = mode;
    }

    /// Enqueue a dump request, returning its sequence number for the
    /// acknowledgement wait.
    pub fn enqueue_dump(&mut self, message_type: u16) -> u32 {
        let sequence = self.sequences.next();
        self.queue.push(requests::dump_request(message_type, sequence));
        sequence
    }

    /// Run every message of a received batch through its handler. A
    /// truncated tail is discarded; the messages before it stand.
    pub fn handle_batch(&mut self, batch: &Bytes) {
        for decoded in MessageIter::new(batch) {
            match decoded {
                Ok(message) => self.handle_message(&message),
                Err(error) => {
                    warn!(%error, "discarding malformed netlink batch tail");
                    break;
                }
            }
        }
    }

    pub fn handle_message(&mut self, message: &Message<'_>) {
        match message.message_type() {
            NLMSG_NOOP => {}
            NLMSG_DONE => trace!("end of multipart dump"),
            NLMSG_OVERRUN => warn!("netlink receive overrun"),
            NLMSG_ERROR => self.handle_error(message),
            RTM_NEWLINK | RTM_DELLINK | RTM_GETLINK => link::handle(self, message),
            RTM_NEWADDR | RTM_DELADDR | RTM_GETADDR => addr::handle(self, message),
            RTM_NEWROUTE | RTM_DELROUTE | RTM_GETROUTE => route::handle(self, message),
            RTM_NEWRULE | RTM_DELRULE | RTM_GETRULE => rule::handle(self, message),
            other => debug!(message_type = other, "ignoring unhandled netlink message type"),
        }
    }

    /// `NLMSG_ERROR` carries both failures and acknowledgements
    /// (`error == 0`). A message matching the awaited sequence completes
    /// the active wait; everything else is logged only, since `EEXIST`
    /// and `ENOENT` are routine while reconciling.
    fn handle_error(&mut self, message: &Message<'_>) {
        let Some(error) = ErrorMessage::parse(message) else {
            warn!("discarding truncated NLMSG_ERROR");
            return;
        };
        let sequence = error.answered_sequence(message.header());
        if self.ack.observe(sequence, error.error) {
            trace!(sequence, error = error.error, "awaited acknowledgement");
            return;
        }
        match -error.error {
            0 => trace!(sequence, "acknowledgement outside a wait"),
            libc::EEXIST => debug!(sequence, "entry already present"),
            libc::ENOENT => debug!(sequence, "entry already absent"),
            errno => trace!(sequence, errno, "netlink error outside a wait"),
        }
    }
}

/// Classify an event type against its new/del/get triple, for logs.
fn event_name(message_type: u16, new: u16, del: u16) -> &'static str {
    if message_type == new {
        "new"
    } else if message_type == del {
        "del"
    } else {
        "get"
    }
}
