//! The outbound request queue and the sequence counter feeding it.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::trace;

use crate::{socket::SEND_BUFFER_SIZE, Error, RouteSocket};

/// First self-issued sequence number. High enough to never collide with
/// kernel-originated sequence 0, and instantly recognisable in logs.
pub const INITIAL_SEQUENCE: u32 = 1_000_000_000;

/// Monotonically increasing sequence numbers for outbound requests.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    next: u32,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self { next: INITIAL_SEQUENCE }
    }

    /// Consume and return the next sequence number.
    pub fn next(&mut self) -> u32 {
        let sequence = self.next;
        self.next += 1;
        sequence
    }

    /// The most recently issued sequence number, if any.
    pub fn last_issued(&self) -> Option<u32> {
        (self.next > INITIAL_SEQUENCE).then(|| self.next - 1)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered queue of pending outbound requests.
///
/// Each entry owns its encoded bytes until a successful send releases
/// them. A failed send leaves the request at the front.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<Bytes>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an encoded request. Builders bound every message to the
    /// transmit buffer size; anything larger is a programming error.
    pub fn push(&mut self, request: Bytes) {
        assert!(request.len() <= SEND_BUFFER_SIZE, "request exceeds transmit buffer");
        self.pending.push_back(request);
    }

    /// Dispatch pending requests front-to-back, releasing each one's
    /// bytes after its send succeeds. Returns the number dispatched.
    pub fn drain(&mut self, socket: &RouteSocket) -> Result<usize, Error> {
        let mut dispatched = 0;
        while let Some(front) = self.pending.front() {
            socket.send(front)?;
            self.pending.pop_front();
            dispatched += 1;
        }
        if dispatched > 0 {
            trace!(dispatched, "drained request queue");
        }
        Ok(dispatched)
    }

    /// Drop everything still queued, returning how many requests were
    /// released unsent. Used by the final teardown drain.
    pub fn clear(&mut self) -> usize {
        let released = self.pending.len();
        self.pending.clear();
        released
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending requests in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.pending.iter()
    }

    /// Remove and return the front request without sending it.
    pub fn pop(&mut self) -> Option<Bytes> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_strictly_increasing() {
        let mut sequences = SequenceCounter::new();
        assert_eq!(sequences.last_issued(), None);
        let a = sequences.next();
        let b = sequences.next();
        let c = sequences.next();
        assert_eq!(a, INITIAL_SEQUENCE);
        assert!(a < b && b < c);
        assert_eq!(sequences.last_issued(), Some(c));
    }

    #[test]
    fn queue_preserves_insertion_order() {
        let mut queue = RequestQueue::new();
        queue.push(Bytes::from_static(b"first"));
        queue.push(Bytes::from_static(b"second"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().as_deref(), Some(&b"first"[..]));
        assert_eq!(queue.pop().as_deref(), Some(&b"second"[..]));
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_reports_released_requests() {
        let mut queue = RequestQueue::new();
        queue.push(Bytes::from_static(b"left over"));
        assert_eq!(queue.clear(), 1);
        assert!(queue.is_empty());
    }
}
