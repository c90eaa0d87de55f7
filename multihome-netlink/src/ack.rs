//! Single-slot acknowledgement tracking.
//!
//! The kernel answers every request carrying `NLM_F_ACK` with an
//! `NLMSG_ERROR` whose sequence number matches the request; `error == 0`
//! is the acknowledgement, negative values are `-errno`. The lifecycle
//! driver awaits one sequence number at a time, so a single slot
//! suffices; a second concurrent wait is a programming error.

use std::time::Duration;

/// Budget for one acknowledgement wait during bootstrap and teardown.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Default)]
pub struct AckTracker {
    waiting: bool,
    awaited_seq: u32,
    last_error: i32,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the tracker for the given sequence number.
    pub fn begin_wait(&mut self, sequence: u32) {
        assert!(!self.waiting, "concurrent acknowledgement waits");
        self.waiting = true;
        self.awaited_seq = sequence;
        self.last_error = 0;
    }

    /// Feed an observed `NLMSG_ERROR`. Returns whether it satisfied the
    /// active wait.
    pub fn observe(&mut self, sequence: u32, error: i32) -> bool {
        if self.waiting && sequence == self.awaited_seq {
            self.last_error = error;
            self.waiting = false;
            return true;
        }
        false
    }

    /// Abandon the active wait (timeout path) so the next
    /// [`AckTracker::begin_wait`] is legal.
    pub fn cancel(&mut self) {
        self.waiting = false;
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn awaited_sequence(&self) -> u32 {
        self.awaited_seq
    }

    /// The error code of the most recently completed wait; 0 on success.
    pub fn last_error(&self) -> i32 {
        self.last_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_error_completes_the_wait() {
        let mut tracker = AckTracker::new();
        tracker.begin_wait(1_000_000_003);
        assert!(tracker.is_waiting());
        assert!(!tracker.observe(7, -17));
        assert!(tracker.is_waiting());
        assert!(tracker.observe(1_000_000_003, 0));
        assert!(!tracker.is_waiting());
        assert_eq!(tracker.last_error(), 0);
    }

    #[test]
    fn failure_code_is_recorded() {
        let mut tracker = AckTracker::new();
        tracker.begin_wait(42);
        assert!(tracker.observe(42, -17));
        assert_eq!(tracker.last_error(), -17);
    }

    #[test]
    fn cancel_allows_a_new_wait() {
        let mut tracker = AckTracker::new();
        tracker.begin_wait(1);
        tracker.cancel();
        tracker.begin_wait(2);
        assert_eq!(tracker.awaited_sequence(), 2);
    }

    #[test]
    #[should_panic(expected = "concurrent acknowledgement waits")]
    fn concurrent_waits_are_rejected() {
        let mut tracker = AckTracker::new();
        tracker.begin_wait(1);
        tracker.begin_wait(2);
    }
}
