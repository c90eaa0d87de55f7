//! The lifecycle driver: bootstrap dumps, the poll-driven main loop and
//! the ordered teardown.
//!
//! Single-threaded by construction. The only suspension points are the
//! `poll` on the netlink socket plus the signal descriptor (main loop)
//! and the bounded `poll` on the socket alone (acknowledgement waits).

use std::{
    os::fd::AsFd,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    libc,
    poll::{poll, PollFd, PollFlags, PollTimeout},
    sys::{
        signal::{SigSet, Signal},
        signalfd::{SfdFlags, SignalFd},
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use multihome_netlink::{
    socket::MULTICAST_GROUPS, Error as NetlinkError, RouteSocket, ACK_TIMEOUT,
};
use multihome_wire::consts::{RTM_GETADDR, RTM_GETLINK, RTM_GETROUTE, RTM_GETRULE};

use crate::{
    config::TableMap,
    engine::{Engine, Mode},
    resolver::{ResolveLinkName, SysLinkNames},
};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Netlink(#[from] NetlinkError),
    #[error("signal descriptor error: {0}")]
    Signal(Errno),
    #[error("poll error: {0}")]
    Poll(Errno),
}

pub struct Driver<R> {
    engine: Engine<R>,
    // Field order is drop order: the signal descriptor closes before the
    // socket, opposite to creation.
    signals: SignalFd,
    socket: RouteSocket,
}

impl Driver<SysLinkNames> {
    /// Open the netlink socket, block `SIGINT`/`SIGTERM` and route them
    /// through a signal descriptor. Creation order matters: teardown
    /// closes in the opposite order.
    pub fn new(mapping: TableMap) -> Result<Self, DriverError> {
        let socket = RouteSocket::open(MULTICAST_GROUPS)?;
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGTERM);
        mask.thread_block().map_err(DriverError::Signal)?;
        let signals = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
            .map_err(DriverError::Signal)?;
        Ok(Self { engine: Engine::new(mapping, SysLinkNames), socket, signals })
    }
}

impl<R: ResolveLinkName> Driver<R> {
    /// Bootstrap, serve events until a termination signal, tear down.
    pub fn run(&mut self) -> Result<(), DriverError> {
        self.bootstrap()?;
        let outcome = self.event_loop();
        if let Err(teardown_error) = self.teardown() {
            error!(error = %teardown_error, "teardown failed");
        }
        outcome
    }

    /// Dump links, addresses, routes and rules, in that order. The dump
    /// responses run through the ordinary handlers, so pre-existing
    /// state gets its mirrored entries installed here.
    fn bootstrap(&mut self) -> Result<(), DriverError> {
        self.engine.set_mode(Mode::Operational);
        for message_type in [RTM_GETLINK, RTM_GETADDR, RTM_GETROUTE, RTM_GETRULE] {
            self.dump_and_wait(message_type)?;
        }
        info!("bootstrap complete");
        Ok(())
    }

    /// Serve kernel events until the signal descriptor fires.
    fn event_loop(&mut self) -> Result<(), DriverError> {
        info!("entering main loop");
        loop {
            self.engine.queue.drain(&self.socket)?;

            let (socket_ready, signal_ready) = {
                let mut fds = [
                    PollFd::new(self.socket.as_fd(), PollFlags::POLLIN),
                    PollFd::new(self.signals.as_fd(), PollFlags::POLLIN),
                ];
                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => {}
                    Err(Errno::EINTR) => continue,
                    Err(errno) => return Err(DriverError::Poll(errno)),
                }
                (ready(&fds[0]), ready(&fds[1]))
            };

            if socket_ready {
                self.pump()?;
                self.engine.queue.drain(&self.socket)?;
            }
            if signal_ready {
                match self.signals.read_signal() {
                    Ok(Some(siginfo)) => {
                        info!(signal = siginfo.ssi_signo, "received termination signal")
                    }
                    Ok(None) => {}
                    Err(errno) => return Err(DriverError::Signal(errno)),
                }
                return Ok(());
            }
        }
    }

    /// Dump rules and routes again under `Reset` so the handlers emit a
    /// deletion for every entry in a custom table, then flush and await
    /// the last derived request. Best-effort: timeouts are logged, not
    /// fatal.
    fn teardown(&mut self) -> Result<(), DriverError> {
        info!("tearing down mirrored state");
        self.engine.set_mode(Mode::Reset);
        let mut last_dump = 0;
        for message_type in [RTM_GETRULE, RTM_GETROUTE] {
            last_dump = self.dump_and_wait(message_type)?;
        }
        self.engine.queue.drain(&self.socket)?;
        if let Some(last) = self.engine.sequences.last_issued() {
            if last != last_dump {
                self.await_logged(last);
            }
        }
        let released = self.engine.queue.clear();
        if released > 0 {
            warn!(released, "releasing requests still queued at shutdown");
        }
        info!("teardown complete");
        Ok(())
    }

    /// Enqueue one dump, flush it and wait for its acknowledgement.
    /// Returns the dump's sequence number.
    fn dump_and_wait(&mut self, message_type: u16) -> Result<u32, DriverError> {
        debug!(message_type, "requesting kernel state dump");
        let sequence = self.engine.enqueue_dump(message_type);
        self.engine.queue.drain(&self.socket)?;
        self.await_logged(sequence);
        Ok(sequence)
    }

    /// Await an acknowledgement, logging instead of failing on timeout:
    /// the ack may still arrive later and every derived request is
    /// idempotent.
    fn await_logged(&mut self, sequence: u32) {
        match self.await_ack(sequence) {
            Ok(()) => {}
            Err(DriverError::Netlink(NetlinkError::AckTimeout { seq })) => {
                error!(sequence = seq, "acknowledgement wait timed out, continuing")
            }
            Err(error) => error!(%error, sequence, "acknowledgement wait failed, continuing"),
        }
    }

    /// Poll the socket until the handler chain observes an
    /// `NLMSG_ERROR` matching `sequence`, for at most [`ACK_TIMEOUT`].
    ///
    /// Dump replies and unrelated notifications keep arriving while the
    /// wait is active; each one runs its handler, and anything those
    /// handlers derive is flushed before the next poll. The wait must
    /// never drain the socket looking only for the acknowledgement.
    fn await_ack(&mut self, sequence: u32) -> Result<(), DriverError> {
        self.engine.ack.begin_wait(sequence);
        let deadline = Instant::now() + ACK_TIMEOUT;
        while self.engine.ack.is_waiting() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.engine.ack.cancel();
                return Err(NetlinkError::AckTimeout { seq: sequence }.into());
            }

            let readable = {
                let mut fds = [PollFd::new(self.socket.as_fd(), PollFlags::POLLIN)];
                match poll(&mut fds, poll_timeout(remaining)) {
                    Ok(_) => ready(&fds[0]),
                    Err(Errno::EINTR) => continue,
                    Err(errno) => return Err(DriverError::Poll(errno)),
                }
            };
            if readable {
                self.pump()?;
                self.engine.queue.drain(&self.socket)?;
            }
        }

        match -self.engine.ack.last_error() {
            0 => {}
            libc::EEXIST | libc::ENOENT => {
                debug!(sequence, "reconciliation no-op acknowledged")
            }
            errno => warn!(sequence, errno, "request failed"),
        }
        Ok(())
    }

    /// Read batches until the socket would block, running every message
    /// through its handler.
    fn pump(&mut self) -> Result<(), DriverError> {
        loop {
            let batch = self.socket.receive(true)?;
            if batch.is_empty() {
                return Ok(());
            }
            self.engine.handle_batch(&batch);
        }
    }
}

fn ready(fd: &PollFd<'_>) -> bool {
    fd.revents().is_some_and(|revents| revents.contains(PollFlags::POLLIN))
}

fn poll_timeout(remaining: Duration) -> PollTimeout {
    PollTimeout::from(remaining.as_millis().min(u16::MAX as u128) as u16)
}
