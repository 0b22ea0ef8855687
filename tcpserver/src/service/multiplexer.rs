//! Poll-based connection multiplexer.
//!
//! Single-threaded: one `poll(2)` readiness set holds the listener plus a
//! fixed number of client slots. A connection that becomes readable gets one
//! full FSM run, blocking reads and all, before the next slot is examined;
//! nothing here is concurrent. Idle poll timeouts double as checkpoint
//! ticks for the aggregate user counter.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{debug, error, info, warn};

use shared::store::{CounterStore, USER_COUNT_KEY};

use crate::fsm::{self, RequestContext};

/// Fixed literal written to a connection rejected for capacity.
pub const REJECT_MESSAGE: &[u8] = b"Too many clients, rejecting connection\n";

/// One client capacity unit: a socket paired with an opaque session id.
/// `stream == None` marks the slot free.
#[derive(Default)]
struct SessionSlot {
    stream: Option<TcpStream>,
    session_id: Option<u32>,
}

/// Readiness reported for one occupied client slot.
struct SlotEvent {
    slot: usize,
    readable: bool,
    hangup: bool,
}

enum WaitOutcome {
    /// Timeout with no events: checkpoint tick.
    Idle,
    /// EINTR: take the shutdown path.
    Interrupted,
    /// Any other poll failure: fatal.
    Failed(Errno),
    Ready {
        listener_ready: bool,
        events: Vec<SlotEvent>,
    },
}

/// Owns the listener, the client slots and the aggregate user counter, and
/// drives request state machines over ready connections until the shutdown
/// token is set.
pub struct Multiplexer {
    listener: TcpListener,
    slots: Vec<SessionSlot>,
    store: Box<dyn CounterStore>,
    shutdown: Arc<AtomicBool>,
    user_count: u32,
    sync_interval_ms: u16,
}

impl Multiplexer {
    /// Builds the multiplexer and loads the persisted user count (a missing
    /// key reads as zero).
    pub fn new(
        listener: TcpListener,
        mut store: Box<dyn CounterStore>,
        shutdown: Arc<AtomicBool>,
        max_clients: usize,
        sync_interval_ms: u16,
    ) -> Result<Self> {
        let user_count = store.get_counter(USER_COUNT_KEY)?;
        info!(user_count, max_clients, "multiplexer ready");
        let slots = (0..max_clients).map(|_| SessionSlot::default()).collect();
        Ok(Self {
            listener,
            slots,
            store,
            shutdown,
            user_count,
            sync_interval_ms,
        })
    }

    /// The aggregate user count as of the last load or request.
    pub fn user_count(&self) -> u32 {
        self.user_count
    }

    /// Runs the event loop until the shutdown token is set or the readiness
    /// wait fails. Every exit path checkpoints the counter and closes the
    /// store.
    pub fn run(&mut self) -> Result<()> {
        let mut fatal = None;

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.wait() {
                WaitOutcome::Idle => self.checkpoint(),
                WaitOutcome::Interrupted => {
                    info!("readiness wait interrupted, shutting down");
                    break;
                }
                WaitOutcome::Failed(errno) => {
                    error!(%errno, "readiness wait failed");
                    fatal = Some(errno);
                    break;
                }
                WaitOutcome::Ready {
                    listener_ready,
                    events,
                } => {
                    if listener_ready {
                        self.accept_client();
                    }
                    for event in events {
                        self.service_slot(event);
                    }
                }
            }
        }

        info!("shutting down, final checkpoint");
        self.checkpoint();
        if let Err(err) = self.store.close() {
            error!(%err, "failed to close counter store");
        }

        match fatal {
            Some(errno) => Err(anyhow!("readiness wait failed: {errno}")),
            None => Ok(()),
        }
    }

    /// One bounded readiness wait over the listener and all occupied slots.
    fn wait(&self) -> WaitOutcome {
        // Rebuilt every pass: only occupied slots are registered, with a map
        // from poll-set position back to slot index.
        let mut fds = Vec::with_capacity(self.slots.len() + 1);
        fds.push(PollFd::new(self.listener.as_fd(), PollFlags::POLLIN));
        let mut index_map = Vec::with_capacity(self.slots.len());
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(stream) = &entry.stream {
                fds.push(PollFd::new(stream.as_fd(), PollFlags::POLLIN));
                index_map.push(slot);
            }
        }

        match poll(&mut fds, PollTimeout::from(self.sync_interval_ms)) {
            Err(Errno::EINTR) => WaitOutcome::Interrupted,
            Err(errno) => WaitOutcome::Failed(errno),
            Ok(0) => WaitOutcome::Idle,
            Ok(_) => {
                let listener_ready = fds[0]
                    .revents()
                    .is_some_and(|r| r.contains(PollFlags::POLLIN));
                let hup_mask =
                    PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL;
                let events = index_map
                    .iter()
                    .zip(&fds[1..])
                    .filter_map(|(&slot, fd)| {
                        let revents = fd.revents()?;
                        let readable = revents.contains(PollFlags::POLLIN);
                        let hangup = revents.intersects(hup_mask);
                        (readable || hangup).then_some(SlotEvent {
                            slot,
                            readable,
                            hangup,
                        })
                    })
                    .collect();
                WaitOutcome::Ready {
                    listener_ready,
                    events,
                }
            }
        }
    }

    /// Accepts a pending connection into a free slot, or rejects it with the
    /// fixed capacity message when every slot is taken.
    fn accept_client(&mut self) {
        let (mut stream, addr) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%err, "accept failed");
                return;
            }
        };

        match self.slots.iter_mut().find(|slot| slot.stream.is_none()) {
            Some(slot) => {
                info!(%addr, "new connection");
                slot.stream = Some(stream);
            }
            None => {
                warn!(%addr, "client capacity reached, rejecting connection");
                if let Err(err) = stream.write_all(REJECT_MESSAGE) {
                    debug!(%err, "failed to deliver rejection notice");
                }
                // dropped here: closed without ever occupying a slot
            }
        }
    }

    /// Services one readiness event: a readable slot gets a full FSM run, a
    /// hangup is torn down without one. The slot is freed either way.
    fn service_slot(&mut self, event: SlotEvent) {
        let slot = &mut self.slots[event.slot];
        if event.readable {
            let Some(stream) = slot.stream.take() else {
                return;
            };
            debug!(slot = event.slot, "running request state machine");
            let ctx = RequestContext::new(stream, &mut slot.session_id, &mut self.user_count);
            fsm::run(ctx);
            slot.session_id = None;
        } else if event.hangup {
            debug!(slot = event.slot, "peer hung up before sending a request");
            slot.stream = None;
            slot.session_id = None;
        }
    }

    /// Writes the aggregate user count through to the persistent store.
    fn checkpoint(&mut self) {
        debug!(user_count = self.user_count, "checkpointing user count");
        if let Err(err) = self.store.put_counter(USER_COUNT_KEY, self.user_count) {
            error!(%err, "failed to checkpoint user count");
        }
    }
}
