// src/connection.rs
//! Per-socket state: read accumulator, framing, outbound queue, lifecycle.

use crate::buffer::Buffer;
use crate::outbound::{EnqueueError, OutboundQueue};
use crate::pool::BufferPool;
use mio::net::TcpStream;
use std::io::{ErrorKind, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Largest frame guaranteed to be delivered.
pub const MAX_MESSAGE_SIZE: usize = 4096;
/// Read accumulator is force-disconnected once it exceeds this many bytes.
pub const MAX_ACCUMULATOR_SIZE: usize = MAX_MESSAGE_SIZE * 10;
/// Frame delimiter.
pub const DELIM: u8 = b'\n';

/// A per-frame callback: connection id, frame payload (delimiter stripped),
/// and a handle back to the connection for replying via
/// [`Connection::send_message`].
pub type MessageHandler = dyn Fn(usize, &[u8], &mut Connection) + Send + Sync;

/// Lifecycle state of a [`Connection`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Reads and writes are permitted.
    Open,
    /// All operations are no-ops; the socket handle is no longer valid.
    Closed,
}

/// Per-socket state owned by the Reactor and operated on by worker threads
/// under the Reactor's per-connection mutual-exclusion guarantee (see
/// [`crate::reactor::Reactor`]).
///
/// Invariants: reads are only issued while [`ConnState::Open`]; `close()` is
/// idempotent; after close the `OutboundQueue` is cleared, returning its
/// buffers to the pool. The read accumulator never exceeds
/// [`MAX_ACCUMULATOR_SIZE`]; exceeding it forces disconnect.
pub struct Connection {
    id: usize,
    stream: TcpStream,
    peer_addr: SocketAddr,
    read_accum: Vec<u8>,
    outbound: OutboundQueue,
    scratch: Buffer,
    last_activity: Instant,
    state: ConnState,
}

impl Connection {
    /// Wraps an accepted, already-nonblocking socket.
    pub fn new(id: usize, stream: TcpStream, peer_addr: SocketAddr, pool: Arc<BufferPool>) -> Self {
        Self {
            id,
            stream,
            peer_addr,
            read_accum: Vec::with_capacity(MAX_MESSAGE_SIZE),
            outbound: OutboundQueue::new(pool),
            scratch: Buffer::with_capacity(MAX_MESSAGE_SIZE + 1),
            last_activity: Instant::now(),
            state: ConnState::Open,
        }
    }

    /// Stable connection identifier (the Reactor's slab key).
    pub fn id(&self) -> usize {
        self.id
    }

    /// The peer's address, informational only.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// `true` while reads/writes are still permitted.
    pub fn is_open(&self) -> bool {
        self.state == ConnState::Open
    }

    /// Timestamp of the most recent successful read.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Borrow the underlying socket, for registering/reregistering with the
    /// readiness facility.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Mutably borrow the underlying socket.
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// `true` once every queued buffer has been fully sent.
    pub fn outbound_is_empty(&self) -> bool {
        self.outbound.is_empty()
    }

    /// Drains the socket with successive reads until a transient "try
    /// again" indication, a real error, or EOF. Each chunk is appended to
    /// the read accumulator; on drain completion complete frames are
    /// extracted and dispatched to `handler` in wire order.
    ///
    /// A real I/O error or EOF closes the connection. Exceeding
    /// [`MAX_ACCUMULATOR_SIZE`] also forces a close, discarding any
    /// undelimited tail.
    pub fn handle_read(&mut self, handler: &MessageHandler) -> std::io::Result<()> {
        if !self.is_open() {
            return Ok(());
        }

        let mut chunk = [0u8; 8192];
        let mut fatal: Option<std::io::Error> = None;

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!(id = self.id, "peer closed connection");
                    self.close();
                    break;
                }
                Ok(n) => {
                    self.last_activity = Instant::now();
                    self.read_accum.extend_from_slice(&chunk[..n]);
                    if self.read_accum.len() > MAX_ACCUMULATOR_SIZE {
                        warn!(
                            id = self.id,
                            accumulated = self.read_accum.len(),
                            "read accumulator exceeded cap, forcing disconnect"
                        );
                        self.close();
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }

        if self.is_open() {
            self.extract_frames(handler);
        }

        if let Some(e) = fatal {
            warn!(id = self.id, error = %e, "read error, closing connection");
            self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Repeatedly extracts the earliest `\n`-delimited frame from the read
    /// accumulator and, if non-empty, invokes `handler`. Stops once no
    /// complete frame remains or the connection has been closed mid-loop
    /// (e.g. by the handler itself).
    fn extract_frames(&mut self, handler: &MessageHandler) {
        loop {
            if !self.is_open() {
                return;
            }
            let Some(pos) = self.read_accum.iter().position(|&b| b == DELIM) else {
                return;
            };
            let frame: Vec<u8> = self.read_accum.drain(..=pos).collect();
            let payload_len = frame.len() - 1;
            if payload_len > 0 {
                let id = self.id;
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    handler(id, &frame[..payload_len], self);
                }));
                if let Err(panic) = result {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    warn!(id, message = %message, "message handler panicked, frame dropped");
                }
            }
        }
    }

    /// Precondition: the outbound queue is non-empty. Repeatedly sends from
    /// the head buffer, popping it once complete, until the socket reports
    /// "try again" or the queue empties. Any other error is fatal to this
    /// connection only.
    pub fn handle_write(&mut self) -> std::io::Result<()> {
        if !self.is_open() {
            return Ok(());
        }

        let mut fatal: Option<std::io::Error> = None;

        loop {
            let complete = {
                let Some(guard) = self.outbound.front_mut() else {
                    break;
                };
                match guard.send_partial(&mut self.stream) {
                    Ok(_) => guard.is_complete(),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        fatal = Some(e);
                        break;
                    }
                }
            };
            self.last_activity = Instant::now();
            if complete {
                self.outbound.pop();
            } else {
                break;
            }
        }

        if let Some(e) = fatal {
            warn!(id = self.id, error = %e, "write error, closing connection");
            self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Formats `payload || '\n'` into the scratch buffer and enqueues it.
    /// A no-op on a closed connection. Returns `true` if the outbound queue
    /// transitioned from empty to non-empty, which the caller (the Reactor)
    /// must use to re-arm write-interest on this socket.
    pub fn send_message(&mut self, payload: &[u8]) -> Result<bool, EnqueueError> {
        if !self.is_open() {
            return Ok(false);
        }
        self.scratch.reset();
        if !self.scratch.append(payload) || !self.scratch.append(&[DELIM]) {
            return Err(EnqueueError::TooLarge);
        }
        let framed = self.scratch.as_slice().to_vec();
        self.enqueue_raw(&framed)
    }

    /// Enqueues `bytes` verbatim, without appending a delimiter. Used for
    /// forwarding an already-framed [`Buffer`]'s contents (e.g. broadcast).
    pub fn enqueue_raw(&mut self, bytes: &[u8]) -> Result<bool, EnqueueError> {
        if !self.is_open() {
            return Ok(false);
        }
        let was_empty = self.outbound.is_empty();
        self.outbound.enqueue(bytes)?;
        Ok(was_empty)
    }

    /// Idempotent. Clears the outbound queue (returning buffers to the
    /// pool) and marks the connection disconnected. The socket handle
    /// itself is closed by the Reactor dropping this `Connection`.
    pub fn close(&mut self) {
        if self.state == ConnState::Closed {
            return;
        }
        self.state = ConnState::Closed;
        self.outbound.clear();
    }
}
