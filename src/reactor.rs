// src/reactor.rs
//! Single-threaded event loop owning the listening socket and the
//! readiness facility, dispatching accept/read/write work to a
//! [`WorkerExecutor`].

use crate::accountant::MemoryAccountant;
use crate::connection::{Connection, MessageHandler};
use crate::error::ServerError;
use crate::outbound::EnqueueError;
use crate::pool::{BufferPool, PoolConfig};
use crate::worker::{WorkerConfig, WorkerExecutor};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use slab::Slab;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const LISTENER_TOKEN: Token = Token(usize::MAX);
const WAKER_TOKEN: Token = Token(usize::MAX - 1);
const EVENT_BATCH: usize = 100;
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Sizing and capacity knobs for a [`Reactor`].
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// Address to bind the listening socket to.
    pub bind_addr: SocketAddr,
    /// Maximum number of simultaneously tracked connections. Also used as
    /// the listen backlog.
    pub max_connections: usize,
    /// Worker thread pool sizing.
    pub workers: WorkerConfig,
    /// Per-connection outbound buffer pool.
    pub outbound_pool: PoolConfig,
    /// Advisory process-wide memory ceiling in bytes, shared by every
    /// pool this reactor creates.
    pub memory_ceiling: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            workers: WorkerConfig::default(),
            outbound_pool: PoolConfig {
                buffer_size: 8192,
                max_pool_size: 4096,
                min_pool_size: 16,
            },
            memory_ceiling: crate::accountant::DEFAULT_MEMORY_CEILING,
        }
    }
}

/// A slab slot: one live connection guarded by its own mutex so that a
/// read step and a write step for the same connection never run
/// concurrently, per spec's "mutually exclusive per-connection steps"
/// requirement (see [`crate::worker::WorkerExecutor`]).
struct Slot {
    conn: Arc<Mutex<Connection>>,
}

/// Single-threaded reactor: owns the listening socket and the `mio::Poll`
/// readiness facility, accepts new connections, dispatches readiness
/// events to [`Connection`]s via a [`WorkerExecutor`], and performs
/// orderly shutdown.
///
/// Only the reactor thread ever touches the connection table; worker
/// threads only ever touch the `Connection` they were handed, through its
/// mutex.
pub struct Reactor {
    config: ReactorConfig,
    poll: Mutex<Poll>,
    registry: Arc<mio::Registry>,
    waker: Arc<Waker>,
    listener: Mutex<TcpListener>,
    connections: Mutex<Slab<Slot>>,
    running: Arc<AtomicBool>,
    workers: WorkerExecutor,
    accountant: Arc<MemoryAccountant>,
    outbound_pool: Arc<BufferPool>,
    handler: Arc<MessageHandler>,
}

impl Reactor {
    /// Binds the listening socket, creates the readiness facility, and
    /// registers the listener with edge-triggered read-interest. Does not
    /// start accepting connections; call [`Reactor::run`] for that.
    pub fn start(
        config: ReactorConfig,
        handler: Arc<MessageHandler>,
    ) -> Result<Self, ServerError> {
        let socket = Socket::new(
            Domain::for_address(config.bind_addr),
            Type::STREAM,
            Some(Protocol::TCP),
        )
        .map_err(ServerError::Bind)?;
        socket.set_reuse_address(true).map_err(ServerError::Bind)?;
        socket
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        socket
            .bind(&config.bind_addr.into())
            .map_err(ServerError::Bind)?;
        socket
            .listen(config.max_connections as i32)
            .map_err(ServerError::Listen)?;

        let mut listener = TcpListener::from_std(socket.into());

        let poll = Poll::new().map_err(ServerError::PollInit)?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)
            .map_err(ServerError::PollInit)?;

        let waker =
            Arc::new(Waker::new(poll.registry(), WAKER_TOKEN).map_err(ServerError::PollInit)?);
        let registry = Arc::new(poll.registry().try_clone().map_err(ServerError::PollInit)?);

        let accountant = Arc::new(MemoryAccountant::new(config.memory_ceiling));
        let outbound_pool = Arc::new(BufferPool::with_accountant(
            config.outbound_pool,
            Some(Arc::clone(&accountant)),
        ));
        let workers = WorkerExecutor::new(config.workers);

        info!(addr = %config.bind_addr, max_connections = config.max_connections, "reactor bound and listening");

        Ok(Self {
            config,
            poll: Mutex::new(poll),
            registry,
            waker,
            listener: Mutex::new(listener),
            connections: Mutex::new(Slab::new()),
            running: Arc::new(AtomicBool::new(true)),
            workers,
            accountant,
            outbound_pool,
            handler,
        })
    }

    /// A handle that can flip `running` to false and unblock a pending
    /// `poll.poll()` from another thread (typically a signal handler).
    pub fn stopper(&self) -> ReactorStopper {
        ReactorStopper {
            running: Arc::clone(&self.running),
            waker: Arc::clone(&self.waker),
        }
    }

    /// The shared memory accountant backing every pool this reactor owns.
    pub fn accountant(&self) -> &Arc<MemoryAccountant> {
        &self.accountant
    }

    /// Number of currently tracked connections.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// The address the listening socket actually bound to. Useful when
    /// `bind_addr`'s port was `0` (let the OS choose one).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.lock().unwrap().local_addr()
    }

    /// Enqueues `bytes` (framed with the newline delimiter) on every live
    /// connection. Cross-connection ordering is unspecified; each
    /// connection's own bytes stay in enqueue order.
    pub fn broadcast(&self, bytes: &[u8]) {
        let connections = self.connections.lock().unwrap();
        for (id, slot) in connections.iter() {
            let mut conn = slot.conn.lock().unwrap();
            match conn.send_message(bytes) {
                Ok(true) => self.rearm_write(id, &mut conn),
                Ok(false) => {}
                Err(e) => warn!(id, error = %e, "broadcast enqueue failed"),
            }
        }
    }

    /// Enqueues `bytes` (framed) directly onto one connection, by id.
    pub fn send_to_client(&self, id: usize, bytes: &[u8]) -> Result<(), EnqueueError> {
        let connections = self.connections.lock().unwrap();
        let Some(slot) = connections.get(id) else {
            return Ok(());
        };
        let mut conn = slot.conn.lock().unwrap();
        let became_nonempty = conn.send_message(bytes)?;
        if became_nonempty {
            self.rearm_write(id, &mut conn);
        }
        Ok(())
    }

    /// Closes every connection whose last activity predates
    /// `now - timeout`.
    pub fn cleanup_inactive(&self, timeout: Duration) {
        let now = Instant::now();
        let mut connections = self.connections.lock().unwrap();
        let stale: Vec<usize> = connections
            .iter()
            .filter_map(|(id, slot)| {
                let conn = slot.conn.lock().unwrap();
                (now.saturating_duration_since(conn.last_activity()) > timeout).then_some(id)
            })
            .collect();
        for id in stale {
            self.close_connection(&mut connections, id);
        }
    }

    /// Runs the event loop until [`ReactorStopper::stop`] is called (or a
    /// signal handler wired to it fires). Returns once shutdown is
    /// complete: every connection closed, the listener and readiness
    /// facility released.
    ///
    /// Takes `&self` rather than consuming the reactor so that callers can
    /// run it on a background thread while still holding a handle to call
    /// [`Reactor::broadcast`], [`Reactor::send_to_client`], or
    /// [`Reactor::connection_count`] from elsewhere (typically via
    /// `Arc<Reactor>`).
    pub fn run(&self) -> Result<(), ServerError> {
        let mut events = Events::with_capacity(EVENT_BATCH);

        while self.running.load(Ordering::Acquire) {
            {
                let mut poll = self.poll.lock().unwrap();
                if let Err(e) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                    if e.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(ServerError::PollInit(e));
                }
            }

            for event in events.iter() {
                match event.token() {
                    WAKER_TOKEN => continue,
                    LISTENER_TOKEN => self.accept_loop(),
                    Token(id) => {
                        let hangup = event.is_read_closed() || event.is_write_closed() || event.is_error();
                        if event.is_readable() {
                            self.dispatch_read(id);
                        }
                        if event.is_writable() {
                            self.dispatch_write(id);
                        }
                        if hangup {
                            let mut connections = self.connections.lock().unwrap();
                            self.close_connection(&mut connections, id);
                        }
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn accept_loop(&self) {
        loop {
            let accepted = self.listener.lock().unwrap().accept();
            match accepted {
                Ok((stream, peer_addr)) => self.accept_one(stream, peer_addr),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "accept error, continuing");
                    break;
                }
            }
        }
    }

    fn accept_one(&self, mut stream: mio::net::TcpStream, peer_addr: SocketAddr) {
        let mut connections = self.connections.lock().unwrap();
        if connections.len() >= self.config.max_connections {
            debug!(peer = %peer_addr, "max_connections reached, rejecting");
            return;
        }
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY, continuing anyway");
        }

        let entry = connections.vacant_entry();
        let id = entry.key();
        let token = Token(id);

        if let Err(e) = self.registry.register(
            &mut stream,
            token,
            Interest::READABLE,
        ) {
            warn!(error = %e, "failed to register accepted socket");
            return;
        }

        let conn = Connection::new(id, stream, peer_addr, Arc::clone(&self.outbound_pool));
        entry.insert(Slot {
            conn: Arc::new(Mutex::new(conn)),
        });
        debug!(id, peer = %peer_addr, "accepted connection");
    }

    fn dispatch_read(&self, id: usize) {
        let slot_conn = {
            let connections = self.connections.lock().unwrap();
            connections.get(id).map(|s| Arc::clone(&s.conn))
        };
        let Some(slot_conn) = slot_conn else { return };
        let handler = Arc::clone(&self.handler);
        let registry = Arc::clone(&self.registry);

        let submitted = self.workers.submit(move || {
            let mut conn = slot_conn.lock().unwrap();
            if let Err(e) = conn.handle_read(&*handler) {
                debug!(error = %e, "connection read error");
                return;
            }
            // The handler may have enqueued a reply via `send_message`
            // from this worker thread; re-arm write-interest so the
            // edge-triggered facility fires on the socket becoming
            // writable instead of leaving the reply stuck in the queue.
            if conn.is_open() && !conn.outbound_is_empty() {
                let _ = registry.reregister(
                    conn.stream_mut(),
                    Token(id),
                    Interest::READABLE | Interest::WRITABLE,
                );
            }
        });
        if let Err(e) = submitted {
            warn!(id, error = %e, "failed to submit read task");
        }
    }

    fn dispatch_write(&self, id: usize) {
        let slot_conn = {
            let connections = self.connections.lock().unwrap();
            connections.get(id).map(|s| Arc::clone(&s.conn))
        };
        let Some(slot_conn) = slot_conn else { return };
        let registry = Arc::clone(&self.registry);

        let submitted = self.workers.submit(move || {
            let mut conn = slot_conn.lock().unwrap();
            if let Err(e) = conn.handle_write() {
                debug!(error = %e, "connection write error");
                return;
            }
            // Avoid busy-spinning on an always-writable socket: drop
            // write-interest once the outbound queue has drained.
            if conn.is_open() && conn.outbound_is_empty() {
                let _ = registry.reregister(conn.stream_mut(), Token(id), Interest::READABLE);
            }
        });
        if let Err(e) = submitted {
            warn!(id, error = %e, "failed to submit write task");
        }
    }

    /// Re-registers write interest on `id`'s socket after its
    /// `OutboundQueue` transitioned from empty to non-empty. Called from
    /// the reactor thread only (`broadcast`/`send_to_client`); the
    /// read/write worker steps themselves never need to re-arm because
    /// they run to `WouldBlock` or queue-empty before returning.
    fn rearm_write(&self, id: usize, conn: &mut Connection) {
        if let Err(e) = self.registry.reregister(
            conn.stream_mut(),
            Token(id),
            Interest::READABLE | Interest::WRITABLE,
        ) {
            warn!(id, error = %e, "failed to re-arm write interest");
        }
    }

    fn close_connection(&self, connections: &mut Slab<Slot>, id: usize) {
        if let Some(slot) = connections.try_remove(id) {
            let mut conn = slot.conn.lock().unwrap();
            conn.close();
            let _ = self.registry.deregister(conn.stream_mut());
            debug!(id, "connection closed and deregistered");
        }
    }

    fn shutdown(&self) {
        info!("reactor shutting down");
        let mut connections = self.connections.lock().unwrap();
        let ids: Vec<usize> = connections.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.close_connection(&mut connections, id);
        }
        drop(connections);
        let _ = self.registry.deregister(&mut *self.listener.lock().unwrap());
        self.workers.stop();
        info!("reactor shutdown complete");
    }
}

/// A handle used to request cooperative shutdown of a running [`Reactor`]
/// from another thread (a signal handler, a supervisor). Idempotent.
#[derive(Clone)]
pub struct ReactorStopper {
    running: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ReactorStopper {
    /// Flips the running flag and wakes a blocked `poll.poll()` so
    /// shutdown is observed in well under the event loop's batch timeout.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let _ = self.waker.wake();
    }
}
