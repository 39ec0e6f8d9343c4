// src/worker.rs
//! Fixed-size worker thread pool executing bounded per-connection I/O steps.
//!
//! The executor does not preserve per-connection task order on its own;
//! ordering for one connection is enforced by the Reactor holding that
//! connection's mutex for the duration of a submitted step (see
//! [`crate::reactor::Reactor`]).

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

enum Task {
    Job(Box<dyn FnOnce() + Send + 'static>),
    Shutdown,
}

/// Sizing for a [`WorkerExecutor`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Number of worker threads.
    pub num_workers: usize,
    /// Bound on the shared work queue; `submit` fails past this depth
    /// rather than growing without bound.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            queue_capacity: 1024,
        }
    }
}

/// Why [`WorkerExecutor::submit`] rejected a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The shared work queue is at `queue_capacity`.
    QueueFull,
    /// `stop()` has already been called (or is in progress).
    ShuttingDown,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "worker queue is full"),
            Self::ShuttingDown => write!(f, "worker pool is shutting down"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// A fixed pool of worker threads sharing one bounded task queue.
///
/// Tasks are small, non-blocking units of work bounded by a single
/// connection read-drain or write-flush cycle. A task that panics is
/// caught and logged; it never kills the worker thread that ran it.
pub struct WorkerExecutor {
    task_tx: Sender<Task>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerExecutor {
    /// Spawns `config.num_workers` named threads sharing one bounded queue.
    pub fn new(config: WorkerConfig) -> Self {
        let (task_tx, task_rx) = bounded(config.queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(config.num_workers);

        for idx in 0..config.num_workers {
            let rx = task_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("msgreactor-worker-{idx}"))
                .spawn(move || worker_loop(idx, rx))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }

        Self {
            task_tx,
            handles: Mutex::new(handles),
            shutdown,
        }
    }

    /// Submits `job` to the shared queue. Fails immediately rather than
    /// blocking if the queue is full or the pool is shutting down.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), SubmitError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(SubmitError::ShuttingDown);
        }
        match self.task_tx.try_send(Task::Job(Box::new(job))) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::ShuttingDown),
        }
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Sends one shutdown task per worker, then joins every thread. Any
    /// task already queued ahead of the shutdown markers still runs.
    /// Idempotent: a second call finds an empty handle list and returns
    /// immediately.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let mut handles = self.handles.lock().unwrap();
        for _ in 0..handles.len() {
            let _ = self.task_tx.send(Task::Shutdown);
        }
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(idx: usize, rx: Receiver<Task>) {
    debug!(worker = idx, "worker thread started");
    while let Ok(task) = rx.recv() {
        match task {
            Task::Job(job) => {
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).is_err() {
                    error!(worker = idx, "worker task panicked, continuing");
                }
            }
            Task::Shutdown => break,
        }
    }
    debug!(worker = idx, "worker thread exiting");
}
