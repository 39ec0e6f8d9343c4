// src/outbound.rs
//! Per-connection FIFO of pooled buffers awaiting transmission.

use crate::pool::{BufferPool, PoolGuard};
use std::collections::VecDeque;
use std::sync::Arc;

/// Why [`OutboundQueue::enqueue`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The backing [`BufferPool`] has no free or fresh buffer to hand out.
    PoolExhausted,
    /// `bytes` is larger than the pool's buffer capacity.
    TooLarge,
}

impl std::fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoolExhausted => write!(f, "buffer pool exhausted"),
            Self::TooLarge => write!(f, "message exceeds pooled buffer capacity"),
        }
    }
}

impl std::error::Error for EnqueueError {}

/// Ordered sequence of pooled buffers pending transmission on one
/// connection, backed by a shared [`BufferPool`].
///
/// The head of the queue is the buffer currently being drained by
/// [`crate::connection::Connection::handle_write`]; its send cursor only
/// ever advances. Once the head is complete it is popped and its
/// [`PoolGuard`] drops, returning the buffer to the pool.
pub struct OutboundQueue {
    queue: VecDeque<PoolGuard>,
    pool: Arc<BufferPool>,
}

impl OutboundQueue {
    /// Creates an empty queue drawing buffers from `pool`.
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            queue: VecDeque::new(),
            pool,
        }
    }

    /// Acquires a buffer from the pool, appends `bytes`, and pushes it onto
    /// the back of the queue.
    ///
    /// On acquire failure or append failure nothing is left queued: a
    /// successfully-acquired-but-unappendable buffer is dropped (returning
    /// it to the pool) before the error is surfaced.
    pub fn enqueue(&mut self, bytes: &[u8]) -> Result<(), EnqueueError> {
        let Some(mut guard) = self.pool.acquire() else {
            return Err(EnqueueError::PoolExhausted);
        };
        if !guard.append(bytes) {
            drop(guard);
            return Err(EnqueueError::TooLarge);
        }
        self.queue.push_back(guard);
        Ok(())
    }

    /// Borrows the head buffer, the one currently being sent, if any.
    pub fn front(&self) -> Option<&PoolGuard> {
        self.queue.front()
    }

    /// Mutably borrows the head buffer, for advancing its send cursor.
    pub fn front_mut(&mut self) -> Option<&mut PoolGuard> {
        self.queue.front_mut()
    }

    /// Returns the head buffer to the pool and removes it from the queue.
    pub fn pop(&mut self) {
        self.queue.pop_front();
    }

    /// `true` iff no buffers are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of buffers currently queued.
    pub fn size(&self) -> usize {
        self.queue.len()
    }

    /// Returns every queued buffer to the pool and empties the queue.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
