// src/pool/standard.rs
//! Standard mutex-based buffer pool, bounded by acquired + idle <= `max_pool_size`.
//!
//! # Pool Size Limits
//!
//! `acquire()` returns `None` once `acquired + idle` has reached
//! `max_pool_size` rather than allocating without bound — callers on the
//! send path treat that as backpressure, not an error.
//!
//! # Memory Safety
//!
//! A released buffer is only `reset()` (cheap, no zeroing) before going
//! back on the free-list, so the acquire/release hot path never pays for a
//! zero-fill. A buffer is `burn()`ed — securely zeroed — only when it is
//! permanently destroyed: releasing into a full free-list, or pool
//! teardown. `Buffer` also carries `#[zeroize(drop)]` as a last line of
//! defense for any path that drops one directly.

use super::config::PoolConfig;
use super::stats::PoolStats;
use crate::accountant::MemoryAccountant;
use crate::buffer::Buffer;
use std::sync::{Arc, Mutex};

pub(crate) struct PoolInner {
    pub(crate) buffers: Vec<Buffer>,
    pub(crate) config: PoolConfig,
    pub(crate) acquired_count: usize,
    pub(crate) total_allocated: usize,
    pub(crate) total_acquired: usize,
    pub(crate) total_returned: usize,
    pub(crate) accountant: Option<Arc<MemoryAccountant>>,
}

/// Standard thread-safe buffer pool backed by a `Mutex`.
///
/// All buffers in a given pool share one capacity class. Bounded by
/// `config.max_pool_size`: once that many buffers are outstanding or idle,
/// [`acquire`](Self::acquire) returns `None` instead of growing further.
///
/// # Thread Safety
///
/// Can be shared across threads via `Arc`.
///
/// # Example
///
/// ```rust
/// use msgreactor::prelude::*;
///
/// let pool = BufferPool::new(PoolConfig {
///     buffer_size: 4096,
///     max_pool_size: 100,
///     min_pool_size: 10,
/// });
///
/// let mut buf = pool.acquire().unwrap();
/// buf.put_u32(42)?;
/// // Buffer is reset and returned to the pool on drop.
/// # Ok::<(), msgreactor::BufferError>(())
/// ```
pub struct BufferPool {
    pub(crate) inner: Arc<Mutex<PoolInner>>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl BufferPool {
    /// Creates a new buffer pool and pre-warms it with `config.min_pool_size` buffers.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_accountant(config, None)
    }

    /// Creates a new buffer pool that charges every fresh allocation (and
    /// credits every permanent destruction) against `accountant`.
    ///
    /// Pre-warmed buffers count toward the accountant just like any other
    /// allocation.
    pub fn with_accountant(config: PoolConfig, accountant: Option<Arc<MemoryAccountant>>) -> Self {
        let mut buffers = Vec::with_capacity(config.min_pool_size);
        for _ in 0..config.min_pool_size {
            buffers.push(Buffer::new(config.buffer_size));
        }
        if let Some(ref acct) = accountant {
            acct.allocate(config.buffer_size * config.min_pool_size);
        }
        Self {
            inner: Arc::new(Mutex::new(PoolInner {
                buffers,
                config,
                acquired_count: 0,
                total_allocated: config.min_pool_size,
                total_acquired: 0,
                total_returned: 0,
                accountant,
            })),
        }
    }

    /// Acquires a buffer from the free-list, resetting it first; allocates a
    /// fresh one if the free-list is empty and the pool has room; otherwise
    /// returns `None`.
    pub fn acquire(&self) -> Option<PoolGuard> {
        let mut inner = self.inner.lock().unwrap();

        let buffer = if let Some(mut buf) = inner.buffers.pop() {
            buf.reset();
            buf
        } else if inner.acquired_count < inner.config.max_pool_size {
            inner.total_allocated += 1;
            let size = inner.config.buffer_size;
            if let Some(ref acct) = inner.accountant {
                acct.allocate(size);
            }
            Buffer::new(size)
        } else {
            return None;
        };

        inner.acquired_count += 1;
        inner.total_acquired += 1;

        Some(PoolGuard {
            buffer: Some(buffer),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Number of buffers currently idle in the pool.
    pub fn available(&self) -> usize {
        self.inner.lock().unwrap().buffers.len()
    }

    /// Returns a snapshot of pool statistics.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().unwrap();
        PoolStats {
            available: inner.buffers.len(),
            total_allocated: inner.total_allocated,
            total_acquired: inner.total_acquired,
            total_returned: inner.total_returned,
            buffer_size: inner.config.buffer_size,
            max_pool_size: inner.config.max_pool_size,
        }
    }

    /// Truncates idle buffers to `min_pool_size`, securely erasing and
    /// freeing the excess.
    pub fn shrink(&self) {
        let mut inner = self.inner.lock().unwrap();
        let min_size = inner.config.min_pool_size;
        let buffer_size = inner.config.buffer_size;
        let excess = inner.buffers.split_off(min_size.min(inner.buffers.len()));
        let freed = excess.len();
        for mut buf in excess {
            buf.burn();
        }
        if let Some(ref acct) = inner.accountant {
            acct.deallocate(buffer_size * freed);
        }
        inner.buffers.shrink_to_fit();
    }

    /// Removes all idle buffers from the pool, securely erasing each first.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        let buffer_size = inner.config.buffer_size;
        let freed = inner.buffers.len();
        for mut buf in inner.buffers.drain(..) {
            buf.burn();
        }
        if let Some(ref acct) = inner.accountant {
            acct.deallocate(buffer_size * freed);
        }
    }

    /// Grows the idle pool up to `min(target_size, max_pool_size)`.
    pub fn grow(&self, target_size: usize) {
        let mut inner = self.inner.lock().unwrap();
        let max_size = inner.config.max_pool_size;
        let buffer_size = inner.config.buffer_size;
        let target = target_size.min(max_size);
        while inner.buffers.len() < target {
            inner.buffers.push(Buffer::new(buffer_size));
        }
    }
}

/// A buffer borrowed from a [`BufferPool`].
///
/// On drop the buffer is `reset()` and returned to the pool if space
/// permits; if the free-list is already full it is `burn()`ed (securely
/// zeroed) before being dropped, since it is being permanently destroyed.
///
/// Use [`leak`](Self::leak) or [`drop_now`](Self::drop_now) to opt out of
/// automatic return.
pub struct PoolGuard {
    pub(crate) buffer: Option<Buffer>,
    pub(crate) pool: Arc<Mutex<PoolInner>>,
}

impl PoolGuard {
    /// Extracts the buffer from the pool wrapper without returning it.
    ///
    /// The caller is responsible for cleanup; the buffer will still be zeroed
    /// when eventually dropped via `#[zeroize(drop)]`.
    pub fn leak(mut self) -> Buffer {
        self.buffer.take().unwrap()
    }

    /// Immediately and securely drops the buffer, bypassing pool return.
    pub fn drop_now(mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.burn();
            drop(buffer);
        }
    }

    /// Capacity of the underlying buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().unwrap().capacity()
    }
}

impl std::ops::Deref for PoolGuard {
    type Target = Buffer;
    fn deref(&self) -> &Self::Target {
        self.buffer.as_ref().unwrap()
    }
}

impl std::ops::DerefMut for PoolGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buffer.as_mut().unwrap()
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.reset();

            let mut inner = self.pool.lock().unwrap();
            inner.acquired_count = inner.acquired_count.saturating_sub(1);
            inner.total_returned += 1;

            if inner.buffers.len() < inner.config.max_pool_size {
                inner.buffers.push(buffer);
            } else {
                buffer.burn();
                let size = buffer.capacity();
                if let Some(ref acct) = inner.accountant {
                    acct.deallocate(size);
                }
            }
        }
    }
}
