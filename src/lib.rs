// src/lib.rs
//! # msgreactor
//!
//! An edge-triggered TCP reactor for newline-framed messages, built on a
//! fixed-capacity, non-reallocating buffer pool.
//!
//! Three tightly coupled subsystems:
//! - [`accountant`] / [`pool`] / [`buffer`]: process-wide memory
//!   accounting and the pooled, fixed-capacity buffers it tracks.
//! - [`connection`]: per-socket framing and the partial-write-safe
//!   outbound state machine ([`outbound`]).
//! - [`reactor`] / [`worker`]: the single-threaded `mio` event loop and
//!   the worker pool that executes per-connection read/write steps off
//!   the reactor thread.
//!
//! Features:
//! - Secure memory zeroing on permanent buffer destruction (`zeroize`)
//! - Connection-scoped lifecycle management with automatic cleanup on drop
//! - Thread-safe, bounded buffer pooling shared by every connection
//! - Edge-triggered multiplexing of many sockets over one `mio::Poll`
//! - `\n`-delimited message framing with an application-supplied handler

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_safety_doc)]

pub mod accountant;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod outbound;
pub mod pool;
pub mod reactor;
pub mod worker;

// Re-export main types
pub use accountant::MemoryAccountant;
pub use buffer::Buffer;
pub use config::Config;
pub use connection::{ConnState, Connection, MessageHandler, DELIM, MAX_MESSAGE_SIZE};
pub use error::{BufferError, Result, ServerError, ServerResult};
pub use outbound::{EnqueueError, OutboundQueue};
pub use pool::{BufferPool, PoolConfig, PoolGuard, PoolStats};
pub use reactor::{Reactor, ReactorConfig, ReactorStopper};
pub use worker::{SubmitError, WorkerConfig, WorkerExecutor};

/// Commonly used imports.
pub mod prelude {
    pub use crate::accountant::MemoryAccountant;
    pub use crate::buffer::Buffer;
    pub use crate::config::Config;
    pub use crate::connection::{ConnState, Connection, MessageHandler, DELIM, MAX_MESSAGE_SIZE};
    pub use crate::error::{BufferError, Result, ServerError, ServerResult};
    pub use crate::outbound::{EnqueueError, OutboundQueue};
    pub use crate::pool::{BufferPool, PoolConfig, PoolGuard, PoolStats};
    pub use crate::reactor::{Reactor, ReactorConfig, ReactorStopper};
    pub use crate::worker::{SubmitError, WorkerConfig, WorkerExecutor};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_basic_buffer() {
        let mut buf = Buffer::new(1024);
        buf.put_u32(42).unwrap();
        buf.put_byte(0xFF).unwrap();

        buf.set_pos(0).unwrap();
        assert_eq!(buf.get_u32().unwrap(), 42);
        assert_eq!(buf.get_byte().unwrap(), 0xFF);
    }

    #[test]
    fn test_standard_pool() {
        let pool = BufferPool::new(PoolConfig {
            buffer_size: 1024,
            max_pool_size: 100,
            min_pool_size: 10,
        });

        let mut buffers = Vec::new();
        for i in 0..50 {
            let mut buf = pool.acquire().unwrap();
            buf.put_u32(i).unwrap();
            buffers.push(buf);
        }

        drop(buffers);

        let stats = pool.stats();
        assert!(stats.total_acquired >= 50);
    }

    #[test]
    fn test_outbound_queue_drains_through_pool() {
        let pool = std::sync::Arc::new(BufferPool::new(PoolConfig {
            buffer_size: 64,
            max_pool_size: 10,
            min_pool_size: 2,
        }));
        let mut q = OutboundQueue::new(pool);
        q.enqueue(b"hi").unwrap();
        assert_eq!(q.front().unwrap().as_slice(), b"hi");
        q.pop();
        assert!(q.is_empty());
    }
}
