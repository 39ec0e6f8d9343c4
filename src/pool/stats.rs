// src/pool/stats.rs
//! Observability snapshots for the buffer pools.

/// Point-in-time snapshot of a [`super::BufferPool`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers currently idle in the free-list.
    pub available: usize,
    /// Buffers allocated fresh since pool construction (cache misses).
    pub total_allocated: usize,
    /// Total successful `acquire()` calls.
    pub total_acquired: usize,
    /// Total buffers returned to the pool on release.
    pub total_returned: usize,
    /// Capacity class (bytes) of every buffer in this pool.
    pub buffer_size: usize,
    /// Configured ceiling on idle + acquired buffers.
    pub max_pool_size: usize,
}

impl PoolStats {
    /// Percentage of `acquire()` calls satisfied without a fresh allocation.
    pub fn hit_rate(&self) -> f64 {
        if self.total_acquired == 0 {
            return 0.0;
        }
        let hits = self.total_acquired.saturating_sub(self.total_allocated);
        (hits as f64 / self.total_acquired as f64) * 100.0
    }

    /// Buffers currently on loan (acquired but not yet returned).
    pub fn in_use(&self) -> usize {
        self.total_acquired.saturating_sub(self.total_returned)
    }
}
