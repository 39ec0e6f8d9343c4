// src/pool/config.rs
//! Configuration shared by every buffer pool implementation.

/// Configuration for a buffer pool's capacity class and sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Fixed capacity of every buffer this pool hands out.
    pub buffer_size: usize,
    /// Hard ceiling on the number of buffers the pool will keep alive at
    /// once (idle + acquired). Acquiring past this limit allocates nothing
    /// further and returns `None`.
    pub max_pool_size: usize,
    /// Number of buffers pre-warmed into the free-list at construction.
    pub min_pool_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            max_pool_size: 256,
            min_pool_size: 16,
        }
    }
}
