// src/accountant.rs
//! Process-wide lock-free accounting of bytes held in pooled buffers.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default memory ceiling: 100 MiB.
pub const DEFAULT_MEMORY_CEILING: usize = 100 * 1024 * 1024;

/// Tracks current and peak bytes allocated across all pooled buffers and
/// exposes an advisory ceiling check.
///
/// `allocate`/`deallocate` are safe to call from any thread without
/// synchronization beyond the atomics themselves. The accountant never
/// refuses an allocation; `is_exceeded()` is advisory and is left to the
/// caller (e.g. the Reactor may refuse new connections on it).
///
/// # Examples
///
/// ```
/// use msgreactor::MemoryAccountant;
///
/// let acct = MemoryAccountant::new(1024);
/// acct.allocate(512);
/// assert_eq!(acct.current(), 512);
/// assert_eq!(acct.peak(), 512);
/// acct.deallocate(512);
/// assert_eq!(acct.current(), 0);
/// assert_eq!(acct.peak(), 512);
/// ```
pub struct MemoryAccountant {
    current: AtomicUsize,
    peak: AtomicUsize,
    ceiling: usize,
}

impl MemoryAccountant {
    /// Creates a new accountant with the given advisory ceiling in bytes.
    pub fn new(ceiling: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            ceiling,
        }
    }

    /// Records `n` bytes as newly allocated and updates the peak via a
    /// CAS-retry loop.
    pub fn allocate(&self, n: usize) {
        let new_current = self.current.fetch_add(n, Ordering::Relaxed) + n;

        let mut observed_peak = self.peak.load(Ordering::Relaxed);
        while new_current > observed_peak {
            match self.peak.compare_exchange_weak(
                observed_peak,
                new_current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => observed_peak = actual,
            }
        }
    }

    /// Records `n` bytes as freed.
    pub fn deallocate(&self, n: usize) {
        self.current.fetch_sub(n, Ordering::Relaxed);
    }

    /// Current bytes outstanding.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// High-water mark since the last [`reset`](Self::reset).
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// The configured advisory ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// `true` if `current()` has exceeded the configured ceiling.
    pub fn is_exceeded(&self) -> bool {
        self.current() > self.ceiling
    }

    /// Resets both counters to zero.
    pub fn reset(&self) {
        self.current.store(0, Ordering::Relaxed);
        self.peak.store(0, Ordering::Relaxed);
    }
}

impl Default for MemoryAccountant {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CEILING)
    }
}
