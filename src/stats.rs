//! Cache operation statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for cache operations.
///
/// All counters use relaxed ordering; they are observability data, not part
/// of the cache's synchronisation.
#[derive(Debug, Default)]
pub struct CacheStats {
    gets: AtomicU64,
    puts: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    writebacks: AtomicU64,
    flush_passes: AtomicU64,
    records_flushed: AtomicU64,
}

impl CacheStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_writeback(&self) {
        self.writebacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_pass(&self, records: u64) {
        self.flush_passes.fetch_add(1, Ordering::Relaxed);
        self.records_flushed.fetch_add(records, Ordering::Relaxed);
    }

    /// Number of `get` calls.
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Number of `put` calls.
    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Number of operations served from a resident slot.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of operations that had to install a new slot.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of completed evictions.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Number of eviction-time record write-backs.
    pub fn writebacks(&self) -> u64 {
        self.writebacks.load(Ordering::Relaxed)
    }

    /// Number of flusher cycles (periodic and final).
    pub fn flush_passes(&self) -> u64 {
        self.flush_passes.load(Ordering::Relaxed)
    }

    /// Number of records written back by the flusher.
    pub fn records_flushed(&self) -> u64 {
        self.records_flushed.load(Ordering::Relaxed)
    }

    /// Fraction of operations served without installing a slot (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            return 0.0;
        }
        self.hits() as f64 / total as f64
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        self.gets.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.writebacks.store(0, Ordering::Relaxed);
        self.flush_passes.store(0, Ordering::Relaxed);
        self.records_flushed.store(0, Ordering::Relaxed);
    }

    /// Snapshot all counters.
    pub fn summary(&self) -> CacheStatsSummary {
        CacheStatsSummary {
            gets: self.gets(),
            puts: self.puts(),
            hits: self.hits(),
            misses: self.misses(),
            hit_rate: self.hit_rate(),
            evictions: self.evictions(),
            writebacks: self.writebacks(),
            flush_passes: self.flush_passes(),
            records_flushed: self.records_flushed(),
        }
    }
}

/// Point-in-time snapshot of [`CacheStats`].
#[derive(Debug, Clone)]
pub struct CacheStatsSummary {
    /// Number of `get` calls.
    pub gets: u64,
    /// Number of `put` calls.
    pub puts: u64,
    /// Number of hits.
    pub hits: u64,
    /// Number of misses.
    pub misses: u64,
    /// Hit rate.
    pub hit_rate: f64,
    /// Number of evictions.
    pub evictions: u64,
    /// Number of eviction write-backs.
    pub writebacks: u64,
    /// Number of flusher cycles.
    pub flush_passes: u64,
    /// Number of records the flusher wrote back.
    pub records_flushed: u64,
}
