//! The cache engine: hit paths, miss installation and LFU eviction.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info};

use crate::config::{CacheConfig, Strategy};
use crate::constants::EVICTION_BACKOFF;
use crate::error::CacheError;
use crate::eviction::{EvictionPolicy, LfuPolicy};
use crate::flusher::FlushWorker;
use crate::index::SlotIndex;
use crate::pool::BufferPool;
use crate::slot::{Slot, SlotStatus};
use crate::stats::CacheStats;
use crate::store::RecordStore;
use crate::value::CacheValue;

/// State shared between client threads and the flusher.
///
/// The engine owns this for its lifetime; the flusher holds a second
/// reference but never outlives the engine's shutdown.
pub(crate) struct CacheShared<V: CacheValue> {
    pub(crate) pool: BufferPool<V>,
    pub(crate) index: SlotIndex,
    pub(crate) store: RecordStore,
    pub(crate) stats: CacheStats,
    policy: Box<dyn EvictionPolicy<V>>,
}

/// Outcome of an attempted slot access on the hit path.
enum HitOutcome<V> {
    /// The slot yielded (reads) or accepted (writes) a value.
    Done(V),
    /// The slot is mid-eviction; the caller should look the line up again.
    Busy,
    /// The slot went back to Free behind the mapping; treat as a miss.
    Stale,
}

/// A fixed-capacity write-back cache over a memory-mapped record file.
///
/// `get` and `put` never fail and never block on the buffer pool: hits are a
/// handful of atomic operations, and misses fall back to LFU eviction plus a
/// record-file read. Dirty values reach the file when their slot is evicted
/// and on every flusher cycle.
///
/// Dropping the engine shuts it down: the flusher runs one final pass, so
/// every dirty value has been written back by the time `drop` returns.
pub struct LineCache<V: CacheValue> {
    shared: Arc<CacheShared<V>>,
    flusher: FlushWorker,
    config: CacheConfig,
}

impl<V: CacheValue> LineCache<V> {
    /// Construct an engine from `config`, creating the record file.
    ///
    /// This is the only fallible operation on the cache: an invalid
    /// configuration or an unmappable record file is reported here and the
    /// engine is never created.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let policy: Box<dyn EvictionPolicy<V>> = match config.strategy {
            Strategy::Lfu => Box::new(LfuPolicy),
        };
        Self::with_policy(config, policy)
    }

    /// Construct an engine with an explicit eviction policy.
    pub fn with_policy(
        config: CacheConfig,
        policy: Box<dyn EvictionPolicy<V>>,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        let store = RecordStore::create(&config.items_file)?;
        let shared = Arc::new(CacheShared {
            pool: BufferPool::new(config.cache_size),
            index: SlotIndex::new(config.cache_size),
            store,
            stats: CacheStats::new(),
            policy,
        });
        let flusher = FlushWorker::spawn(Arc::clone(&shared), config.flush_period());

        info!(
            capacity = config.cache_size,
            period_secs = config.cache_timeout,
            items_file = %config.items_file.display(),
            "cache engine started"
        );

        Ok(Self {
            shared,
            flusher,
            config,
        })
    }

    /// Read the value at `line`.
    ///
    /// Returns the value and whether it had to be loaded from the record
    /// store (`true` on a miss). A hit bumps the slot's LFU frequency.
    pub fn get(&self, line: u32) -> (V, bool) {
        assert_line_in_range(line);
        self.shared.stats.record_get();
        let mut missed = false;
        loop {
            // The shared index lock is held across the slot CAS, so the
            // binding cannot be evicted out from under the read.
            let outcome = self
                .shared
                .index
                .with_slot(line, |slot| self.read_slot(line, slot));
            match outcome {
                Some(HitOutcome::Done(value)) => {
                    if missed {
                        // Raced: another thread re-installed the line while
                        // this one was heading for a slot.
                        self.shared.stats.record_miss();
                    } else {
                        self.shared.stats.record_hit();
                    }
                    return (value, missed);
                }
                // Mid-eviction; the unbind completes once the shared lock is
                // released, turning the retry into a clean miss.
                Some(HitOutcome::Busy) => continue,
                Some(HitOutcome::Stale) | None => {}
            }

            missed = true;
            let slot = self.acquire_slot();
            let value = self.shared.store.read::<V>(line);
            if self.install(slot, line, value) {
                self.shared.stats.record_miss();
                return (value, true);
            }
        }
    }

    /// Write `value` at `line`.
    ///
    /// The slot is marked Dirty; the value reaches the record file on
    /// eviction or on the next flusher cycle.
    pub fn put(&self, line: u32, value: V) {
        assert_line_in_range(line);
        self.shared.stats.record_put();
        loop {
            let outcome = self
                .shared
                .index
                .with_slot(line, |slot| self.write_slot(line, slot, value));
            match outcome {
                Some(HitOutcome::Done(())) => {
                    self.shared.stats.record_hit();
                    return;
                }
                // A Busy or re-freed slot cannot take the value; fall
                // through and install it like a miss.
                Some(HitOutcome::Busy) | Some(HitOutcome::Stale) | None => {}
            }

            let slot = self.acquire_slot();
            if self.install(slot, line, value) {
                self.shared.stats.record_miss();
                return;
            }
        }
    }

    /// Stop the flusher after one final write-back pass.
    ///
    /// Idempotent; also performed on drop. When this returns, every value
    /// that was dirty at shutdown has been written to the record store, and
    /// no eviction write-back is pending (evictions write inline).
    pub fn shutdown(&self) {
        self.flusher.stop();
    }

    /// Operation counters.
    pub fn stats(&self) -> &CacheStats {
        &self.shared.stats
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Buffer pool capacity.
    pub fn capacity(&self) -> usize {
        self.shared.pool.len()
    }

    /// Hit-path read: bump the frequency and yield the observed value.
    ///
    /// Runs with the caller holding the shared index lock on `line`'s
    /// binding.
    fn read_slot(&self, line: u32, slot: usize) -> HitOutcome<V> {
        assert!(
            slot < self.shared.pool.len(),
            "index maps line {line} to slot {slot}, beyond capacity {}",
            self.shared.pool.len()
        );
        loop {
            let current = self.shared.pool.load(slot);
            match current.status {
                SlotStatus::Free => return HitOutcome::Stale,
                SlotStatus::Busy => return HitOutcome::Busy,
                SlotStatus::Dirty | SlotStatus::Valid => {
                    if self.shared.pool.cas(slot, current, current.touched()) {
                        return HitOutcome::Done(current.value);
                    }
                }
            }
        }
    }

    /// Hit-path write: replace the value, bump the frequency, mark Dirty.
    ///
    /// Runs with the caller holding the shared index lock on `line`'s
    /// binding, so the value cannot land in a slot that was rebound to a
    /// different line.
    fn write_slot(&self, line: u32, slot: usize, value: V) -> HitOutcome<()> {
        assert!(
            slot < self.shared.pool.len(),
            "index maps line {line} to slot {slot}, beyond capacity {}",
            self.shared.pool.len()
        );
        loop {
            let current = self.shared.pool.load(slot);
            match current.status {
                SlotStatus::Free => return HitOutcome::Stale,
                SlotStatus::Busy => return HitOutcome::Busy,
                SlotStatus::Dirty | SlotStatus::Valid => {
                    let new = Slot {
                        frequency: current.frequency.saturating_add(1),
                        status: SlotStatus::Dirty,
                        value,
                    };
                    if self.shared.pool.cas(slot, current, new) {
                        return HitOutcome::Done(());
                    }
                }
            }
        }
    }

    /// Install `value` for `line` in the freshly acquired `slot`.
    ///
    /// The CAS runs against the pristine Free state, so it fails if another
    /// thread consumed the slot first; the caller then restarts from the
    /// lookup.
    fn install(&self, slot: usize, line: u32, value: V) -> bool {
        if !self
            .shared
            .pool
            .cas(slot, Slot::free(), Slot::installed(value))
        {
            return false;
        }
        self.shared.index.bind(line, slot);
        true
    }

    /// Obtain a Free slot, evicting the policy's victim if necessary.
    ///
    /// The victim is claimed by CASing it to Busy, unbound from the index
    /// while Busy, reset to Free, and written back to the record store by
    /// this thread if it held unflushed data. The store's exclusive lock
    /// serialises that write against any concurrent update of the same
    /// record.
    fn acquire_slot(&self) -> usize {
        loop {
            let Some(victim) = self.shared.policy.select(&self.shared.pool) else {
                debug!("all slots busy, backing off before eviction retry");
                thread::sleep(EVICTION_BACKOFF);
                continue;
            };
            assert!(
                victim < self.shared.pool.len(),
                "eviction policy selected slot {victim}, beyond capacity {}",
                self.shared.pool.len()
            );

            let observed = self.shared.pool.load(victim);
            if observed.status == SlotStatus::Busy {
                continue;
            }
            let claimed = observed.with_status(SlotStatus::Busy);
            if !self.shared.pool.cas(victim, observed, claimed) {
                // The slot moved under the scan; pick again.
                continue;
            }

            let evicted_line = self.shared.index.unbind_slot(victim);

            // Only the claiming thread may leave Busy, so this cannot spin
            // against another writer.
            while !self.shared.pool.cas(victim, claimed, Slot::free()) {
                std::hint::spin_loop();
            }

            if let Some(line) = evicted_line {
                self.shared.stats.record_eviction();
                if observed.status == SlotStatus::Dirty {
                    self.shared.store.write(line, &observed.value.to_field());
                    self.shared.stats.record_writeback();
                }
            }

            return victim;
        }
    }
}

impl<V: CacheValue> Drop for LineCache<V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Line numbers are 1-based record identities; anything else is a caller bug.
#[inline]
fn assert_line_in_range(line: u32) {
    assert!(
        (1..=crate::constants::RECORD_COUNT as u32).contains(&line),
        "line {line} out of range"
    );
}
