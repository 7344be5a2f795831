//! Fixed-size pool of atomic cache slots.

use crate::slot::{AtomicSlot, Slot};
use crate::value::CacheValue;

/// A fixed-length sequence of independently atomic slots.
///
/// The pool is allocated once at construction and never resized; a slot's
/// identity is its index. The pool itself is policy-free: it only exposes
/// lock-free `load` and `cas`, and all status interpretation happens in the
/// engine and the eviction policy.
pub struct BufferPool<V: CacheValue> {
    slots: Box<[AtomicSlot<V>]>,
}

impl<V: CacheValue> BufferPool<V> {
    /// Allocate a pool of `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be non-zero");
        let slots = (0..capacity)
            .map(|_| AtomicSlot::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    /// Number of slots in the pool.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool has no slots. Never true for a constructed pool.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Acquire-ordered snapshot of slot `index`.
    #[inline]
    pub fn load(&self, index: usize) -> Slot<V> {
        self.slots[index].load()
    }

    /// Compare-and-swap the whole slot at `index`.
    #[inline]
    pub fn cas(&self, index: usize, expected: Slot<V>, new: Slot<V>) -> bool {
        self.slots[index].compare_exchange(expected, new)
    }
}
