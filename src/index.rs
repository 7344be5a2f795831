//! Line-number to slot-index mapping.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Mapping from record line numbers to buffer-pool slot indices.
///
/// Guarded by a single readers-writer lock: lookups take it shared, mutations
/// take it exclusive. The engine maintains the invariant that at most one
/// line maps to any given slot, so the reverse lookups here can stop at the
/// first match. Reverse lookups are O(C) scans, which is fine: C is small and
/// they run only on eviction and in the flusher.
pub struct SlotIndex {
    map: RwLock<HashMap<u32, usize>>,
}

impl SlotIndex {
    /// Create an empty index sized for `capacity` bindings.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Slot currently bound to `line`, if any. Shared lock.
    #[inline]
    pub fn lookup(&self, line: u32) -> Option<usize> {
        self.map.read().get(&line).copied()
    }

    /// Run `f` on the slot bound to `line`, holding the shared lock for the
    /// duration of the call.
    ///
    /// Keeping the lock across `f` pins the binding: an eviction cannot
    /// unbind the slot (that takes the exclusive lock) until `f` returns, so
    /// `f` operates on a slot that still belongs to `line`. `f` must not
    /// touch the index.
    pub fn with_slot<R>(&self, line: u32, f: impl FnOnce(usize) -> R) -> Option<R> {
        let map = self.map.read();
        let slot = map.get(&line).copied()?;
        Some(f(slot))
    }

    /// Bind `line` to `slot`, replacing any prior binding for `line`.
    /// Exclusive lock.
    pub fn bind(&self, line: u32, slot: usize) {
        self.map.write().insert(line, slot);
    }

    /// Remove the binding whose slot equals `slot`, returning the line that
    /// was bound. Exclusive lock.
    pub fn unbind_slot(&self, slot: usize) -> Option<u32> {
        let mut map = self.map.write();
        let line = map
            .iter()
            .find_map(|(&line, &s)| (s == slot).then_some(line))?;
        map.remove(&line);
        Some(line)
    }

    /// Line currently bound to `slot`, if any. Shared lock.
    pub fn line_for(&self, slot: usize) -> Option<u32> {
        self.map
            .read()
            .iter()
            .find_map(|(&line, &s)| (s == slot).then_some(line))
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether the index holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
