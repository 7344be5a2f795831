//! Eviction policies.
//!
//! The engine asks a policy for a victim slot and then claims it by CAS, so a
//! policy only has to nominate a candidate; it never owns the transition.
//! Swapping the policy swaps eviction behavior without touching the engine.

use crate::pool::BufferPool;
use crate::slot::SlotStatus;
use crate::value::CacheValue;

/// A pluggable victim-selection strategy.
///
/// `select` scans the pool with acquire-ordered loads and returns a candidate
/// slot index, or `None` when no slot is currently eligible (every slot is
/// mid-eviction). The scan need not be atomic across the pool: a stale choice
/// is harmless because the engine re-validates the victim with a CAS and
/// retries selection on failure.
pub trait EvictionPolicy<V: CacheValue>: Send + Sync {
    /// Nominate a victim slot, or `None` if all slots are Busy.
    fn select(&self, pool: &BufferPool<V>) -> Option<usize>;
}

/// Least-frequently-used selection.
///
/// Scans every slot and picks the smallest frequency among slots that are not
/// Busy. Free slots have frequency zero, so they are preferred naturally.
/// Ties go to the last index scanned, which keeps the choice deterministic
/// for a given pool state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LfuPolicy;

impl<V: CacheValue> EvictionPolicy<V> for LfuPolicy {
    fn select(&self, pool: &BufferPool<V>) -> Option<usize> {
        let mut victim = None;
        let mut least = u16::MAX;
        for index in 0..pool.len() {
            let slot = pool.load(index);
            if slot.status == SlotStatus::Busy {
                continue;
            }
            if slot.frequency <= least {
                least = slot.frequency;
                victim = Some(index);
            }
        }
        victim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Slot;

    fn install(pool: &BufferPool<i32>, index: usize, frequency: u16, status: SlotStatus) {
        let expected = pool.load(index);
        let new = Slot {
            frequency,
            status,
            value: index as i32,
        };
        assert!(pool.cas(index, expected, new));
    }

    #[test]
    fn test_selects_least_frequent() {
        let pool = BufferPool::new(4);
        install(&pool, 0, 5, SlotStatus::Valid);
        install(&pool, 1, 2, SlotStatus::Dirty);
        install(&pool, 2, 9, SlotStatus::Valid);
        install(&pool, 3, 4, SlotStatus::Dirty);

        assert_eq!(LfuPolicy.select(&pool), Some(1));
    }

    #[test]
    fn test_prefers_free_slots() {
        let pool = BufferPool::new(3);
        install(&pool, 0, 1, SlotStatus::Dirty);
        // Slot 1 and 2 stay Free with frequency 0; last scanned wins the tie.
        assert_eq!(LfuPolicy.select(&pool), Some(2));
    }

    #[test]
    fn test_busy_slots_are_invisible() {
        let pool = BufferPool::new(3);
        install(&pool, 0, 1, SlotStatus::Busy);
        install(&pool, 1, 7, SlotStatus::Valid);
        install(&pool, 2, 3, SlotStatus::Busy);

        assert_eq!(LfuPolicy.select(&pool), Some(1));
    }

    #[test]
    fn test_all_busy_yields_none() {
        let pool = BufferPool::<i32>::new(2);
        install(&pool, 0, 1, SlotStatus::Busy);
        install(&pool, 1, 2, SlotStatus::Busy);

        assert_eq!(<LfuPolicy as EvictionPolicy<i32>>::select(&LfuPolicy, &pool), None);
    }

    #[test]
    fn test_tie_breaks_to_last_scanned() {
        let pool = BufferPool::new(4);
        for i in 0..4 {
            install(&pool, i, 3, SlotStatus::Valid);
        }
        assert_eq!(LfuPolicy.select(&pool), Some(3));
    }
}
