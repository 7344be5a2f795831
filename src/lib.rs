//! linecache - A fixed-capacity write-back cache over a record file
//!
//! This crate provides a concurrent, in-process LFU cache in front of a
//! fixed-size, memory-mapped record file:
//!
//! - **Buffer pool**: cache-line-aligned slots updated by lock-free
//!   compare-and-swap; the hot path never blocks
//! - **Write-back**: puts only mark a slot dirty; values reach disk on
//!   eviction and on a periodic background flush
//! - **LFU eviction**: the least-frequently-used slot is recycled on a miss,
//!   behind a pluggable policy seam
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use linecache::{CacheConfig, LineCache};
//!
//! let config = CacheConfig::default()
//!     .with_cache_size(64)
//!     .with_items_file("items.txt")
//!     .with_cache_timeout(5);
//!
//! let cache = LineCache::<i32>::new(config)?;
//!
//! cache.put(1, 1000);
//! let (value, was_miss) = cache.get(1);
//! assert_eq!((value, was_miss), (1000, false));
//!
//! cache.shutdown();
//! # Ok::<(), linecache::CacheError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod eviction;
pub mod index;
pub mod pool;
pub mod slot;
pub mod stats;
pub mod store;
pub mod value;

mod flusher;

// Re-exports for convenience
pub use config::{CacheConfig, Strategy};
pub use engine::LineCache;
pub use error::CacheError;
pub use eviction::{EvictionPolicy, LfuPolicy};
pub use slot::{Slot, SlotStatus};
pub use stats::{CacheStats, CacheStatsSummary};
pub use store::{RecordStore, StoreError};
pub use value::CacheValue;

/// Constants used throughout the library
pub mod constants {
    use std::time::Duration;

    /// Size of a cache line in bytes
    pub const CACHE_LINE_BYTES: usize = 64;

    /// Number of records in the backing file
    pub const RECORD_COUNT: usize = 10_000;

    /// Width of a record's value field in bytes
    pub const FIELD_WIDTH: usize = 10;

    /// Total size of one record: the field plus its newline
    pub const RECORD_SIZE: usize = FIELD_WIDTH + 1;

    /// Sleep between eviction retries when every slot is Busy
    pub const EVICTION_BACKOFF: Duration = Duration::from_millis(30);
}

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{CacheConfig, Strategy};
    pub use crate::engine::LineCache;
    pub use crate::error::CacheError;
    pub use crate::eviction::{EvictionPolicy, LfuPolicy};
    pub use crate::value::CacheValue;
}
