//! Top-level error type.
//!
//! Only construction can fail: `get` and `put` always make progress, so the
//! public operations return plain values and every transient condition
//! (CAS contention, a saturated pool, an unparsable field) is handled
//! internally.

use crate::config::ConfigError;
use crate::store::StoreError;

/// Errors raised while constructing a cache engine.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The record store could not be created or mapped.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
