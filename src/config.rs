//! Configuration loading helpers.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors returned by configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading a config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Invalid value for a key.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Raw value string.
        value: String,
    },
    /// Unknown configuration key.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Eviction strategy selector.
///
/// The engine accepts any [`EvictionPolicy`](crate::eviction::EvictionPolicy),
/// but configuration only names the built-in ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Least-frequently-used eviction.
    #[default]
    Lfu,
}

/// Cache engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Buffer pool capacity (number of slots).
    pub cache_size: usize,
    /// Path of the backing record file.
    pub items_file: PathBuf,
    /// Flusher period in seconds.
    pub cache_timeout: u64,
    /// Eviction strategy.
    pub strategy: Strategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_size: 4,
            items_file: PathBuf::from("items.txt"),
            cache_timeout: 5,
            strategy: Strategy::Lfu,
        }
    }
}

impl CacheConfig {
    /// Environment variable naming the config file.
    pub const ENV_CONFIG: &'static str = "LINECACHE_CONFIG";
    /// Prefix for per-key environment overrides, e.g. `LINECACHE__CACHE_SIZE`.
    pub const ENV_PREFIX: &'static str = "LINECACHE__";

    /// Set the buffer pool capacity.
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Set the record file path.
    pub fn with_items_file(mut self, items_file: impl Into<PathBuf>) -> Self {
        self.items_file = items_file.into();
        self
    }

    /// Set the flusher period in seconds.
    pub fn with_cache_timeout(mut self, seconds: u64) -> Self {
        self.cache_timeout = seconds;
        self
    }

    /// Set the eviction strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Flusher period as a [`Duration`].
    pub fn flush_period(&self) -> Duration {
        Duration::from_secs(self.cache_timeout)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the `LINECACHE_CONFIG` env var (if set), then
    /// apply `LINECACHE__<KEY>` overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(Self::ENV_CONFIG) {
            Ok(path) => Self::load_from_path(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides in-place.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for (key, value) in env::vars() {
            let Some(field) = key.strip_prefix(Self::ENV_PREFIX) else {
                continue;
            };
            let value = value.trim();
            let invalid = |key: &str| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };
            match field.to_ascii_lowercase().as_str() {
                "cache_size" => {
                    self.cache_size = value.parse().map_err(|_| invalid("cache_size"))?;
                }
                "items_file" => self.items_file = PathBuf::from(value),
                "cache_timeout" => {
                    self.cache_timeout = value.parse().map_err(|_| invalid("cache_timeout"))?;
                }
                "strategy" => {
                    self.strategy = match value.to_ascii_lowercase().as_str() {
                        "lfu" => Strategy::Lfu,
                        _ => return Err(invalid("strategy")),
                    };
                }
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }
        Ok(())
    }

    /// Check that the configuration can actually run an engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cache_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache_timeout".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
