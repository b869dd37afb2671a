//! Configuration Module
//!
//! Loads cache settings from environment variables.

use std::env;

use chrono::Duration;

use crate::cache::DEFAULT_PURGE_INTERVAL_SECS;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL in seconds applied to every entry
    pub ttl_secs: u64,
    /// Seconds between opportunistic purge sweeps; negative values act as zero
    pub purge_interval_secs: i64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECS` - Entry TTL in seconds (default: 300)
    /// - `CACHE_PURGE_INTERVAL_SECS` - Purge sweep interval in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl_secs),
            purge_interval_secs: env::var("CACHE_PURGE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.purge_interval_secs),
        }
    }

    /// TTL as a duration. Saturates for values beyond `i64::MAX` seconds.
    pub fn ttl(&self) -> Duration {
        let secs = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(secs).unwrap_or(Duration::MAX)
    }

    /// Purge interval as a duration, clamped to zero.
    pub fn purge_interval(&self) -> Duration {
        Duration::try_seconds(self.purge_interval_secs.max(0)).unwrap_or(Duration::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            purge_interval_secs: DEFAULT_PURGE_INTERVAL_SECS,
        }
    }
}
