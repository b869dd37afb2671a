//! Cache Module
//!
//! Provides an in-memory cache with TTL expiration and passive purging.

mod clock;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub(crate) use entry::CacheEntry;
pub use stats::CacheStats;
pub(crate) use stats::StatsCollector;
pub use store::ExpiringCache;

// == Public Constants ==
/// Smallest TTL a cache accepts, in seconds
pub const MIN_TTL_SECS: i64 = 1;

/// Default interval between opportunistic purge sweeps, in seconds
pub const DEFAULT_PURGE_INTERVAL_SECS: i64 = 60;
