//! Expiring Cache - A thread-safe in-memory key/value cache
//!
//! Every entry carries an absolute expiration instant. Reads never return
//! expired entries, and expired entries are purged passively as a side effect
//! of normal traffic instead of by a background timer.

pub mod cache;
pub mod config;
pub mod error;
#[cfg(feature = "purge-task")]
pub mod tasks;

pub use cache::{CacheStats, Clock, ExpiringCache, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
#[cfg(feature = "purge-task")]
pub use tasks::spawn_purge_task;
