//! Purge Task
//!
//! Caller-owned task that periodically sweeps expired cache entries.

use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ExpiringCache;

/// Shortest spacing between sweeps; tokio intervals cannot tick at zero
pub const MIN_PURGE_TICK: Duration = Duration::from_millis(1);

/// Spawns a task that calls `purge_expired` on `cache` every `interval`.
///
/// Must be called from within a tokio runtime. The caller owns the returned
/// handle and should abort it on shutdown. Intervals shorter than
/// `MIN_PURGE_TICK` (including zero) run at `MIN_PURGE_TICK`.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ExpiringCache::<String, String>::new(chrono::Duration::seconds(30))?);
/// let purge_handle = spawn_purge_task(cache.clone(), Duration::from_secs(10));
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task<K, V, S>(
    cache: Arc<ExpiringCache<K, V, S>>,
    interval: Duration,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    let interval = interval.max(MIN_PURGE_TICK);

    tokio::spawn(async move {
        info!(?interval, "Starting cache purge task");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.purge_expired();
            if removed > 0 {
                info!(removed, "Cache purge: removed expired entries");
            } else {
                debug!("Cache purge: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn shared_cache() -> (Arc<ExpiringCache<String, String>>, ManualClock) {
        let clock = ManualClock::at_epoch();
        let cache = ExpiringCache::new(chrono::Duration::seconds(1))
            .unwrap()
            .with_clock(clock.clone());
        (Arc::new(cache), clock)
    }

    #[tokio::test]
    async fn test_purge_task_removes_expired_entries() {
        let (cache, clock) = shared_cache();
        cache.set("expire_soon".to_string(), "value".to_string());
        clock.advance(chrono::Duration::seconds(2));

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Checked without any read so only the task could have removed it
        assert_eq!(cache.len(), 0, "Expired entry should have been purged");

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_preserves_valid_entries() {
        let (cache, _clock) = shared_cache();
        cache.set("long_lived".to_string(), "value".to_string());

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.try_get("long_lived"), Some("value".to_string()));
        assert!(cache.stats().purges > 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_zero_interval_keeps_purging() {
        let (cache, clock) = shared_cache();

        let handle = spawn_purge_task(cache.clone(), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "Task should still be running");
        let purges_before = cache.stats().purges;
        assert!(purges_before > 0);

        cache.set("expire_soon".to_string(), "value".to_string());
        clock.advance(chrono::Duration::seconds(2));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "Task should still be running");
        assert_eq!(cache.len(), 0, "Expired entry should have been purged");
        assert!(cache.stats().purges > purges_before);

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let (cache, _clock) = shared_cache();

        let handle = spawn_purge_task(cache, Duration::from_millis(20));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
