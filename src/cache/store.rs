//! Cache Store Module
//!
//! Main cache engine combining a sharded concurrent map with TTL expiration
//! and a passive purge watermark.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::cache::entry::expiry_after;
use crate::cache::{
    CacheEntry, CacheStats, Clock, StatsCollector, SystemClock, DEFAULT_PURGE_INTERVAL_SECS,
    MIN_TTL_SECS,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Expiring Cache ==
/// Thread-safe key/value cache where every entry expires a fixed TTL after
/// it was last set.
///
/// Reads never return an expired entry. Expired entries are reclaimed
/// passively: a read that finds one deletes it, and `set`, `try_get` and
/// iteration each compare the clock against a purge watermark and run a
/// full sweep once it has passed. Nothing runs in the background, so an idle
/// cache keeps its stale entries until the next call or an explicit
/// [`purge_expired`](Self::purge_expired).
///
/// All methods take `&self`; share the cache across threads with an `Arc`.
pub struct ExpiringCache<K, V, S = RandomState> {
    /// Backing store, sharded so readers and writers rarely contend
    entries: DashMap<K, CacheEntry<V>, S>,
    /// TTL applied to every set
    ttl: Duration,
    /// Minimum spacing between opportunistic sweeps
    purge_interval: Duration,
    /// Unix milliseconds at which the next opportunistic sweep is due
    next_purge_at: AtomicI64,
    /// Source of "now"
    clock: Box<dyn Clock>,
    /// Read and purge counters
    stats: StatsCollector,
}

impl<K, V> ExpiringCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a cache whose entries live for `ttl`.
    ///
    /// # Errors
    /// `CacheError::InvalidArgument` if `ttl` is below one second.
    pub fn new(ttl: Duration) -> Result<Self> {
        Self::with_hasher(ttl, RandomState::new())
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self::new(config.ttl())?.with_purge_interval(config.purge_interval()))
    }
}

impl<K, V, S> ExpiringCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    /// Creates a cache whose keys are hashed with `hasher`.
    ///
    /// # Errors
    /// `CacheError::InvalidArgument` if `ttl` is below one second.
    pub fn with_hasher(ttl: Duration, hasher: S) -> Result<Self> {
        if ttl < Duration::seconds(MIN_TTL_SECS) {
            return Err(CacheError::InvalidArgument(format!(
                "TTL must be at least {}s, got {}ms",
                MIN_TTL_SECS,
                ttl.num_milliseconds()
            )));
        }

        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let purge_interval = Duration::seconds(DEFAULT_PURGE_INTERVAL_SECS);
        let next_purge_at = expiry_after(clock.now(), purge_interval).timestamp_millis();

        Ok(Self {
            entries: DashMap::with_hasher(hasher),
            ttl,
            purge_interval,
            next_purge_at: AtomicI64::new(next_purge_at),
            clock,
            stats: StatsCollector::new(),
        })
    }

    // == Configuration ==
    /// Replaces the clock, builder style.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.set_clock(clock);
        self
    }

    /// Replaces the clock and reschedules the next sweep against it.
    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
        self.schedule_next_purge(self.clock.now());
    }

    /// Sets the purge interval, builder style.
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.set_purge_interval(interval);
        self
    }

    /// Sets the purge interval and reschedules the next sweep.
    ///
    /// Negative intervals are clamped to zero, which makes every checked
    /// call run a sweep rather than disabling sweeps.
    pub fn set_purge_interval(&mut self, interval: Duration) {
        self.purge_interval = interval.max(Duration::zero());
        self.schedule_next_purge(self.clock.now());
    }

    /// TTL applied to every set.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Minimum spacing between opportunistic sweeps.
    pub fn purge_interval(&self) -> Duration {
        self.purge_interval
    }

    /// Instant at which the next opportunistic sweep becomes due.
    pub fn next_purge_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.next_purge_at.load(Ordering::Acquire))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    // == Set ==
    /// Stores `value` under `key`, expiring one TTL from now.
    ///
    /// An existing entry is overwritten and its expiration refreshed,
    /// whether or not it had already lapsed.
    pub fn set(&self, key: K, value: V) {
        let now = self.clock.now();
        self.purge_if_due(now);
        self.entries.insert(key, CacheEntry::new(value, now, self.ttl));
    }

    /// Alias for [`set`](Self::set).
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value);
    }

    // == Try Get ==
    /// Returns the live value for `key`.
    ///
    /// An entry found stale is deleted before returning `None`, so absent
    /// and expired keys look the same to the caller.
    pub fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = self.clock.now();
        self.purge_if_due(now);

        match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(entry) if !entry.is_expired_at(now) => {
                self.stats.record_hit();
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }

        // Shard guard from the lookup above is released by now.
        // Re-check under the write lock so a concurrent refresh survives.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            self.stats.record_expired_read();
            debug!("Removed expired entry on read");
        }
        self.stats.record_miss();
        None
    }

    // == Get ==
    /// Returns the live value for `key` or `CacheError::NotFound`.
    pub fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
        V: Clone,
    {
        self.try_get(key)
            .ok_or_else(|| CacheError::NotFound(format!("{key:?}")))
    }

    // == Contains ==
    /// Returns true if `key` has a live entry. Never deletes.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Returns true if `key` has a live entry equal to `value`. Never deletes.
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now) && entry.value == *value)
    }

    /// Time left before `key` expires, or `None` if absent or stale.
    pub fn ttl_remaining<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.ttl_remaining_at(now))
    }

    // == Remove ==
    /// Removes `key` whether live or stale. Returns true if something was removed.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and reschedules the next sweep.
    pub fn clear(&self) {
        self.entries.clear();
        self.schedule_next_purge(self.clock.now());
    }

    // == Purge ==
    /// Runs a full sweep against the current clock.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(self.clock.now())
    }

    /// Removes every entry stale at `now`, then schedules the next sweep for
    /// `now + purge_interval` whether or not anything was removed.
    ///
    /// Works on a snapshot of keys: entries inserted while the sweep runs may
    /// be missed, and an entry refreshed between snapshot and removal is kept.
    /// Safe to call from several threads at once.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let expired_keys: Vec<K> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired_keys {
            if self
                .entries
                .remove_if(&key, |_, entry| entry.is_expired_at(now))
                .is_some()
            {
                removed += 1;
            }
        }

        self.schedule_next_purge(now);
        self.stats.record_purge(removed);

        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Purged expired entries");
        } else {
            trace!("Purge sweep found no expired entries");
        }
        removed
    }

    // == Length ==
    /// Returns the raw number of stored entries, stale ones included.
    ///
    /// Use [`count_live`](Self::count_live) for an exact live count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries, stale or live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts live entries only. O(n).
    pub fn count_live(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    // == Iteration ==
    /// Iterates over live `(key, value)` pairs.
    ///
    /// Runs the opportunistic purge check, then filters stale entries against
    /// the instant captured here without deleting them. The iterator holds
    /// shard read locks while it walks, so do not write to this cache from
    /// the same thread until it is dropped.
    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_
    where
        V: Clone,
    {
        self.live_entries(|key, entry| (key.clone(), entry.value.clone()))
    }

    /// Iterates over live keys. Same locking rules as [`iter`](Self::iter).
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.live_entries(|key, _| key.clone())
    }

    /// Iterates over live values. Same locking rules as [`iter`](Self::iter).
    pub fn values(&self) -> impl Iterator<Item = V> + '_
    where
        V: Clone,
    {
        self.live_entries(|_, entry| entry.value.clone())
    }

    /// Collects every live `(key, value)` pair.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.iter().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    // == Internals ==
    fn live_entries<'a, T, F>(&'a self, project: F) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
        F: Fn(&K, &CacheEntry<V>) -> T + 'a,
    {
        let now = self.clock.now();
        self.purge_if_due(now);
        self.entries.iter().filter_map(move |entry| {
            (!entry.is_expired_at(now)).then(|| project(entry.key(), entry.value()))
        })
    }

    fn schedule_next_purge(&self, now: DateTime<Utc>) {
        let next = expiry_after(now, self.purge_interval).timestamp_millis();
        self.next_purge_at.store(next, Ordering::Release);
    }

    /// Runs a sweep if the watermark has passed. When several threads see
    /// it pass at once, only the one that advances the watermark sweeps.
    fn purge_if_due(&self, now: DateTime<Utc>) {
        let due = self.next_purge_at.load(Ordering::Acquire);
        if now.timestamp_millis() < due {
            return;
        }

        let next = expiry_after(now, self.purge_interval).timestamp_millis();
        if self
            .next_purge_at
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            trace!("Purge watermark reached");
            self.purge_expired_at(now);
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a ExpiringCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    type Item = (K, V);
    type IntoIter = Box<dyn Iterator<Item = (K, V)> + 'a>;

    /// Same as [`ExpiringCache::iter`].
    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<K, V, S> Extend<(K, V)> for ExpiringCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V, S> fmt::Debug for ExpiringCache<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("ttl", &self.ttl)
            .field("purge_interval", &self.purge_interval)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}
