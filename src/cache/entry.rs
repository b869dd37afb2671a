//! Cache Entry Module
//!
//! Defines the value half of a stored entry together with its absolute
//! expiration instant. The key lives in the backing map.

use chrono::{DateTime, Duration, Utc};

// == Cache Entry ==
/// A stored value and the instant it stops being readable.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Absolute expiration instant
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now`.
    pub fn new(value: V, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expiry_after(now, ttl),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// Boundary condition: an entry is stale once `now` reaches its
    /// expiration instant, so a full TTL never yields one extra read.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the time left before expiration, zero once stale.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

// == Utility Functions ==
/// Returns `now + after`, saturating at the latest representable instant.
pub(crate) fn expiry_after(now: DateTime<Utc>, after: Duration) -> DateTime<Utc> {
    now.checked_add_signed(after)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
