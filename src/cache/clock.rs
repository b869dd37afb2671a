//! Clock Module
//!
//! Pluggable source of "now" for expiration checks.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

// == Clock ==
/// Source of the current instant.
///
/// Implementations must be non-decreasing. Any `Fn() -> DateTime<Utc>`
/// closure is a clock, so a plain function can be injected.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

// == System Clock ==
/// Wall-clock UTC time. The default for every cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// == Manual Clock ==
/// Clock that only moves when told to.
///
/// Clones share the same instant, so a test can hand one clone to the cache
/// and keep another to advance time without sleeping. Millisecond precision.
#[derive(Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    // == Constructor ==
    /// Creates a clock stopped at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Creates a clock stopped at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::default()
    }

    // == Set ==
    /// Moves the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    // == Advance ==
    /// Moves the clock forward by `by`. Negative durations are ignored and
    /// the clock stops at the latest representable instant.
    pub fn advance(&self, by: Duration) {
        let step = by.num_milliseconds().max(0);
        let latest = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |millis| {
                Some(millis.saturating_add(step).min(latest))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.now())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_close_to_utc_now() {
        let before = Utc::now();
        let now = SystemClock.now();
        let after = Utc::now();

        assert!(before <= now && now <= after);
    }

    #[test]
    fn test_manual_clock_starts_at_epoch() {
        let clock = ManualClock::at_epoch();
        assert_eq!(clock.now().timestamp_millis(), 0);
    }

    #[test]
    fn test_manual_clock_advance_is_shared_between_clones() {
        let clock = ManualClock::at_epoch();
        let handle = clock.clone();

        handle.advance(Duration::milliseconds(1500));

        assert_eq!(clock.now().timestamp_millis(), 1500);
    }

    #[test]
    fn test_manual_clock_ignores_negative_advance() {
        let clock = ManualClock::at_epoch();
        clock.advance(Duration::seconds(2));
        clock.advance(Duration::seconds(-1));

        assert_eq!(clock.now().timestamp_millis(), 2000);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::at_epoch();
        let latest = DateTime::<Utc>::MAX_UTC.timestamp_millis();

        clock.advance(Duration::MAX);
        assert_eq!(clock.now().timestamp_millis(), latest);

        clock.advance(Duration::MAX);
        assert_eq!(clock.now().timestamp_millis(), latest);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::at_epoch();
        let target = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        clock.set(target);

        assert_eq!(clock.now(), target);
    }

    #[test]
    fn test_closure_is_a_clock() {
        let fixed = DateTime::from_timestamp(42, 0).unwrap();
        let clock = move || fixed;

        assert_eq!(Clock::now(&clock), fixed);
    }
}
