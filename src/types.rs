//! Core types: logical timestamps and entry identifiers.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A logical timestamp with nanosecond resolution.
///
/// In production this corresponds to monotonic time since the clock's
/// epoch. Under a virtual clock it is whatever the test has advanced
/// it to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(u64);

impl Time {
    /// The zero instant (epoch).
    pub const ZERO: Self = Self(0);

    /// The maximum representable instant.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a new time from nanoseconds since epoch.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a new time from milliseconds since epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Creates a new time from seconds since epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Returns the time as nanoseconds since epoch.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns the time as milliseconds since epoch (truncated).
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Returns the time as seconds since epoch (truncated).
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Adds a duration in nanoseconds, saturating on overflow.
    #[must_use]
    pub const fn saturating_add_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }

    /// Returns the duration between two times in nanoseconds.
    ///
    /// Returns 0 if `self` is before `earlier`.
    #[must_use]
    pub const fn duration_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl core::ops::Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add_nanos(rhs.as_nanos() as u64)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ns)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000_000 {
            write!(
                f,
                "{}.{:03}s",
                self.0 / 1_000_000_000,
                (self.0 / 1_000_000) % 1000
            )
        } else if self.0 >= 1_000_000 {
            write!(f, "{}ms", self.0 / 1_000_000)
        } else if self.0 >= 1_000 {
            write!(f, "{}us", self.0 / 1_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

/// Process-unique identifier for a scheduled entry.
///
/// Identifiers are derived from the creation timestamp at nanosecond
/// resolution and are strictly monotone: a later-created entry always
/// has a larger id, even when the clock stands still (virtual time) or
/// two registrations land in the same nanosecond.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// Allocates the next id for an entry created at `now`.
    #[must_use]
    pub fn next(now: Time) -> Self {
        static LAST: AtomicU64 = AtomicU64::new(0);
        let nanos = now.as_nanos();
        let mut prev = LAST.load(Ordering::Relaxed);
        loop {
            let candidate = nanos.max(prev.saturating_add(1));
            match LAST.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(candidate),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_conversions() {
        assert_eq!(Time::from_secs(1).as_nanos(), 1_000_000_000);
        assert_eq!(Time::from_millis(1).as_nanos(), 1_000_000);
        assert_eq!(Time::from_nanos(2_500_000_000).as_millis(), 2500);
        assert_eq!(Time::from_nanos(2_500_000_000).as_secs(), 2);
    }

    #[test]
    fn time_duration_since_saturates() {
        let earlier = Time::from_secs(5);
        let later = Time::from_secs(7);
        assert_eq!(later.duration_since(earlier), 2_000_000_000);
        assert_eq!(earlier.duration_since(later), 0);
    }

    #[test]
    fn time_add_duration() {
        let t = Time::from_millis(10) + Duration::from_millis(5);
        assert_eq!(t.as_millis(), 15);
    }

    #[test]
    fn time_display_picks_unit() {
        assert_eq!(Time::from_nanos(120).to_string(), "120ns");
        assert_eq!(Time::from_millis(42).to_string(), "42ms");
        assert_eq!(Time::from_secs(3).to_string(), "3.000s");
    }

    #[test]
    fn entry_ids_are_strictly_monotone() {
        let a = EntryId::next(Time::ZERO);
        let b = EntryId::next(Time::ZERO);
        let c = EntryId::next(Time::ZERO);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn entry_ids_track_the_clock() {
        let far = Time::from_secs(1_000_000);
        let id = EntryId::next(far);
        assert!(id.as_u64() >= far.as_nanos());
        // A later allocation at an earlier clock reading still moves forward.
        let next = EntryId::next(Time::ZERO);
        assert!(next > id);
    }
}
