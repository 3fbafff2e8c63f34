//! A scheduled job and its runnability check.
//!
//! An [`Entry`] is one registered job: its interval (in owning-wheel
//! ticks and in milliseconds), its remaining-run count, its singleton
//! flag, and its lifecycle status. All shared fields are independent
//! atomics; there is no entry-wide lock, so the per-tick runnability
//! check is deliberately not atomic as a whole. Every race that can
//! result is bounded to "skip this firing" rather than corrupting
//! state.

use crate::config::{RUNS_CLAMP_THRESHOLD, UNLIMITED_RUNS};
use crate::hierarchy::WheelHierarchy;
use crate::types::EntryId;
use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// A zero-argument job callback.
pub type Job = Arc<dyn Fn() + Send + Sync + 'static>;

/// Lifecycle state of an entry.
///
/// Transitions are `Ready -> Running -> Ready` (the singleton cycle)
/// or any state `-> Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Eligible to fire on its next due tick.
    Ready,
    /// A singleton execution is in flight.
    Running,
    /// Terminal; the entry will never fire again.
    Closed,
}

impl EntryStatus {
    const fn as_raw(self) -> i32 {
        match self {
            Self::Ready => 0,
            Self::Running => 1,
            Self::Closed => -1,
        }
    }

    const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Ready,
            1 => Self::Running,
            _ => Self::Closed,
        }
    }
}

/// One scheduled job in a wheel.
///
/// Entries are created by [`Wheel::schedule`](crate::Wheel::schedule)
/// and referenced from every slot their recurrence pattern touches.
/// They are never moved between wheels: when a coarse wheel hands a
/// job down to a finer one, a new entry is created there and this one
/// closes.
pub struct Entry {
    id: EntryId,
    job: Job,
    /// Owning wheel's tier; 0 is the finest level.
    level: usize,
    hierarchy: Weak<WheelHierarchy>,
    singleton: AtomicBool,
    status: AtomicI32,
    remaining_runs: AtomicI64,
    created_at_tick: u64,
    created_at_ms: u64,
    last_fired_at_ms: AtomicU64,
    interval_ticks: u64,
    interval_ms: u64,
}

impl Entry {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: EntryId,
        job: Job,
        level: usize,
        hierarchy: Weak<WheelHierarchy>,
        singleton: bool,
        times: i64,
        created_at_tick: u64,
        now_ms: u64,
        interval_ticks: u64,
        interval_ms: u64,
    ) -> Self {
        debug_assert!(interval_ticks >= 1);
        Self {
            id,
            job,
            level,
            hierarchy,
            singleton: AtomicBool::new(singleton),
            status: AtomicI32::new(EntryStatus::Ready.as_raw()),
            remaining_runs: AtomicI64::new(times),
            created_at_tick,
            created_at_ms: now_ms,
            last_fired_at_ms: AtomicU64::new(now_ms),
            interval_ticks,
            interval_ms,
        }
    }

    /// Returns this entry's identifier.
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Returns the owning wheel's level (0 is the finest).
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the interval in owning-wheel ticks.
    #[must_use]
    pub fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    /// Returns the interval in milliseconds.
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns the owning wheel's tick counter value at creation.
    #[must_use]
    pub fn created_at_tick(&self) -> u64 {
        self.created_at_tick
    }

    /// Returns the wall-clock milliseconds at creation.
    #[must_use]
    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        EntryStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    /// Replaces the lifecycle status, returning the previous value.
    ///
    /// Returning the previous value enables compare-and-act patterns;
    /// the singleton guard in the runnability check is built on it.
    pub fn set_status(&self, status: EntryStatus) -> EntryStatus {
        EntryStatus::from_raw(self.status.swap(status.as_raw(), Ordering::AcqRel))
    }

    /// Closes the entry. Idempotent.
    ///
    /// Closing is fire-and-forget: an entry already selected for
    /// firing on the current tick may still fire once more, after
    /// which every subsequent tick skips it.
    pub fn close(&self) {
        self.status
            .store(EntryStatus::Closed.as_raw(), Ordering::Release);
    }

    /// Returns true if the entry is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status() == EntryStatus::Closed
    }

    /// Returns whether re-entrant firing is suppressed.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.singleton.load(Ordering::Acquire)
    }

    /// Sets the singleton flag; observed by the next tick.
    pub fn set_singleton(&self, enabled: bool) {
        self.singleton.store(enabled, Ordering::Release);
    }

    /// Returns the remaining-run count.
    #[must_use]
    pub fn remaining_runs(&self) -> i64 {
        self.remaining_runs.load(Ordering::Acquire)
    }

    /// Replaces the remaining-run count.
    ///
    /// Races with an in-flight decrement are last-writer-wins; this is
    /// not linearizable with concurrent firings.
    pub fn set_times(&self, times: i64) {
        self.remaining_runs.store(times, Ordering::Release);
    }

    /// Invokes the stored job synchronously.
    ///
    /// A panic raised by the job is not contained here; propagation
    /// policy belongs to the driver.
    pub fn run(&self) {
        (self.job)();
    }

    pub(crate) fn job(&self) -> Job {
        Arc::clone(&self.job)
    }

    /// Decides whether this entry should fire on `now_tick`, updating
    /// lifecycle state as a side effect.
    ///
    /// Returns true when the caller should dispatch the job. Returns
    /// false when the entry is not due, closed, suppressed by the
    /// singleton guard, exhausted, or has been handed down to a finer
    /// wheel (in which case this entry is now closed and replacement
    /// entries carry the job onward).
    pub fn check_and_mark_runnable(&self, now_tick: u64, now_ms: u64) -> bool {
        if now_tick <= self.created_at_tick {
            return false;
        }
        let diff = now_tick - self.created_at_tick;
        if diff % self.interval_ticks != 0 {
            return false;
        }
        if self.status() == EntryStatus::Closed {
            return false;
        }
        if self.is_singleton() && self.set_status(EntryStatus::Running) == EntryStatus::Running {
            // A previous firing has not signaled completion; skip.
            return false;
        }
        let mut times = self.remaining_runs.fetch_sub(1, Ordering::AcqRel) - 1;
        if times <= 0 {
            self.close();
            if times < 0 {
                // Lost a concurrent decrement race; the run budget was
                // already spent by another tick.
                return false;
            }
        }
        if times > RUNS_CLAMP_THRESHOLD {
            self.remaining_runs.store(UNLIMITED_RUNS, Ordering::Release);
            times = UNLIMITED_RUNS;
        }
        if self.level > 0 {
            let elapsed = now_ms.saturating_sub(self.last_fired_at_ms.load(Ordering::Acquire));
            if elapsed < self.interval_ms {
                // The coarse tick arrived ahead of the millisecond
                // schedule; hand the residual delay to a finer wheel
                // and retire this entry.
                self.demote(times, self.interval_ms - elapsed);
                return false;
            }
        }
        self.last_fired_at_ms.store(now_ms, Ordering::Release);
        true
    }

    /// Hands this entry's job down to a finer wheel: a one-shot for
    /// the residual `delay_ms`, plus a fresh periodic registration if
    /// runs remain. This entry closes either way.
    fn demote(&self, times: i64, delay_ms: u64) {
        if let Some(hierarchy) = self.hierarchy.upgrade() {
            let delay = Duration::from_millis(delay_ms);
            tracing::trace!(
                id = %self.id,
                level = self.level,
                delay_ms,
                remaining = times,
                "demoting entry to finer wheel"
            );
            hierarchy.schedule_once_after(delay, self.job());
            if times > 0 {
                hierarchy.schedule_periodic_after(
                    delay,
                    Duration::from_millis(self.interval_ms),
                    times,
                    self.is_singleton(),
                    self.job(),
                );
            }
        }
        self.close();
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("status", &self.status())
            .field("singleton", &self.is_singleton())
            .field("remaining_runs", &self.remaining_runs())
            .field("created_at_tick", &self.created_at_tick)
            .field("interval_ticks", &self.interval_ticks)
            .field("interval_ms", &self.interval_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn counting_job() -> (Job, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let captured = counter.clone();
        let job: Job = Arc::new(move || {
            captured.fetch_add(1, Ordering::SeqCst);
        });
        (job, counter)
    }

    /// A finest-level entry with no live hierarchy behind it; the
    /// demotion path is unreachable at level 0, so the check logic can
    /// be exercised in isolation.
    fn finest_entry(singleton: bool, times: i64, interval_ticks: u64) -> Entry {
        let (job, _) = counting_job();
        Entry::new(
            EntryId::next(crate::types::Time::ZERO),
            job,
            0,
            Weak::new(),
            singleton,
            times,
            0,
            0,
            interval_ticks,
            interval_ticks * 50,
        )
    }

    #[test]
    fn not_due_before_first_interval() {
        init_test("not_due_before_first_interval");
        let entry = finest_entry(false, 3, 4);
        for tick in 0..4 {
            let due = entry.check_and_mark_runnable(tick, tick * 50);
            crate::assert_with_log!(!due, "tick not due", false, due);
        }
        let due = entry.check_and_mark_runnable(4, 200);
        crate::assert_with_log!(due, "first due tick fires", true, due);
        crate::test_complete!("not_due_before_first_interval");
    }

    #[test]
    fn due_only_on_interval_multiples() {
        init_test("due_only_on_interval_multiples");
        let entry = finest_entry(false, UNLIMITED_RUNS, 3);
        let fired: Vec<u64> = (1..=12)
            .filter(|&tick| entry.check_and_mark_runnable(tick, tick * 50))
            .collect();
        crate::assert_with_log!(
            fired == vec![3, 6, 9, 12],
            "fires on multiples of 3",
            vec![3u64, 6, 9, 12],
            fired
        );
        crate::test_complete!("due_only_on_interval_multiples");
    }

    #[test]
    fn closed_entry_never_fires() {
        init_test("closed_entry_never_fires");
        let entry = finest_entry(false, UNLIMITED_RUNS, 1);
        entry.close();
        entry.close(); // idempotent
        let due = entry.check_and_mark_runnable(1, 50);
        crate::assert_with_log!(!due, "closed entry skipped", false, due);
        crate::test_complete!("closed_entry_never_fires");
    }

    #[test]
    fn singleton_suppresses_reentrant_firing() {
        init_test("singleton_suppresses_reentrant_firing");
        let entry = finest_entry(true, UNLIMITED_RUNS, 1);

        let first = entry.check_and_mark_runnable(1, 50);
        crate::assert_with_log!(first, "first firing passes", true, first);
        let status = entry.status();
        crate::assert_with_log!(
            status == EntryStatus::Running,
            "status marked running",
            EntryStatus::Running,
            status
        );

        // The job has not completed; the next due tick is suppressed.
        let second = entry.check_and_mark_runnable(2, 100);
        crate::assert_with_log!(!second, "in-flight run suppresses", false, second);

        // Completion reverts the status; firing resumes.
        entry.set_status(EntryStatus::Ready);
        let third = entry.check_and_mark_runnable(3, 150);
        crate::assert_with_log!(third, "fires again after revert", true, third);
        crate::test_complete!("singleton_suppresses_reentrant_firing");
    }

    #[test]
    fn times_exhaustion_closes_entry() {
        init_test("times_exhaustion_closes_entry");
        let entry = finest_entry(false, 3, 1);
        let mut fired = 0;
        for tick in 1..=10 {
            if entry.check_and_mark_runnable(tick, tick * 50) {
                fired += 1;
            }
        }
        crate::assert_with_log!(fired == 3, "fires exactly 3 times", 3, fired);
        let closed = entry.is_closed();
        crate::assert_with_log!(closed, "entry closed after exhaustion", true, closed);
        crate::test_complete!("times_exhaustion_closes_entry");
    }

    #[test]
    fn lost_decrement_race_is_skipped() {
        init_test("lost_decrement_race_is_skipped");
        let entry = finest_entry(false, 0, 1);
        // remaining was already spent; the decrement observes -1.
        let due = entry.check_and_mark_runnable(1, 50);
        crate::assert_with_log!(!due, "negative budget skips", false, due);
        let closed = entry.is_closed();
        crate::assert_with_log!(closed, "entry closed", true, closed);
        crate::test_complete!("lost_decrement_race_is_skipped");
    }

    #[test]
    fn unlimited_runs_stay_unlimited() {
        init_test("unlimited_runs_stay_unlimited");
        let entry = finest_entry(false, UNLIMITED_RUNS, 1);
        for tick in 1..=5_000 {
            let due = entry.check_and_mark_runnable(tick, tick * 50);
            crate::assert_with_log!(due, "unlimited entry fires", true, due);
        }
        let remaining = entry.remaining_runs();
        crate::assert_with_log!(
            remaining == UNLIMITED_RUNS,
            "counter clamped to sentinel",
            UNLIMITED_RUNS,
            remaining
        );
        crate::test_complete!("unlimited_runs_stay_unlimited");
    }

    #[test]
    fn set_times_replaces_budget() {
        init_test("set_times_replaces_budget");
        let entry = finest_entry(false, 1, 1);
        entry.set_times(2);
        let mut fired = 0;
        for tick in 1..=5 {
            if entry.check_and_mark_runnable(tick, tick * 50) {
                fired += 1;
            }
        }
        crate::assert_with_log!(fired == 2, "replaced budget honored", 2, fired);
        crate::test_complete!("set_times_replaces_budget");
    }

    #[test]
    fn coarse_entry_without_hierarchy_closes_on_early_tick() {
        init_test("coarse_entry_without_hierarchy_closes_on_early_tick");
        let (job, counter) = counting_job();
        // Level 1, interval 1030ms but a tick-time of 1000ms: the
        // first due tick arrives 30ms early by wall clock.
        let entry = Entry::new(
            EntryId::next(crate::types::Time::ZERO),
            job,
            1,
            Weak::new(),
            false,
            5,
            0,
            0,
            2,
            1030,
        );
        let due = entry.check_and_mark_runnable(2, 1000);
        crate::assert_with_log!(!due, "early tick does not fire", false, due);
        let closed = entry.is_closed();
        crate::assert_with_log!(closed, "entry closed by hand-off", true, closed);
        let count = counter.load(Ordering::SeqCst);
        crate::assert_with_log!(count == 0, "job did not run", 0, count);
        crate::test_complete!("coarse_entry_without_hierarchy_closes_on_early_tick");
    }

    #[test]
    fn coarse_entry_fires_when_wall_clock_caught_up() {
        init_test("coarse_entry_fires_when_wall_clock_caught_up");
        let (job, _) = counting_job();
        // Interval is an exact multiple of the tick-time; wall clock
        // and tick arithmetic agree, so no hand-off happens.
        let entry = Entry::new(
            EntryId::next(crate::types::Time::ZERO),
            job,
            1,
            Weak::new(),
            false,
            5,
            0,
            0,
            2,
            1000,
        );
        let due = entry.check_and_mark_runnable(2, 1000);
        crate::assert_with_log!(due, "aligned coarse tick fires", true, due);
        let status = entry.status();
        crate::assert_with_log!(
            status == EntryStatus::Ready,
            "entry stays ready",
            EntryStatus::Ready,
            status
        );
        crate::test_complete!("coarse_entry_fires_when_wall_clock_caught_up");
    }
}
