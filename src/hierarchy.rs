//! The multi-level wheel hierarchy and its registration surface.

use crate::clock::{TimeSource, WallClock};
use crate::config::{HierarchyConfig, UNLIMITED_RUNS};
use crate::entry::{Entry, Job};
use crate::error::ScheduleError;
use crate::types::Time;
use crate::wheel::Wheel;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// An ordered set of wheels from finest (level 0) to coarsest.
///
/// Each coarser wheel's resolution is the finer one's multiplied by
/// the slot count, so every finer resolution evenly divides every
/// coarser one. A registration is routed to the coarsest wheel whose
/// resolution evenly divides the requested interval; an interval with
/// no exact fit lands on the coarsest wheel it spans at least one tick
/// of, and the hand-off machinery re-anchors the sub-resolution
/// remainder each cycle.
///
/// # Example
///
/// ```
/// use tickwheel::{HierarchyConfig, WheelHierarchy};
/// use std::time::Duration;
///
/// let hierarchy = WheelHierarchy::new(HierarchyConfig::default());
/// let entry = hierarchy
///     .add(Duration::from_millis(100), || {})
///     .expect("interval fits the finest wheel");
/// entry.close();
/// ```
#[derive(Debug)]
pub struct WheelHierarchy {
    wheels: Vec<Arc<Wheel>>,
    clock: Arc<dyn TimeSource>,
    self_handle: Weak<Self>,
}

impl WheelHierarchy {
    /// Builds a hierarchy driven by a monotonic wall clock.
    ///
    /// # Panics
    ///
    /// Panics if the configuration has zero levels, fewer than 2 slots
    /// per wheel, or a sub-millisecond base resolution.
    #[must_use]
    pub fn new(config: HierarchyConfig) -> Arc<Self> {
        Self::with_clock(config, Arc::new(WallClock::new()))
    }

    /// Builds a hierarchy with an explicit time source.
    ///
    /// Virtual clocks make every tick-processing test deterministic.
    #[must_use]
    pub fn with_clock(config: HierarchyConfig, clock: Arc<dyn TimeSource>) -> Arc<Self> {
        assert!(config.levels >= 1, "hierarchy needs at least one wheel");
        assert!(
            config.base_resolution >= Duration::from_millis(1),
            "base resolution must be at least 1ms"
        );
        Arc::new_cyclic(|handle: &Weak<Self>| {
            let wheels = (0..config.levels)
                .map(|level| {
                    Arc::new(Wheel::new(
                        level,
                        config.resolution_ms_at(level),
                        config.slots_per_wheel,
                        Arc::clone(&clock),
                        handle.clone(),
                    ))
                })
                .collect();
            Self {
                wheels,
                clock,
                self_handle: handle.clone(),
            }
        })
    }

    /// Returns the wheels, finest first.
    #[must_use]
    pub fn wheels(&self) -> &[Arc<Wheel>] {
        &self.wheels
    }

    /// Returns the wheel at `level`, if it exists.
    #[must_use]
    pub fn wheel(&self, level: usize) -> Option<&Arc<Wheel>> {
        self.wheels.get(level)
    }

    /// Returns the current time from the hierarchy's clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Total entry references across all wheels and slots.
    #[must_use]
    pub fn pending_refs(&self) -> usize {
        self.wheels.iter().map(|wheel| wheel.pending_refs()).sum()
    }

    /// Registers a job, routing it to the most appropriate wheel.
    ///
    /// `times` is the number of firings before the entry closes;
    /// [`UNLIMITED_RUNS`] means no limit. Fails when the interval is
    /// below the finest wheel's resolution.
    pub fn schedule(
        &self,
        interval: Duration,
        job: Job,
        singleton: bool,
        times: i64,
    ) -> Result<Arc<Entry>, ScheduleError> {
        let interval_ms = interval.as_millis() as u64;
        for wheel in self.wheels.iter().rev() {
            if interval_ms >= wheel.resolution_ms() && interval_ms % wheel.resolution_ms() == 0 {
                return wheel.schedule(interval, job, singleton, times);
            }
        }
        for wheel in self.wheels.iter().rev() {
            if interval_ms >= wheel.resolution_ms() {
                return wheel.schedule(interval, job, singleton, times);
            }
        }
        Err(ScheduleError::IntervalTooFine {
            interval,
            resolution: self.wheels[0].resolution(),
        })
    }

    /// Registers a job that fires every `interval`, without limit.
    pub fn add(
        &self,
        interval: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.schedule(interval, Arc::new(job), false, UNLIMITED_RUNS)
    }

    /// Registers a job with singleton execution: overlapping firings
    /// of the same entry are suppressed.
    pub fn add_singleton(
        &self,
        interval: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.schedule(interval, Arc::new(job), true, UNLIMITED_RUNS)
    }

    /// Registers a job that fires exactly once after `interval`.
    pub fn add_once(
        &self,
        interval: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.schedule(interval, Arc::new(job), false, 1)
    }

    /// Registers a job that fires `times` times, then closes.
    pub fn add_times(
        &self,
        interval: Duration,
        times: i64,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.schedule(interval, Arc::new(job), false, times)
    }

    /// After `delay`, registers an unlimited periodic job at
    /// `interval`. Returns the delay entry.
    pub fn delay_add(
        &self,
        delay: Duration,
        interval: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.delayed(delay, interval, false, UNLIMITED_RUNS, Arc::new(job))
    }

    /// After `delay`, registers an unlimited singleton job at
    /// `interval`. Returns the delay entry.
    pub fn delay_add_singleton(
        &self,
        delay: Duration,
        interval: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.delayed(delay, interval, true, UNLIMITED_RUNS, Arc::new(job))
    }

    /// After `delay`, registers a one-shot job at `interval`. Returns
    /// the delay entry.
    pub fn delay_add_once(
        &self,
        delay: Duration,
        interval: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.delayed(delay, interval, false, 1, Arc::new(job))
    }

    /// After `delay`, registers a job that fires `times` times at
    /// `interval`. Returns the delay entry.
    pub fn delay_add_times(
        &self,
        delay: Duration,
        interval: Duration,
        times: i64,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<Entry>, ScheduleError> {
        self.delayed(delay, interval, false, times, Arc::new(job))
    }

    fn delayed(
        &self,
        delay: Duration,
        interval: Duration,
        singleton: bool,
        times: i64,
        job: Job,
    ) -> Result<Arc<Entry>, ScheduleError> {
        let wrapper = self.registration_job(interval, singleton, times, job);
        self.schedule(delay, wrapper, false, 1)
    }

    /// Schedules a one-shot on the finest wheel after `delay`.
    ///
    /// Used by the hand-off path; a delay finer than the finest
    /// resolution is rounded up to one tick rather than dropped.
    pub(crate) fn schedule_once_after(&self, delay: Duration, job: Job) {
        let finest = &self.wheels[0];
        let clamped = delay.max(finest.resolution());
        if let Err(error) = finest.schedule(clamped, job, false, 1) {
            tracing::error!(%error, "one-shot hand-off failed");
        }
    }

    /// Schedules a fresh periodic registration to happen after
    /// `delay`, carrying over the remaining run budget and singleton
    /// flag of a demoted entry.
    pub(crate) fn schedule_periodic_after(
        &self,
        delay: Duration,
        interval: Duration,
        times: i64,
        singleton: bool,
        job: Job,
    ) {
        let wrapper = self.registration_job(interval, singleton, times, job);
        self.schedule_once_after(delay, wrapper);
    }

    /// A job that, when fired, performs a periodic registration.
    fn registration_job(
        &self,
        interval: Duration,
        singleton: bool,
        times: i64,
        job: Job,
    ) -> Job {
        let handle = self.self_handle.clone();
        Arc::new(move || {
            if let Some(hierarchy) = handle.upgrade() {
                if let Err(error) =
                    hierarchy.schedule(interval, Arc::clone(&job), singleton, times)
                {
                    tracing::error!(%error, "deferred registration failed");
                }
            }
        })
    }
}
