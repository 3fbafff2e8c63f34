//! One level of the timing-wheel hierarchy.

use crate::clock::TimeSource;
use crate::entry::{Entry, Job};
use crate::error::ScheduleError;
use crate::hierarchy::WheelHierarchy;
use crate::slot::Slot;
use crate::types::EntryId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// A fixed ring of slots advanced by a monotonically increasing tick
/// counter.
///
/// A periodic entry is appended once, at registration, into every slot
/// its recurrence pattern touches within one revolution; the modular
/// tick arithmetic then revisits it forever without moving it. Only
/// the hand-off to a finer wheel ever creates new entries.
#[derive(Debug)]
pub struct Wheel {
    level: usize,
    resolution_ms: u64,
    ticks: AtomicU64,
    slots: Vec<Slot>,
    clock: Arc<dyn TimeSource>,
    hierarchy: Weak<WheelHierarchy>,
}

impl Wheel {
    pub(crate) fn new(
        level: usize,
        resolution_ms: u64,
        slot_count: usize,
        clock: Arc<dyn TimeSource>,
        hierarchy: Weak<WheelHierarchy>,
    ) -> Self {
        assert!(resolution_ms >= 1, "wheel resolution must be at least 1ms");
        assert!(slot_count >= 2, "wheel must have at least 2 slots");
        Self {
            level,
            resolution_ms,
            ticks: AtomicU64::new(0),
            slots: (0..slot_count).map(|_| Slot::new()).collect(),
            clock,
            hierarchy,
        }
    }

    /// Returns this wheel's tier within the hierarchy (0 is finest).
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the duration of one tick in milliseconds.
    #[must_use]
    pub fn resolution_ms(&self) -> u64 {
        self.resolution_ms
    }

    /// Returns the duration of one tick.
    #[must_use]
    pub fn resolution(&self) -> Duration {
        Duration::from_millis(self.resolution_ms)
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the current tick counter value.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Advances the tick counter by one, returning the new tick.
    ///
    /// Only the driving loop for this wheel may call this.
    pub fn advance_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the slot visited at `tick`.
    #[must_use]
    pub fn slot_at(&self, tick: u64) -> &Slot {
        &self.slots[(tick % self.slots.len() as u64) as usize]
    }

    /// Registers a job on this wheel.
    ///
    /// Fails when `interval` spans less than one tick; the caller must
    /// pick a finer wheel. On success the entry is appended into every
    /// distinct slot its recurrence touches, starting one interval
    /// ahead of the current tick — never twice into the same slot.
    pub fn schedule(
        &self,
        interval: Duration,
        job: Job,
        singleton: bool,
        times: i64,
    ) -> Result<Arc<Entry>, ScheduleError> {
        let interval_ms = interval.as_millis() as u64;
        let interval_ticks = interval_ms / self.resolution_ms;
        if interval_ticks == 0 {
            return Err(ScheduleError::IntervalTooFine {
                interval,
                resolution: self.resolution(),
            });
        }

        let now = self.clock.now();
        let tick = self.current_tick();
        let entry = Arc::new(Entry::new(
            EntryId::next(now),
            job,
            self.level,
            self.hierarchy.clone(),
            singleton,
            times,
            tick,
            now.as_millis(),
            interval_ticks,
            interval_ms,
        ));

        let slot_count = self.slots.len() as u64;
        let placements = times.clamp(0, slot_count as i64) as usize;
        let mut occupied = HashSet::with_capacity(placements.min(self.slots.len()));
        let mut index = (tick + interval_ticks) % slot_count;
        for _ in 0..placements {
            if !occupied.insert(index) {
                break;
            }
            self.slots[index as usize].push(Arc::clone(&entry));
            index = (index + interval_ticks) % slot_count;
        }

        tracing::debug!(
            id = %entry.id(),
            level = self.level,
            interval_ms,
            interval_ticks,
            slots = occupied.len(),
            "registered entry"
        );
        Ok(entry)
    }

    /// Runs the runnability check over the slot due at `now_tick` and
    /// returns the entries the caller should dispatch.
    ///
    /// Iterates a snapshot so dispatching never holds the slot lock;
    /// closed entries observed along the way are purged.
    pub fn collect_runnable(&self, now_tick: u64, now_ms: u64) -> Vec<Arc<Entry>> {
        let slot = self.slot_at(now_tick);
        let mut due = Vec::new();
        let mut saw_closed = false;
        for entry in slot.snapshot() {
            if entry.check_and_mark_runnable(now_tick, now_ms) {
                due.push(entry);
            } else if entry.is_closed() {
                saw_closed = true;
            }
        }
        if saw_closed {
            slot.purge_closed();
        }
        due
    }

    /// Total entry references across all slots.
    ///
    /// A periodic entry counts once per occupied slot.
    #[must_use]
    pub fn pending_refs(&self) -> usize {
        self.slots.iter().map(Slot::len).sum()
    }
}
