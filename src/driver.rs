//! Background tick loops that advance the wheels and dispatch jobs.
//!
//! One thread per wheel, each on a fixed cadence equal to that wheel's
//! resolution. Only the loop for a wheel ever advances its tick
//! counter; loops for different wheels run concurrently with each
//! other and with registration.
//!
//! Jobs run inline on the tick thread, so a long-running job delays
//! that wheel's subsequent ticks; offloading to a worker is a policy
//! choice left to the caller (wrap the job). What a job failure does
//! to the loop is governed by [`PanicPolicy`].

use crate::entry::{Entry, EntryStatus};
use crate::hierarchy::WheelHierarchy;
use crate::wheel::Wheel;
use parking_lot::{Condvar, Mutex};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// What a tick loop does with a panicking job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicPolicy {
    /// Catch the panic, log it, keep ticking. One entry's failure
    /// never takes down the wheel serving its neighbors.
    #[default]
    LogAndContinue,
    /// Let the panic unwind the tick thread.
    Propagate,
}

/// Drives a hierarchy's wheels from background threads.
///
/// Dropping the driver stops and joins the tick threads; entries that
/// were registered simply stop being visited.
#[derive(Debug)]
pub struct Driver {
    hierarchy: Arc<WheelHierarchy>,
    policy: PanicPolicy,
    running: Arc<AtomicBool>,
    shutdown_signal: Arc<(Mutex<()>, Condvar)>,
    threads: Vec<JoinHandle<()>>,
}

impl Driver {
    /// Creates a driver for `hierarchy`. No threads run until
    /// [`start`](Self::start).
    #[must_use]
    pub fn new(hierarchy: Arc<WheelHierarchy>) -> Self {
        Self {
            hierarchy,
            policy: PanicPolicy::default(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_signal: Arc::new((Mutex::new(()), Condvar::new())),
            threads: Vec::new(),
        }
    }

    /// Sets the panic policy for the tick threads.
    #[must_use]
    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the hierarchy this driver advances.
    #[must_use]
    pub fn hierarchy(&self) -> &Arc<WheelHierarchy> {
        &self.hierarchy
    }

    /// Returns true while the tick threads are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns one tick thread per wheel. Idempotent once running.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for wheel in self.hierarchy.wheels() {
            let wheel = Arc::clone(wheel);
            let hierarchy = Arc::clone(&self.hierarchy);
            let running = Arc::clone(&self.running);
            let signal = Arc::clone(&self.shutdown_signal);
            let policy = self.policy;
            let handle = std::thread::Builder::new()
                .name(format!("tickwheel-{}", wheel.level()))
                .spawn(move || tick_loop(&wheel, &hierarchy, &running, &signal, policy))?;
            self.threads.push(handle);
        }
        tracing::debug!(wheels = self.threads.len(), "driver started");
        Ok(())
    }

    /// Stops the tick threads and waits for them to exit.
    ///
    /// Eventually consistent with in-flight work: an entry already
    /// collected on the current tick may still fire once.
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let (lock, condvar) = &*self.shutdown_signal;
        {
            let _guard = lock.lock();
            condvar.notify_all();
        }
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::error!("tick thread exited with a panic");
            }
        }
        tracing::debug!("driver stopped");
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn tick_loop(
    wheel: &Wheel,
    hierarchy: &WheelHierarchy,
    running: &AtomicBool,
    signal: &(Mutex<()>, Condvar),
    policy: PanicPolicy,
) {
    let resolution = wheel.resolution();
    let (lock, condvar) = signal;
    let mut next_tick_at = Instant::now() + resolution;

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < next_tick_at {
            let mut guard = lock.lock();
            let _ = condvar.wait_until(&mut guard, next_tick_at);
            continue;
        }
        // No catch-up after a stall: missed tick boundaries are
        // skipped, not replayed.
        next_tick_at += resolution;
        if next_tick_at < now {
            next_tick_at = now + resolution;
        }

        let tick = wheel.advance_tick();
        let now_ms = hierarchy.now().as_millis();
        let due = wheel.collect_runnable(tick, now_ms);
        if !due.is_empty() {
            tracing::trace!(level = wheel.level(), tick, runnable = due.len(), "tick");
        }
        for entry in due {
            dispatch(&entry, policy);
        }
    }
}

/// Runs one entry's job under the driver's panic policy and honors
/// the singleton contract by reverting Running back to Ready once the
/// job returns.
fn dispatch(entry: &Arc<Entry>, policy: PanicPolicy) {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| entry.run()));
    if entry.is_singleton() && entry.status() == EntryStatus::Running {
        entry.set_status(EntryStatus::Ready);
    }
    if let Err(payload) = result {
        match policy {
            PanicPolicy::LogAndContinue => {
                tracing::error!(id = %entry.id(), "job panicked; entry remains scheduled");
            }
            PanicPolicy::Propagate => std::panic::resume_unwind(payload),
        }
    }
}
