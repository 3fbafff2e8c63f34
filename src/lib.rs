//! Tickwheel: a hierarchical timing-wheel task scheduler.
//!
//! # Overview
//!
//! Tickwheel lets a process register recurring or delayed callback
//! jobs with millisecond-class intervals. Registration and removal are
//! O(1): an entry is appended once into the slots its recurrence
//! pattern touches, and the modular tick arithmetic revisits it
//! forever without re-sorting or re-inserting. There are no per-job
//! timers and no deadline heap.
//!
//! # Core Behaviors
//!
//! - **Multi-level wheels**: a [`WheelHierarchy`] owns wheels from
//!   finest to coarsest; each coarser resolution is the finer one
//!   multiplied by the slot count. Registrations route to the coarsest
//!   wheel whose resolution evenly divides the interval.
//! - **Hand-off to finer wheels**: a coarse wheel quantizes, so a tick
//!   can come due slightly ahead of the millisecond-accurate schedule.
//!   When that happens the entry closes itself and hands the residual
//!   delay to the finest wheel as a one-shot, re-anchoring any
//!   remaining periodic firings at the accurate phase.
//! - **Singleton execution**: a per-entry flag suppressing overlapping
//!   invocations of the same job.
//! - **Run budgets**: entries fire a fixed number of times, or
//!   effectively forever with [`UNLIMITED_RUNS`]; counters are clamped
//!   so huge budgets never wrap into meaningful finite values.
//!
//! Timing is approximate by design: a job fires within one tick of the
//! wheel it lives on, not with hard real-time precision.
//!
//! # Module Structure
//!
//! - [`types`]: logical timestamps and entry identifiers
//! - [`clock`]: wall and virtual time sources
//! - [`config`]: hierarchy configuration and run-count constants
//! - [`entry`]: a scheduled job and its runnability check
//! - [`slot`]: per-tick-position entry lists
//! - [`wheel`]: one level of the hierarchy
//! - [`hierarchy`]: routing, demotion, and the registration surface
//! - [`driver`]: background tick loops and dispatch policy
//! - [`error`]: registration error types
//!
//! # Example
//!
//! ```
//! use tickwheel::{Driver, HierarchyConfig, WheelHierarchy};
//! use std::time::Duration;
//!
//! let hierarchy = WheelHierarchy::new(HierarchyConfig::default());
//! let entry = hierarchy
//!     .add_times(Duration::from_millis(100), 3, || println!("tick"))
//!     .expect("interval fits the finest wheel");
//!
//! let mut driver = Driver::new(hierarchy);
//! driver.start().expect("spawn tick threads");
//! // ... the job fires three times, then the entry closes ...
//! entry.close();
//! driver.shutdown();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod clock;
pub mod config;
pub mod driver;
pub mod entry;
pub mod error;
pub mod hierarchy;
pub mod slot;
pub mod test_utils;
pub mod types;
pub mod wheel;

pub use clock::{TimeSource, VirtualClock, WallClock};
pub use config::{HierarchyConfig, RUNS_CLAMP_THRESHOLD, UNLIMITED_RUNS};
pub use driver::{Driver, PanicPolicy};
pub use entry::{Entry, EntryStatus, Job};
pub use error::ScheduleError;
pub use hierarchy::WheelHierarchy;
pub use slot::Slot;
pub use types::{EntryId, Time};
pub use wheel::Wheel;
