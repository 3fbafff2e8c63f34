//! Configuration for the wheel hierarchy and run-count constants.

use std::time::Duration;

/// Canonical "unlimited" remaining-run sentinel.
///
/// An entry whose remaining-run counter exceeds
/// [`RUNS_CLAMP_THRESHOLD`] after a decrement is reset to this value,
/// so repeated firings never walk a huge caller-supplied count down
/// into a meaningful finite range.
pub const UNLIMITED_RUNS: i64 = i32::MAX as i64;

/// Threshold above which a remaining-run counter is treated as
/// "unlimited" and clamped back to [`UNLIMITED_RUNS`].
pub const RUNS_CLAMP_THRESHOLD: i64 = 2_000_000_000;

/// Configuration for a [`WheelHierarchy`](crate::WheelHierarchy).
///
/// A hierarchy has `levels` wheels. Level 0 is the finest, ticking
/// every `base_resolution`; each coarser level's resolution is the
/// previous level's multiplied by `slots_per_wheel`, so every finer
/// resolution evenly divides every coarser one.
#[derive(Debug, Clone)]
pub struct HierarchyConfig {
    /// Number of wheel levels.
    ///
    /// Default: 6
    pub levels: usize,

    /// Number of slots per wheel.
    ///
    /// Default: 10
    pub slots_per_wheel: usize,

    /// Tick duration of the finest wheel. Intervals below this cannot
    /// be scheduled.
    ///
    /// Default: 50ms
    pub base_resolution: Duration,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            levels: 6,
            slots_per_wheel: 10,
            base_resolution: Duration::from_millis(50),
        }
    }
}

impl HierarchyConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of wheel levels.
    #[must_use]
    pub fn levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// Sets the number of slots per wheel.
    #[must_use]
    pub fn slots_per_wheel(mut self, slots: usize) -> Self {
        self.slots_per_wheel = slots;
        self
    }

    /// Sets the finest wheel's tick duration.
    #[must_use]
    pub fn base_resolution(mut self, resolution: Duration) -> Self {
        self.base_resolution = resolution;
        self
    }

    /// Resolution of the wheel at `level`, in milliseconds.
    #[must_use]
    pub fn resolution_ms_at(&self, level: usize) -> u64 {
        let base = self.base_resolution.as_millis() as u64;
        base.saturating_mul((self.slots_per_wheel as u64).saturating_pow(level as u32))
    }
}
