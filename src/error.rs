//! Error types for job registration.
//!
//! Registration failures are synchronous and local: the caller gets an
//! error, no entry is created, and no slot is touched. Runtime
//! scheduling races are absorbed internally (the firing is skipped)
//! and never surface as errors; failures raised by a job callback are
//! the driver's policy, not the scheduler's.

use std::time::Duration;

/// Error returned when a job cannot be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The requested interval resolves to zero whole ticks on every
    /// wheel it was offered to.
    #[error("interval {interval:?} is below the {resolution:?} wheel resolution")]
    IntervalTooFine {
        /// The requested interval.
        interval: Duration,
        /// The finest resolution that was available.
        resolution: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_too_fine_display() {
        let err = ScheduleError::IntervalTooFine {
            interval: Duration::from_millis(30),
            resolution: Duration::from_millis(50),
        };
        let text = err.to_string();
        assert!(text.contains("30ms"), "display mentions interval: {text}");
        assert!(text.contains("50ms"), "display mentions resolution: {text}");
    }
}
