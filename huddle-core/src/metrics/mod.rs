//! Metrics recorded by the event engine
//!
//! Only the `metrics` facade is used here. Whoever embeds the engine installs
//! a recorder; without one every call is a no-op.

use ::metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::{Duration, Instant};

pub const EVENTS_CREATED: &str = "events.created";
pub const EVENTS_STATUS_CHANGED: &str = "events.status_changed";
pub const EVENTS_VISIBILITY_CHANGED: &str = "events.visibility_changed";
pub const EVENTS_INVITES: &str = "events.invites";
pub const ACCESS_DENIED: &str = "access.denied";
pub const DISCOVERY_DURATION: &str = "events.discovery.duration_ms";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(EVENTS_CREATED, "Number of events created");
    describe_counter!(EVENTS_STATUS_CHANGED, "Number of moderation status changes");
    describe_counter!(EVENTS_VISIBILITY_CHANGED, "Number of visibility mode switches");
    describe_counter!(EVENTS_INVITES, "Number of users invited to events");
    describe_counter!(ACCESS_DENIED, "Number of reads or mutations refused to a caller");
    describe_histogram!(
        DISCOVERY_DURATION,
        "Duration of the accessible events query in milliseconds"
    );
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer, record the duration and return it
    pub fn stop(self) -> Duration {
        let elapsed = self.start.elapsed();
        histogram!(self.name).record(elapsed.as_secs_f64() * 1000.0);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        init_metrics();
        record_counter(EVENTS_CREATED, 1);

        let timer = Timer::new(DISCOVERY_DURATION);
        let elapsed = timer.stop();
        assert!(elapsed < Duration::from_secs(5));
    }
}
