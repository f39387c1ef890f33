//! Local clocks used by the ingestion pipeline

use std::time::Instant;

use super::types::Timestamp;

/// Monotonic media clock
///
/// All unit timestamps are microseconds relative to the instant the clock
/// was created. The wire format carries no timing, so the demuxer stamps
/// each extracted unit with this clock.
#[derive(Debug, Clone, Copy)]
pub struct MediaClock {
    base: Instant,
}

impl MediaClock {
    /// Create a new media clock starting now
    pub fn new() -> Self {
        Self::with_base(Instant::now())
    }

    /// Create a new media clock with a specific base instant
    pub fn with_base(base: Instant) -> Self {
        Self { base }
    }

    /// Current monotonic timestamp
    pub fn now(&self) -> Timestamp {
        self.timestamp_from_instant(Instant::now())
    }

    /// Get a timestamp relative to the clock base
    pub fn timestamp_from_instant(&self, instant: Instant) -> Timestamp {
        Timestamp::from_instant(instant, self.base)
    }
}

impl Default for MediaClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall clock in milliseconds since the Unix epoch.
///
/// Ping timestamps are produced by the server's wall clock, so latency
/// samples have to be taken against ours rather than the monotonic clock.
pub fn wall_clock_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// One-way latency of a Ping, clamped at zero when the clocks disagree.
pub fn latency_sample_ms(local_ms: u64, remote_ms: u64) -> f64 {
    local_ms.saturating_sub(remote_ms) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_monotonic() {
        let base = Instant::now();
        let clock = MediaClock::with_base(base);

        let ts = clock.timestamp_from_instant(base + Duration::from_millis(5));
        assert_eq!(ts.micros, 5_000);

        // instants before the base saturate to zero
        let clock = MediaClock::with_base(base + Duration::from_secs(1));
        assert_eq!(clock.timestamp_from_instant(base).micros, 0);
    }

    #[test]
    fn test_latency_sample_clamped() {
        assert_eq!(latency_sample_ms(1_000_050, 1_000_000), 50.0);
        // remote clock ahead of ours
        assert_eq!(latency_sample_ms(1_000_000, 1_000_020), 0.0);
    }

    #[test]
    fn test_wall_clock_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(wall_clock_millis() > 1_577_836_800_000);
    }
}
