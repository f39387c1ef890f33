//! Link quality statistics
//!
//! Three independent rolling aggregations fed from the processing context:
//! - latency: mean of the last N Ping samples
//! - fps: decoded frames inside a trailing time window
//! - bitrate: bytes received since the previous tick
//!
//! Every ingestion method is O(1) amortized. Methods taking an explicit
//! `Instant` exist so the windows can be driven deterministically.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::assets::{FPS_WINDOW, LATENCY_WINDOW};

/// Fixed-capacity FIFO of latency samples with a running sum
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    /// Negative samples are clamped to zero.
    pub fn push(&mut self, sample_ms: f64) {
        let sample = sample_ms.max(0.0);
        if self.samples.len() == self.capacity
            && let Some(oldest) = self.samples.pop_front()
        {
            self.sum -= oldest;
        }
        self.samples.push_back(sample);
        self.sum += sample;
    }

    /// Arithmetic mean of the retained samples, 0 when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        (self.sum / self.samples.len() as f64).max(0.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }
}

/// Timestamps of decoded frames inside a trailing window
#[derive(Debug, Clone)]
pub struct FpsWindow {
    frames: VecDeque<Instant>,
    span: Duration,
}

impl FpsWindow {
    pub fn new(span: Duration) -> Self {
        Self {
            frames: VecDeque::new(),
            span,
        }
    }

    pub fn record(&mut self, at: Instant) {
        self.frames.push_back(at);
    }

    /// Frames recorded within `span` before `now`; stale entries are evicted here.
    pub fn count(&mut self, now: Instant) -> usize {
        while let Some(&oldest) = self.frames.front() {
            if now.saturating_duration_since(oldest) >= self.span {
                self.frames.pop_front();
            } else {
                break;
            }
        }
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Byte counter reset on every tick
#[derive(Debug, Clone)]
pub struct BitrateMeter {
    bytes: u64,
    anchor: Instant,
}

impl BitrateMeter {
    pub fn new(anchor: Instant) -> Self {
        Self { bytes: 0, anchor }
    }

    pub fn record(&mut self, bytes: usize) {
        self.bytes = self.bytes.saturating_add(bytes as u64);
    }

    /// Megabits per second since the last anchor; restarts the count at `now`.
    pub fn take_mbps(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.anchor).as_secs_f64();
        let mbps = if elapsed > 0.0 {
            (self.bytes as f64 * 8.0) / elapsed / 1_000_000.0
        } else {
            0.0
        };
        self.bytes = 0;
        self.anchor = now;
        mbps
    }

    pub fn reset(&mut self, now: Instant) {
        self.bytes = 0;
        self.anchor = now;
    }
}

/// Snapshot emitted once per stats interval
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub latency_ms: f64,
    pub fps: f64,
    pub bitrate_mbps: f64,
    /// Units handed to the decoder since the last reset
    pub units_submitted: u64,
    /// Units dropped while waiting for a keyframe
    pub units_dropped: u64,
    pub decode_failures: u64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "latency={:.0}ms fps={:.0} bitrate={:.2}Mbps | submitted={} dropped={} decode_failures={}",
            self.latency_ms,
            self.fps,
            self.bitrate_mbps,
            self.units_submitted,
            self.units_dropped,
            self.decode_failures
        )
    }
}

/// Owns the three windows and the last computed snapshot
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    latency: LatencyWindow,
    fps: FpsWindow,
    bitrate: BitrateMeter,
    decode_failures: u64,
    last: StatsSnapshot,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::with_windows(LATENCY_WINDOW, FPS_WINDOW)
    }

    pub fn with_windows(latency_capacity: usize, fps_span: Duration) -> Self {
        Self {
            latency: LatencyWindow::new(latency_capacity),
            fps: FpsWindow::new(fps_span),
            bitrate: BitrateMeter::new(Instant::now()),
            decode_failures: 0,
            last: StatsSnapshot::default(),
        }
    }

    pub fn record_latency_sample(&mut self, ms: f64) {
        self.latency.push(ms);
    }

    pub fn record_frame_decoded(&mut self) {
        self.record_frame_decoded_at(Instant::now());
    }

    pub fn record_frame_decoded_at(&mut self, at: Instant) {
        self.fps.record(at);
    }

    pub fn record_bytes_received(&mut self, bytes: usize) {
        self.bitrate.record(bytes);
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    /// Compute a fresh snapshot. Resets the bitrate counter and anchor.
    ///
    /// Gate counters are passed in because the gate owns them.
    pub fn tick(&mut self, now: Instant, submitted: u64, dropped: u64) -> StatsSnapshot {
        self.last = StatsSnapshot {
            latency_ms: self.latency.mean(),
            fps: self.fps.count(now) as f64,
            bitrate_mbps: self.bitrate.take_mbps(now),
            units_submitted: submitted,
            units_dropped: dropped,
            decode_failures: self.decode_failures,
        };
        self.last
    }

    /// Last snapshot computed by [`StatsAggregator::tick`]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.last
    }

    /// Clear all accumulators; the tick schedule is owned by the caller and keeps running.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.latency.clear();
        self.fps.clear();
        self.bitrate.reset(now);
        self.decode_failures = 0;
        self.last = StatsSnapshot::default();
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_window_drops_oldest() {
        let mut window = LatencyWindow::new(10);
        for i in 1..=11 {
            window.push(i as f64 * 10.0);
        }

        // samples 20..=110 remain
        assert_eq!(window.len(), 10);
        assert!((window.mean() - 65.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_latency_window_clamps_negative() {
        let mut window = LatencyWindow::new(4);
        window.push(-30.0);
        window.push(10.0);
        assert!((window.mean() - 5.0).abs() < f64::EPSILON);

        assert_eq!(LatencyWindow::new(4).mean(), 0.0);
    }

    #[test]
    fn test_fps_window_trailing_second() {
        let base = Instant::now();
        let mut window = FpsWindow::new(Duration::from_millis(1000));

        // 30 frames spread over 2 seconds
        for i in 0..30u64 {
            window.record(base + Duration::from_millis(i * 2000 / 30));
        }

        let count = window.count(base + Duration::from_millis(2000));
        assert!((14..=16).contains(&count), "count was {count}");
    }

    #[test]
    fn test_fps_window_evicts_lazily() {
        let base = Instant::now();
        let mut window = FpsWindow::new(Duration::from_millis(1000));
        window.record(base);
        window.record(base + Duration::from_millis(500));

        assert_eq!(window.count(base + Duration::from_millis(600)), 2);
        assert_eq!(window.count(base + Duration::from_millis(1200)), 1);
        assert_eq!(window.count(base + Duration::from_millis(5000)), 0);
    }

    #[test]
    fn test_bitrate_one_megabit() {
        let base = Instant::now();
        let mut meter = BitrateMeter::new(base);
        meter.record(125_000);

        let mbps = meter.take_mbps(base + Duration::from_secs(1));
        assert!((mbps - 1.0).abs() < 1e-9);

        // counter restarts after the tick
        assert_eq!(meter.take_mbps(base + Duration::from_secs(2)), 0.0);
    }

    #[test]
    fn test_aggregator_tick_and_reset() {
        let base = Instant::now();
        let mut stats = StatsAggregator::new();
        stats.reset_at(base);

        stats.record_latency_sample(40.0);
        stats.record_latency_sample(60.0);
        stats.record_bytes_received(250_000);
        for i in 0..10u64 {
            stats.record_frame_decoded_at(base + Duration::from_millis(100 + i * 50));
        }
        stats.record_decode_failure();

        let snapshot = stats.tick(base + Duration::from_secs(1), 11, 3);
        assert!((snapshot.latency_ms - 50.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.fps, 10.0);
        assert!((snapshot.bitrate_mbps - 2.0).abs() < 1e-9);
        assert_eq!(snapshot.units_submitted, 11);
        assert_eq!(snapshot.units_dropped, 3);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(stats.snapshot(), snapshot);

        stats.reset_at(base + Duration::from_secs(1));
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        let after = stats.tick(base + Duration::from_secs(2), 0, 0);
        assert_eq!(after.latency_ms, 0.0);
        assert_eq!(after.fps, 0.0);
        assert_eq!(after.bitrate_mbps, 0.0);
    }
}
