use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding window of durations with percentile queries
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: Arc<Mutex<VecDeque<Duration>>>,
    window_size: usize,
}

impl LatencyTracker {
    /// Create a tracker that keeps the most recent `window_size` samples
    pub fn new(window_size: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(window_size))),
            window_size,
        }
    }

    /// Record one duration, evicting the oldest when the window is full
    pub fn record(&self, sample: Duration) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.window_size {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Median in milliseconds
    pub fn p50_ms(&self) -> f64 {
        self.percentile_ms(0.50)
    }

    /// 99th percentile in milliseconds
    pub fn p99_ms(&self) -> f64 {
        self.percentile_ms(0.99)
    }

    /// Smallest and largest recorded sample
    pub fn bounds(&self) -> Option<(Duration, Duration)> {
        let samples = self.samples.lock();
        let min = samples.iter().min()?;
        let max = samples.iter().max()?;
        Some((*min, *max))
    }

    fn percentile_ms(&self, p: f64) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<_> = samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
        sorted[idx].as_micros() as f64 / 1000.0
    }

    /// Number of samples currently in the window
    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }
}

/// Per-stage counters shared by every sample's thread for that stage
#[derive(Debug, Clone)]
pub struct StageMetrics {
    name: String,
    completed: Arc<AtomicU64>,
    faulted: Arc<AtomicU64>,
    latency: LatencyTracker,
}

impl StageMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: Arc::new(AtomicU64::new(0)),
            faulted: Arc::new(AtomicU64::new(0)),
            latency: LatencyTracker::new(1000),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a successful run and how long the stage's own work took
    pub fn record_completed(&self, took: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.latency.record(took);
    }

    pub fn record_fault(&self) {
        self.faulted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total_faulted(&self) -> u64 {
        self.faulted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            name: self.name.clone(),
            completed: self.total_completed(),
            faulted: self.total_faulted(),
            p50_ms: self.latency.p50_ms(),
            p99_ms: self.latency.p99_ms(),
        }
    }
}

/// Order barrier counters: emissions, time spent waiting for a turn, and the
/// spacing between consecutive emissions
#[derive(Debug, Clone)]
pub struct BarrierMetrics {
    emitted: Arc<AtomicU64>,
    turn_wait: LatencyTracker,
    intervals: LatencyTracker,
    last_emit: Arc<Mutex<Option<Instant>>>,
}

impl BarrierMetrics {
    pub fn new() -> Self {
        Self {
            emitted: Arc::new(AtomicU64::new(0)),
            turn_wait: LatencyTracker::new(1000),
            intervals: LatencyTracker::new(1000),
            last_emit: Arc::new(Mutex::new(None)),
        }
    }

    /// Record one emission at `at`, after having waited `waited` for the turn
    pub fn record_emit(&self, at: Instant, waited: Duration) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        self.turn_wait.record(waited);

        let mut last = self.last_emit.lock();
        if let Some(prev) = *last {
            self.intervals.record(at.saturating_duration_since(prev));
        }
        *last = Some(at);
    }

    pub fn total_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Spacing between consecutive emissions
    pub fn intervals(&self) -> &LatencyTracker {
        &self.intervals
    }

    /// Time each barrier spent polling for its turn
    pub fn turn_wait(&self) -> &LatencyTracker {
        &self.turn_wait
    }
}

impl Default for BarrierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for a whole pipeline: one entry per stage plus the barrier
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub stages: Vec<StageMetrics>,
    pub barrier: BarrierMetrics,
}

impl PipelineMetrics {
    pub fn new<'a>(stage_names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            stages: stage_names.into_iter().map(StageMetrics::new).collect(),
            barrier: BarrierMetrics::new(),
        }
    }

    /// Human-readable summary of every stage and the barrier
    pub fn summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (i, stage) in self.stages.iter().enumerate() {
            summary.push_str(&format!("  Stage {}: {}\n", i, stage.snapshot().format()));
        }
        summary.push_str(&format!(
            "  Barrier: Emitted: {}, Interval P50: {:.2}ms, P99: {:.2}ms, Turn wait P50: {:.2}ms\n",
            self.barrier.total_emitted(),
            self.barrier.intervals.p50_ms(),
            self.barrier.intervals.p99_ms(),
            self.barrier.turn_wait.p50_ms(),
        ));
        summary
    }
}

/// A snapshot of one stage's metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub name: String,
    pub completed: u64,
    pub faulted: u64,
    pub p50_ms: f64,
    pub p99_ms: f64,
}

impl MetricsSnapshot {
    pub fn format(&self) -> String {
        format!(
            "{} Completed: {}, Faulted: {}, Latency P50: {:.2}ms, P99: {:.2}ms",
            self.name, self.completed, self.faulted, self.p50_ms, self.p99_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_tracker_percentiles() {
        let tracker = LatencyTracker::new(10);
        for i in 1..=10 {
            tracker.record(Duration::from_millis(i));
        }
        assert_eq!(tracker.p50_ms(), 5.0);
        assert_eq!(tracker.p99_ms(), 10.0);
        assert_eq!(
            tracker.bounds(),
            Some((Duration::from_millis(1), Duration::from_millis(10)))
        );
    }

    #[test]
    fn test_latency_tracker_window_evicts_oldest() {
        let tracker = LatencyTracker::new(3);
        for i in 1..=5 {
            tracker.record(Duration::from_millis(i));
        }
        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.bounds().unwrap().0, Duration::from_millis(3));
    }

    #[test]
    fn test_stage_metrics() {
        let metrics = StageMetrics::new("stageA");
        metrics.record_completed(Duration::from_millis(4));
        metrics.record_completed(Duration::from_millis(6));
        metrics.record_fault();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.faulted, 1);
        assert!(snapshot.format().starts_with("stageA"));
    }

    #[test]
    fn test_barrier_intervals() {
        let metrics = BarrierMetrics::new();
        let t0 = Instant::now();
        metrics.record_emit(t0, Duration::ZERO);
        metrics.record_emit(t0 + Duration::from_millis(10), Duration::ZERO);
        metrics.record_emit(t0 + Duration::from_millis(20), Duration::ZERO);

        assert_eq!(metrics.total_emitted(), 3);
        assert_eq!(metrics.intervals().count(), 2);
        assert_eq!(metrics.intervals().p50_ms(), 10.0);
    }
}
