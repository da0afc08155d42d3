use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use preprocess::PreprocessError;

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    degraded_requests: AtomicUsize,

    // Failures by kind
    configuration_errors: AtomicUsize,
    extraction_errors: AtomicUsize,
    transport_errors: AtomicUsize,

    // Per-operation counts
    preprocess_calls: AtomicUsize,
    travel_info_calls: AtomicUsize,
    optimize_calls: AtomicUsize,

    // Timing (in microseconds)
    total_request_time_us: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Preprocess,
    TravelInfo,
    Optimize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            degraded_requests: AtomicUsize::new(0),
            configuration_errors: AtomicUsize::new(0),
            extraction_errors: AtomicUsize::new(0),
            transport_errors: AtomicUsize::new(0),
            preprocess_calls: AtomicUsize::new(0),
            travel_info_calls: AtomicUsize::new(0),
            optimize_calls: AtomicUsize::new(0),
            total_request_time_us: AtomicU64::new(0),
        })
    }

    /// Record one finished call of any operation. `degraded` marks calls that
    /// answered with a fallback instead of model output.
    pub fn record_request(&self, operation: Operation, degraded: bool, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        }

        let counter = match operation {
            Operation::Preprocess => &self.preprocess_calls,
            Operation::TravelInfo => &self.travel_info_calls,
            Operation::Optimize => &self.optimize_calls,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.total_request_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: &PreprocessError) {
        let counter = match error {
            PreprocessError::Configuration(_) => &self.configuration_errors,
            PreprocessError::Extraction { .. } => &self.extraction_errors,
            PreprocessError::Transport(_) => &self.transport_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let total_us = self.total_request_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            degraded_requests: self.degraded_requests.load(Ordering::Relaxed),
            configuration_errors: self.configuration_errors.load(Ordering::Relaxed),
            extraction_errors: self.extraction_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            preprocess_calls: self.preprocess_calls.load(Ordering::Relaxed),
            travel_info_calls: self.travel_info_calls.load(Ordering::Relaxed),
            optimize_calls: self.optimize_calls.load(Ordering::Relaxed),
            avg_request_time_ms: if total > 0 {
                total_us / total as f64 / 1000.0 // Convert to ms
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub degraded_requests: usize,
    pub configuration_errors: usize,
    pub extraction_errors: usize,
    pub transport_errors: usize,
    pub preprocess_calls: usize,
    pub travel_info_calls: usize,
    pub optimize_calls: usize,
    pub avg_request_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = Metrics::new();

        metrics.record_request(Operation::Preprocess, false, Duration::from_millis(10));
        metrics.record_request(Operation::Optimize, true, Duration::from_millis(30));
        metrics.record_error(&PreprocessError::Transport("reset".into()));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.degraded_requests, 1);
        assert_eq!(snapshot.transport_errors, 1);
        assert_eq!(snapshot.extraction_errors, 0);
        assert_eq!(snapshot.preprocess_calls, 1);
        assert_eq!(snapshot.optimize_calls, 1);
        assert!((snapshot.avg_request_time_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.avg_request_time_ms, 0.0);
    }
}
