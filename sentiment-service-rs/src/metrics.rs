//! Request metrics
//!
//! `MetricsCollector` keeps the aggregates served by `GET /metrics`: request
//! counters plus the running latency sum, min and max. Every record is also
//! forwarded to the `metrics` facade so an installed Prometheus recorder sees
//! the same traffic.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;

use crate::classifier::round_to;

#[derive(Debug, Default)]
struct Accumulator {
    total: u64,
    successful: u64,
    failed: u64,
    latency_sum_ms: f64,
    latency_min_ms: Option<f64>,
    latency_max_ms: f64,
}

/// Point-in-time view of the collector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percent of successful requests, 0 when nothing was recorded
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub uptime_seconds: f64,
}

#[derive(Debug)]
pub struct MetricsCollector {
    started: Instant,
    inner: Mutex<Accumulator>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            inner: Mutex::new(Accumulator::default()),
        }
    }

    // poisoning ignored: counters stay usable after a panicked writer
    fn lock(&self) -> MutexGuard<'_, Accumulator> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records one completed request
    pub fn record(&self, success: bool, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        {
            let mut acc = self.lock();
            acc.total += 1;
            if success {
                acc.successful += 1;
            } else {
                acc.failed += 1;
            }
            acc.latency_sum_ms += latency_ms;
            acc.latency_min_ms = Some(acc.latency_min_ms.map_or(latency_ms, |min| min.min(latency_ms)));
            acc.latency_max_ms = acc.latency_max_ms.max(latency_ms);
        }

        let outcome = if success { "success" } else { "failure" };
        counter!("sentiment_requests_total", 1, "outcome" => outcome);
        histogram!("sentiment_request_latency_seconds", latency.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let acc = self.lock();
        let (success_rate, average) = if acc.total == 0 {
            (0.0, 0.0)
        } else {
            (
                acc.successful as f64 / acc.total as f64 * 100.0,
                acc.latency_sum_ms / acc.total as f64,
            )
        };

        MetricsSnapshot {
            total_requests: acc.total,
            successful_requests: acc.successful,
            failed_requests: acc.failed,
            success_rate: round_to(success_rate, 2),
            average_latency_ms: round_to(average, 2),
            min_latency_ms: round_to(acc.latency_min_ms.unwrap_or(0.0), 2),
            max_latency_ms: round_to(acc.latency_max_ms, 2),
            uptime_seconds: round_to(self.started.elapsed().as_secs_f64(), 2),
        }
    }

    /// Zeroes counters and latency aggregates; uptime keeps running
    pub fn reset(&self) {
        *self.lock() = Accumulator::default();
        counter!("sentiment_metrics_resets_total", 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.min_latency_ms, 0.0);
        assert_eq!(snapshot.average_latency_ms, 0.0);
    }

    #[test]
    fn test_counts_and_latency_aggregates() {
        let metrics = MetricsCollector::new();
        metrics.record(true, Duration::from_millis(10));
        metrics.record(true, Duration::from_millis(30));
        metrics.record(false, Duration::from_millis(20));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.success_rate, 66.67);
        assert_eq!(snapshot.average_latency_ms, 20.0);
        assert_eq!(snapshot.min_latency_ms, 10.0);
        assert_eq!(snapshot.max_latency_ms, 30.0);
    }

    #[test]
    fn test_reset_keeps_uptime() {
        let metrics = MetricsCollector::new();
        metrics.record(true, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));

        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.max_latency_ms, 0.0);
        assert!(snapshot.uptime_seconds >= 0.02);
    }

    #[test]
    fn test_concurrent_records() {
        let metrics = std::sync::Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record(i % 2 == 0, Duration::from_micros(250));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 800);
        assert_eq!(snapshot.successful_requests, 400);
        assert_eq!(snapshot.failed_requests, 400);
    }
}
