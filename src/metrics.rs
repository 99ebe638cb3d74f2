//! Prediction counters and latency statistics.

use crate::types::outcome::{Label, PredictionContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all request handlers
pub struct PredictionMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Requests that ended in an error
    pub failures: AtomicU64,
    /// Columns zero-filled during alignment, summed over requests
    pub filled_columns: AtomicU64,
    /// Labels served per context
    outcomes: RwLock<HashMap<(PredictionContext, Label), u64>>,
    /// Failures per error kind
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            filled_columns: AtomicU64::new(0),
            outcomes: RwLock::new(HashMap::new()),
            failures_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, context: PredictionContext, label: Label, elapsed: Duration) {
        self.predictions.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut outcomes) = self.outcomes.write() {
            *outcomes.entry((context, label)).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(elapsed.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &'static str) {
        self.failures.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn record_filled_columns(&self, count: usize) {
        self.filled_columns.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn outcome_count(&self, context: PredictionContext, label: Label) -> u64 {
        self.outcomes
            .read()
            .map(|outcomes| outcomes.get(&(context, label)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions: self.predictions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            filled_columns: self.filled_columns.load(Ordering::Relaxed),
            failures_by_kind: self
                .failures_by_kind
                .read()
                .map(|by_kind| by_kind.clone())
                .unwrap_or_default(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let processing = self.get_processing_stats();

        info!(
            predictions = snapshot.predictions,
            failures = snapshot.failures,
            filled_columns = snapshot.filled_columns,
            throughput = format!("{:.1} req/s", self.get_throughput()),
            "Prediction metrics summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );
        for context in PredictionContext::ALL {
            info!(
                context = %context,
                positive = self.outcome_count(context, Label::Positive),
                negative = self.outcome_count(context, Label::Negative),
                "Outcomes"
            );
        }
        for (kind, count) in &snapshot.failures_by_kind {
            info!(kind = %kind, count = count, "Failures");
        }
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub predictions: u64,
    pub failures: u64,
    pub filled_columns: u64,
    pub failures_by_kind: HashMap<&'static str, u64>,
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics summary for server mode
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
