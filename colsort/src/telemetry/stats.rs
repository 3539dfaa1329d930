//! Run statistics for the distributed column sort

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for one participant's work during a run
#[derive(Debug)]
pub struct RunStats {
    /// Rounds this participant passed the round barrier for
    pub rounds_completed: AtomicU64,

    /// Columns sorted locally
    pub columns_sorted: AtomicU64,

    /// Values sorted locally
    pub values_sorted: AtomicU64,

    /// Encoded bytes sent in distribute frames
    pub distribute_bytes: AtomicU64,

    /// Encoded bytes sent in collect frames
    pub collect_bytes: AtomicU64,

    /// Total time spent inside rounds in microseconds
    pub total_round_time_us: AtomicU64,

    /// Start time for elapsed tracking
    pub start_time: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            rounds_completed: AtomicU64::new(0),
            columns_sorted: AtomicU64::new(0),
            values_sorted: AtomicU64::new(0),
            distribute_bytes: AtomicU64::new(0),
            collect_bytes: AtomicU64::new(0),
            total_round_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished round
    pub fn record_round(&self, duration_us: u64) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
        self.total_round_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record a locally sorted block
    pub fn record_sort(&self, columns: usize, values: usize) {
        self.columns_sorted
            .fetch_add(columns as u64, Ordering::Relaxed);
        self.values_sorted.fetch_add(values as u64, Ordering::Relaxed);
    }

    pub fn record_distribute(&self, bytes: usize) {
        self.distribute_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_collect(&self, bytes: usize) {
        self.collect_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Average round latency in microseconds
    pub fn avg_round_time_us(&self) -> f64 {
        let rounds = self.rounds_completed.load(Ordering::Relaxed);
        if rounds == 0 {
            return 0.0;
        }
        self.total_round_time_us.load(Ordering::Relaxed) as f64 / rounds as f64
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Log a statistics summary
    pub fn print_summary(&self, rank: usize) {
        info!(
            rank = rank,
            rounds = self.rounds_completed.load(Ordering::Relaxed),
            columns_sorted = self.columns_sorted.load(Ordering::Relaxed),
            values_sorted = self.values_sorted.load(Ordering::Relaxed),
            distribute_bytes = self.distribute_bytes.load(Ordering::Relaxed),
            collect_bytes = self.collect_bytes.load(Ordering::Relaxed),
            avg_round_us = format!("{:.1}", self.avg_round_time_us()),
            elapsed_ms = self.elapsed_ms(),
            "Run statistics"
        );
    }

    /// Serialize to JSON for reporting
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "rounds_completed": self.rounds_completed.load(Ordering::Relaxed),
            "columns_sorted": self.columns_sorted.load(Ordering::Relaxed),
            "values_sorted": self.values_sorted.load(Ordering::Relaxed),
            "distribute_bytes": self.distribute_bytes.load(Ordering::Relaxed),
            "collect_bytes": self.collect_bytes.load(Ordering::Relaxed),
            "total_round_time_us": self.total_round_time_us.load(Ordering::Relaxed),
            "avg_round_time_us": self.avg_round_time_us(),
            "elapsed_ms": self.elapsed_ms(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = RunStats::new();
        assert_eq!(stats.rounds_completed.load(Ordering::Relaxed), 0);
        assert_eq!(stats.avg_round_time_us(), 0.0);
    }

    #[test]
    fn test_stats_rounds() {
        let stats = RunStats::new();
        stats.record_round(100);
        stats.record_round(300);
        assert_eq!(stats.rounds_completed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.avg_round_time_us(), 200.0);
    }

    #[test]
    fn test_stats_sort_and_bytes() {
        let stats = RunStats::new();
        stats.record_sort(4, 40);
        stats.record_sort(4, 40);
        stats.record_distribute(512);
        stats.record_collect(256);

        assert_eq!(stats.columns_sorted.load(Ordering::Relaxed), 8);
        assert_eq!(stats.values_sorted.load(Ordering::Relaxed), 80);
        assert_eq!(stats.distribute_bytes.load(Ordering::Relaxed), 512);
        assert_eq!(stats.collect_bytes.load(Ordering::Relaxed), 256);
    }

    #[test]
    fn test_stats_to_json() {
        let stats = RunStats::new();
        stats.record_sort(4, 16);
        let json = stats.to_json();
        assert_eq!(json["columns_sorted"], 4);
        assert_eq!(json["values_sorted"], 16);
    }
}
