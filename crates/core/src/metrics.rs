// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric snapshots produced by the storage monitor

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-cycle performance figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub read_latency_ms: f64,
    pub write_latency_ms: f64,
    pub ops_per_second: f64,
    /// Cumulative errors over the configured operation baseline, capped at 1.0
    pub error_rate: f64,
}

/// Record store counters accumulated since the previous sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStoreMetrics {
    pub reads: u64,
    pub writes: u64,
    pub read_time: Duration,
    pub write_time: Duration,
    pub size_bytes: u64,
    pub record_count: u64,
}

/// File store counters accumulated since the previous sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStoreMetrics {
    pub reads: u64,
    pub writes: u64,
    pub read_time: Duration,
    pub write_time: Duration,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub used_bytes: u64,
}

/// Sampling failures, carried forward across cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub counts: BTreeMap<ErrorKind, u64>,
}

impl ErrorMetrics {
    pub fn record(&mut self, kind: ErrorKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Composed snapshot published once per monitoring cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageMetrics {
    pub record_store: RecordStoreMetrics,
    pub file_store: FileStoreMetrics,
    pub errors: ErrorMetrics,
    pub performance: PerformanceMetrics,
    pub cycles: u64,
}

/// Throughput over an interval; 0 for an empty interval
pub fn calculate_operations_per_second(operations: u64, interval: Duration) -> f64 {
    let secs = interval.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    operations as f64 / secs
}

/// Approximate error rate against a fixed operation baseline
pub fn error_rate(errors: u64, baseline: u64) -> f64 {
    if baseline == 0 {
        return 0.0;
    }
    (errors as f64 / baseline as f64).min(1.0)
}

/// Mean latency in milliseconds; 0 when nothing was timed
pub fn mean_latency_ms(total: Duration, operations: u64) -> f64 {
    if operations == 0 {
        return 0.0;
    }
    total.as_secs_f64() * 1000.0 / operations as f64
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
