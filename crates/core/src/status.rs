// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status snapshots composed on demand from the two stores

use crate::directory::DirectoryClass;
use crate::metrics::PerformanceMetrics;
use crate::record::RecordKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Byte usage of a store or of the whole subsystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub total_bytes: u64,
    pub usage_ratio: f64,
}

impl StorageUsage {
    /// Build a usage figure; the ratio is 0 when the total is unknown
    pub fn new(used_bytes: u64, available_bytes: u64, total_bytes: u64) -> Self {
        let usage_ratio = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64
        } else {
            0.0
        };
        Self {
            used_bytes,
            available_bytes,
            total_bytes,
            usage_ratio,
        }
    }

    /// Usage against a capacity, with availability derived from it
    pub fn of_capacity(used_bytes: u64, total_bytes: u64) -> Self {
        Self::bounded(used_bytes, total_bytes.saturating_sub(used_bytes), total_bytes)
    }

    /// Usage whose total is widened to cover used plus available bytes.
    ///
    /// A store over its capacity reports a total equal to its usage, so the
    /// ratio never exceeds 1.
    pub fn bounded(used_bytes: u64, available_bytes: u64, capacity: u64) -> Self {
        let total_bytes = capacity.max(used_bytes.saturating_add(available_bytes));
        Self::new(used_bytes, available_bytes, total_bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStoreStatus {
    pub connected: bool,
    pub size_bytes: u64,
    pub record_counts: BTreeMap<RecordKind, u64>,
    /// Latest monitor sample, absent until the first cycle completes
    pub performance: Option<PerformanceMetrics>,
}

impl RecordStoreStatus {
    pub fn total_records(&self) -> u64 {
        self.record_counts.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStoreStatus {
    pub root: String,
    pub usage: StorageUsage,
    pub file_count: u64,
    pub missing_directories: Vec<DirectoryClass>,
}

/// Snapshot of the whole subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStatus {
    pub record_store: RecordStoreStatus,
    pub file_store: FileStoreStatus,
    pub total_usage: StorageUsage,
    pub last_maintenance: Option<DateTime<Utc>>,
}

impl StorageStatus {
    /// Combine store statuses, folding record-store bytes into used bytes
    /// against the file store's capacity (widened when over it)
    pub fn compose(
        record_store: RecordStoreStatus,
        file_store: FileStoreStatus,
        last_maintenance: Option<DateTime<Utc>>,
    ) -> Self {
        let total = file_store.usage.total_bytes;
        let used = file_store
            .usage
            .used_bytes
            .saturating_add(record_store.size_bytes);
        let available = file_store
            .usage
            .available_bytes
            .saturating_sub(record_store.size_bytes);
        Self {
            total_usage: StorageUsage::bounded(used, available, total),
            record_store,
            file_store,
            last_maintenance,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
