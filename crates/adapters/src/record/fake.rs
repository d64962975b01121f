// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake record store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RecordPage, RecordStore, RecordStoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stow_core::{
    DeleteCriteria, IssueType, Record, RecordFilter, RecordKind, RecordStoreMetrics,
    RecordStoreStatus, StorageIssue,
};

/// Operation selector for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOp {
    Initialize,
    Close,
    Cleanup,
    Insert,
    Query,
    Delete,
    Repair,
    RebuildIndexes,
    Scan,
    Status,
    SampleMetrics,
}

/// Recorded record store call
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCall {
    Initialize,
    Close,
    Cleanup,
    Insert { kind: RecordKind, count: usize },
    Query { kind: RecordKind, offset: usize },
    Delete { kind: RecordKind },
    Repair,
    RebuildIndexes,
    Scan,
    Status,
    SampleMetrics,
}

impl RecordCall {
    pub fn op(&self) -> RecordOp {
        match self {
            RecordCall::Initialize => RecordOp::Initialize,
            RecordCall::Close => RecordOp::Close,
            RecordCall::Cleanup => RecordOp::Cleanup,
            RecordCall::Insert { .. } => RecordOp::Insert,
            RecordCall::Query { .. } => RecordOp::Query,
            RecordCall::Delete { .. } => RecordOp::Delete,
            RecordCall::Repair => RecordOp::Repair,
            RecordCall::RebuildIndexes => RecordOp::RebuildIndexes,
            RecordCall::Scan => RecordOp::Scan,
            RecordCall::Status => RecordOp::Status,
            RecordCall::SampleMetrics => RecordOp::SampleMetrics,
        }
    }
}

struct Failure {
    error: RecordStoreError,
    /// Remaining failures, `None` for every call
    remaining: Option<u32>,
}

#[derive(Default)]
struct FakeState {
    open: bool,
    records: BTreeMap<RecordKind, Vec<Record>>,
    calls: Vec<RecordCall>,
    failures: HashMap<RecordOp, Failure>,
    hangs: HashMap<RecordOp, Duration>,
    issues: Vec<StorageIssue>,
    cleanup_removes: u64,
    size_bytes: u64,
    reads: u64,
    writes: u64,
}

/// In-memory record store with call recording and failure injection
#[derive(Clone, Default)]
pub struct FakeRecordStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RecordCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls of one operation
    pub fn call_count(&self, op: RecordOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Fail every call of `op` until cleared
    pub fn fail_on(&self, op: RecordOp, error: RecordStoreError) {
        self.lock().failures.insert(
            op,
            Failure {
                error,
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls of `op`
    pub fn fail_times(&self, op: RecordOp, times: u32, error: RecordStoreError) {
        self.lock().failures.insert(
            op,
            Failure {
                error,
                remaining: Some(times),
            },
        );
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Delay every call of `op`, used to exercise call timeouts
    pub fn stall_on(&self, op: RecordOp, delay: Duration) {
        self.lock().hangs.insert(op, delay);
    }

    /// Issue reported by the next scans until repaired
    pub fn seed_issue(&self, issue: StorageIssue) {
        self.lock().issues.push(issue);
    }

    pub fn set_cleanup_removes(&self, count: u64) {
        self.lock().cleanup_removes = count;
    }

    pub fn set_size_bytes(&self, bytes: u64) {
        self.lock().size_bytes = bytes;
    }

    pub fn records(&self, kind: RecordKind) -> Vec<Record> {
        self.lock().records.get(&kind).cloned().unwrap_or_default()
    }

    /// Record the call and apply any injected stall or failure
    async fn enter(&self, call: RecordCall) -> Result<(), RecordStoreError> {
        let op = call.op();
        let stall = {
            let mut state = self.lock();
            state.calls.push(call);
            state.hangs.get(&op).copied()
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        let Some(failure) = state.failures.get_mut(&op) else {
            return Ok(());
        };
        let error = failure.error.clone();
        match failure.remaining {
            None => Err(error),
            Some(n) if n > 1 => {
                failure.remaining = Some(n - 1);
                Err(error)
            }
            Some(n) => {
                state.failures.remove(&op);
                if n == 1 {
                    Err(error)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn initialize(&self) -> Result<(), RecordStoreError> {
        self.enter(RecordCall::Initialize).await?;
        self.lock().open = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), RecordStoreError> {
        self.enter(RecordCall::Close).await?;
        self.lock().open = false;
        Ok(())
    }

    async fn cleanup(&self) -> Result<u64, RecordStoreError> {
        self.enter(RecordCall::Cleanup).await?;
        Ok(self.lock().cleanup_removes)
    }

    async fn insert(&self, kind: RecordKind, record: Record) -> Result<(), RecordStoreError> {
        self.enter(RecordCall::Insert { kind, count: 1 }).await?;
        let mut state = self.lock();
        state.writes += 1;
        state.records.entry(kind).or_default().push(record);
        Ok(())
    }

    async fn insert_batch(
        &self,
        kind: RecordKind,
        records: Vec<Record>,
    ) -> Result<u64, RecordStoreError> {
        self.enter(RecordCall::Insert {
            kind,
            count: records.len(),
        })
        .await?;
        let mut state = self.lock();
        let count = records.len() as u64;
        state.writes += count;
        state.records.entry(kind).or_default().extend(records);
        Ok(count)
    }

    async fn query_page(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
        offset: usize,
        page_size: usize,
    ) -> Result<RecordPage, RecordStoreError> {
        self.enter(RecordCall::Query { kind, offset }).await?;
        let mut state = self.lock();
        state.reads += 1;
        let matching: Vec<Record> = state
            .records
            .get(&kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let records: Vec<Record> = matching.iter().skip(offset).take(page_size).cloned().collect();
        let end = offset + records.len();
        Ok(RecordPage {
            next_offset: (end < matching.len()).then_some(end),
            records,
        })
    }

    async fn delete(
        &self,
        kind: RecordKind,
        criteria: &DeleteCriteria,
    ) -> Result<u64, RecordStoreError> {
        self.enter(RecordCall::Delete { kind }).await?;
        let mut state = self.lock();
        state.writes += 1;
        let Some(records) = state.records.get_mut(&kind) else {
            return Ok(0);
        };
        let before = records.len();
        records.retain(|r| !criteria.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn repair(&self) -> Result<u64, RecordStoreError> {
        self.enter(RecordCall::Repair).await?;
        let mut state = self.lock();
        let before = state.issues.len();
        state.issues.retain(|i| {
            !matches!(
                i.issue_type,
                IssueType::Corruption | IssueType::InvalidFormat
            )
        });
        Ok((before - state.issues.len()) as u64)
    }

    async fn rebuild_indexes(&self) -> Result<(), RecordStoreError> {
        self.enter(RecordCall::RebuildIndexes).await?;
        self.lock()
            .issues
            .retain(|i| i.issue_type != IssueType::Inconsistency);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<StorageIssue>, RecordStoreError> {
        self.enter(RecordCall::Scan).await?;
        Ok(self.lock().issues.clone())
    }

    async fn status(&self) -> Result<RecordStoreStatus, RecordStoreError> {
        self.enter(RecordCall::Status).await?;
        let state = self.lock();
        Ok(RecordStoreStatus {
            connected: state.open,
            size_bytes: state.size_bytes,
            record_counts: state
                .records
                .iter()
                .map(|(kind, records)| (*kind, records.len() as u64))
                .collect(),
            performance: None,
        })
    }

    async fn sample_metrics(&self) -> Result<RecordStoreMetrics, RecordStoreError> {
        self.enter(RecordCall::SampleMetrics).await?;
        let mut state = self.lock();
        let metrics = RecordStoreMetrics {
            reads: state.reads,
            writes: state.writes,
            size_bytes: state.size_bytes,
            record_count: state.records.values().map(|r| r.len() as u64).sum(),
            ..Default::default()
        };
        state.reads = 0;
        state.writes = 0;
        Ok(metrics)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
