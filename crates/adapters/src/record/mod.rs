// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured record store adapters

mod cursor;

pub use cursor::{RecordCursor, SubStore, DEFAULT_PAGE_SIZE};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRecordStore, RecordCall, RecordOp};

use async_trait::async_trait;
use stow_core::{
    DeleteCriteria, Record, RecordFilter, RecordKind, RecordStoreMetrics, RecordStoreStatus,
    StorageError, StorageIssue,
};
use thiserror::Error;

/// Errors from record store operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordStoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("record store is not open")]
    Closed,
}

impl From<RecordStoreError> for StorageError {
    fn from(e: RecordStoreError) -> Self {
        match e {
            RecordStoreError::Connection(msg) => StorageError::Connection(msg),
            RecordStoreError::Closed => {
                StorageError::Connection("record store is not open".to_string())
            }
            RecordStoreError::Query(msg) => StorageError::Query(msg),
            RecordStoreError::Storage(msg) => StorageError::RecordStorage(msg),
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Offset of the next page, `None` when exhausted
    pub next_offset: Option<usize>,
}

/// Adapter for the structured record store
///
/// Sub-store operations take the [`RecordKind`] they act on; callers
/// normally reach them through [`RecordStore::sub_store`].
#[async_trait]
pub trait RecordStore: Clone + Send + Sync + 'static {
    async fn initialize(&self) -> Result<(), RecordStoreError>;

    async fn close(&self) -> Result<(), RecordStoreError>;

    /// Drop records past retention, returning how many were removed
    async fn cleanup(&self) -> Result<u64, RecordStoreError>;

    async fn insert(&self, kind: RecordKind, record: Record) -> Result<(), RecordStoreError>;

    async fn insert_batch(
        &self,
        kind: RecordKind,
        records: Vec<Record>,
    ) -> Result<u64, RecordStoreError>;

    /// Fetch matching records starting at `offset`, at most `page_size` of them
    async fn query_page(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
        offset: usize,
        page_size: usize,
    ) -> Result<RecordPage, RecordStoreError>;

    async fn delete(
        &self,
        kind: RecordKind,
        criteria: &DeleteCriteria,
    ) -> Result<u64, RecordStoreError>;

    /// Compact storage, dropping unreadable entries; returns entries dropped
    async fn repair(&self) -> Result<u64, RecordStoreError>;

    async fn rebuild_indexes(&self) -> Result<(), RecordStoreError>;

    /// Read-only integrity scan
    async fn scan(&self) -> Result<Vec<StorageIssue>, RecordStoreError>;

    async fn status(&self) -> Result<RecordStoreStatus, RecordStoreError>;

    /// Counters accumulated since the previous sample
    async fn sample_metrics(&self) -> Result<RecordStoreMetrics, RecordStoreError>;

    fn sub_store(&self, kind: RecordKind) -> SubStore<Self> {
        SubStore::new(self.clone(), kind)
    }
}
