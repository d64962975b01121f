// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrappers for consistent observability

use crate::file::{
    DirectoryChange, DirectoryClassified, FileInfo, FileStore, FileStoreError, ListFilter,
    WriteOptions,
};
use crate::record::{RecordPage, RecordStore, RecordStoreError};
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use stow_core::{
    DeleteCriteria, FileStoreMetrics, FileStoreStatus, Record, RecordFilter, RecordKind,
    RecordStoreMetrics, RecordStoreStatus, StorageIssue,
};
use tokio::sync::broadcast;
use tracing::Instrument;

/// Run `fut` inside `span`, logging completion with elapsed time
async fn timed<T, E, F>(span: tracing::Span, done: &'static str, fut: F) -> Result<T, E>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    async move {
        let start = std::time::Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(elapsed_ms, "{}", done),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "failed"),
        }
        result
    }
    .instrument(span)
    .await
}

/// Wrapper that adds tracing to any RecordStore
#[derive(Clone)]
pub struct TracedRecordStore<R> {
    inner: R,
}

impl<R> TracedRecordStore<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: RecordStore> RecordStore for TracedRecordStore<R> {
    async fn initialize(&self) -> Result<(), RecordStoreError> {
        let span = tracing::info_span!("records.initialize");
        timed(span, "record store open", self.inner.initialize()).await
    }

    async fn close(&self) -> Result<(), RecordStoreError> {
        let span = tracing::info_span!("records.close");
        timed(span, "record store closed", self.inner.close()).await
    }

    async fn cleanup(&self) -> Result<u64, RecordStoreError> {
        let span = tracing::info_span!("records.cleanup");
        let result = timed(span, "cleanup finished", self.inner.cleanup()).await;
        if let Ok(removed) = &result {
            tracing::info!(removed, "expired records dropped");
        }
        result
    }

    async fn insert(&self, kind: RecordKind, record: Record) -> Result<(), RecordStoreError> {
        let result = self.inner.insert(kind, record).await;
        if let Err(e) = &result {
            tracing::warn!(%kind, error = %e, "insert failed");
        }
        result
    }

    async fn insert_batch(
        &self,
        kind: RecordKind,
        records: Vec<Record>,
    ) -> Result<u64, RecordStoreError> {
        let span = tracing::debug_span!("records.insert_batch", %kind, count = records.len());
        self.inner
            .insert_batch(kind, records)
            .instrument(span)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "batch insert failed"))
    }

    async fn query_page(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
        offset: usize,
        page_size: usize,
    ) -> Result<RecordPage, RecordStoreError> {
        let result = self.inner.query_page(kind, filter, offset, page_size).await;
        tracing::trace!(
            %kind,
            offset,
            returned = result.as_ref().map(|p| p.records.len()).ok(),
            "queried page"
        );
        result
    }

    async fn delete(
        &self,
        kind: RecordKind,
        criteria: &DeleteCriteria,
    ) -> Result<u64, RecordStoreError> {
        let span = tracing::info_span!("records.delete", %kind, ids = criteria.ids.len());
        timed(span, "deleted", self.inner.delete(kind, criteria)).await
    }

    async fn repair(&self) -> Result<u64, RecordStoreError> {
        let span = tracing::info_span!("records.repair");
        timed(span, "repair finished", self.inner.repair()).await
    }

    async fn rebuild_indexes(&self) -> Result<(), RecordStoreError> {
        let span = tracing::info_span!("records.rebuild_indexes");
        timed(span, "indexes rebuilt", self.inner.rebuild_indexes()).await
    }

    async fn scan(&self) -> Result<Vec<StorageIssue>, RecordStoreError> {
        let span = tracing::info_span!("records.scan");
        let result = timed(span, "scan finished", self.inner.scan()).await;
        if let Ok(issues) = &result {
            tracing::debug!(issues = issues.len(), "record store scanned");
        }
        result
    }

    async fn status(&self) -> Result<RecordStoreStatus, RecordStoreError> {
        self.inner.status().await
    }

    async fn sample_metrics(&self) -> Result<RecordStoreMetrics, RecordStoreError> {
        let result = self.inner.sample_metrics().await;
        tracing::trace!(ok = result.is_ok(), "sampled record metrics");
        result
    }
}

/// Wrapper that adds tracing to any FileStore
#[derive(Clone)]
pub struct TracedFileStore<F> {
    inner: F,
}

impl<F> TracedFileStore<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: FileStore> FileStore for TracedFileStore<F> {
    async fn initialize(&self) -> Result<(), FileStoreError> {
        let span = tracing::info_span!("files.initialize");
        timed(span, "file store open", self.inner.initialize()).await
    }

    async fn close(&self) -> Result<(), FileStoreError> {
        let span = tracing::info_span!("files.close");
        timed(span, "file store closed", self.inner.close()).await
    }

    async fn write_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: WriteOptions,
    ) -> Result<FileInfo, FileStoreError> {
        let span = tracing::debug_span!(
            "files.write",
            path,
            len = bytes.len(),
            append = options.append
        );
        let result = self
            .inner
            .write_file(path, bytes, options)
            .instrument(span)
            .await;
        match &result {
            Ok(_) => tracing::debug!(path, "written"),
            Err(FileStoreError::Security(reason)) => {
                tracing::warn!(path, reason = %reason, "write rejected")
            }
            Err(e) => tracing::error!(path, error = %e, "write failed"),
        }
        result
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileStoreError> {
        let result = self.inner.read_file(path).await;
        tracing::trace!(path, len = result.as_ref().map(|b| b.len()).ok(), "read");
        result
    }

    async fn delete_file(&self, path: &str) -> Result<bool, FileStoreError> {
        let result = self.inner.delete_file(path).await;
        match &result {
            Ok(removed) => tracing::debug!(path, removed, "delete"),
            Err(e) => tracing::warn!(path, error = %e, "delete failed"),
        }
        result
    }

    async fn file_exists(&self, path: &str) -> Result<bool, FileStoreError> {
        self.inner.file_exists(path).await
    }

    async fn get_info(&self, path: &str) -> Result<FileInfo, FileStoreError> {
        self.inner.get_info(path).await
    }

    async fn list_directory(
        &self,
        path: &str,
        filter: &ListFilter,
    ) -> Result<Vec<FileInfo>, FileStoreError> {
        let result = self.inner.list_directory(path, filter).await;
        tracing::trace!(path, count = result.as_ref().map(|v| v.len()).ok(), "listed");
        result
    }

    async fn create_directory(&self, path: &str) -> Result<(), FileStoreError> {
        let span = tracing::info_span!("files.create_directory", path);
        timed(span, "directory ready", self.inner.create_directory(path)).await
    }

    async fn status(&self) -> Result<FileStoreStatus, FileStoreError> {
        self.inner.status().await
    }

    async fn sample_metrics(&self) -> Result<FileStoreMetrics, FileStoreError> {
        let result = self.inner.sample_metrics().await;
        tracing::trace!(ok = result.is_ok(), "sampled file metrics");
        result
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<DirectoryChange> {
        self.inner.subscribe_changes()
    }

    fn classified(&self) -> Option<&dyn DirectoryClassified> {
        self.inner.classified()
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
