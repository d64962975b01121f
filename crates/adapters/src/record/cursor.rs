// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed sub-store handles and lazy query cursors

use super::{RecordStore, RecordStoreError};
use stow_core::{DeleteCriteria, Record, RecordFilter, RecordKind};

pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Handle to one typed sub-store
#[derive(Clone)]
pub struct SubStore<R> {
    store: R,
    kind: RecordKind,
}

impl<R: RecordStore> SubStore<R> {
    pub fn new(store: R, kind: RecordKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub async fn insert(&self, record: Record) -> Result<(), RecordStoreError> {
        self.store.insert(self.kind, record).await
    }

    pub async fn insert_batch(&self, records: Vec<Record>) -> Result<u64, RecordStoreError> {
        self.store.insert_batch(self.kind, records).await
    }

    /// Lazy query; nothing is read until the first page is requested
    pub fn query(&self, filter: RecordFilter) -> RecordCursor<R> {
        RecordCursor::new(self.store.clone(), self.kind, filter)
    }

    pub async fn delete(&self, criteria: &DeleteCriteria) -> Result<u64, RecordStoreError> {
        self.store.delete(self.kind, criteria).await
    }
}

/// Pages through a query one backend call at a time
pub struct RecordCursor<R> {
    store: R,
    kind: RecordKind,
    filter: RecordFilter,
    page_size: usize,
    offset: Option<usize>,
    yielded: usize,
}

impl<R: RecordStore> RecordCursor<R> {
    fn new(store: R, kind: RecordKind, filter: RecordFilter) -> Self {
        Self {
            store,
            kind,
            filter,
            page_size: DEFAULT_PAGE_SIZE,
            offset: Some(0),
            yielded: 0,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetch the next page, `None` once the query is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>, RecordStoreError> {
        let Some(offset) = self.offset else {
            return Ok(None);
        };
        let remaining = match self.filter.limit {
            Some(limit) => limit.saturating_sub(self.yielded),
            None => usize::MAX,
        };
        if remaining == 0 {
            self.offset = None;
            return Ok(None);
        }

        let size = self.page_size.min(remaining);
        let page = self
            .store
            .query_page(self.kind, &self.filter, offset, size)
            .await?;

        let mut records = page.records;
        records.truncate(remaining);
        self.yielded += records.len();
        self.offset = page.next_offset;

        if records.is_empty() {
            self.offset = None;
            return Ok(None);
        }
        Ok(Some(records))
    }

    /// Drain every remaining page
    pub async fn collect_all(mut self) -> Result<Vec<Record>, RecordStoreError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}
