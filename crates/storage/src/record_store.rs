// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record store backed by checksummed JSON-lines files
//!
//! Blocking file I/O runs on the blocking pool. Each sub-store has its own
//! lock so unrelated kinds never wait on each other.

use crate::segment::{self, Line, SegmentEntry};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stow_adapters::{RecordPage, RecordStore, RecordStoreError};
use stow_core::{
    Clock, DeleteCriteria, IssueSeverity, IssueType, Record, RecordFilter, RecordKind,
    RecordStoreMetrics, RecordStoreStatus, StorageIssue, SystemClock,
};

fn io_err(e: std::io::Error) -> RecordStoreError {
    RecordStoreError::Storage(e.to_string())
}

#[derive(Default)]
struct Counters {
    reads: u64,
    writes: u64,
    read_time: Duration,
    write_time: Duration,
}

struct Inner<C> {
    dir: PathBuf,
    retention: Duration,
    clock: C,
    open: AtomicBool,
    locks: BTreeMap<RecordKind, Mutex<()>>,
    /// Valid record count per kind, maintained on every write
    index: Mutex<BTreeMap<RecordKind, u64>>,
    counters: Mutex<Counters>,
}

impl<C: Clock> Inner<C> {
    fn segment(&self, kind: RecordKind) -> PathBuf {
        self.dir.join(format!("{}.jsonl", kind))
    }

    /// Run `f` holding the kind's lock
    fn with_segment<T>(
        &self,
        kind: RecordKind,
        f: impl FnOnce(&Path) -> Result<T, RecordStoreError>,
    ) -> Result<T, RecordStoreError> {
        let _guard = self
            .locks
            .get(&kind)
            .map(|lock| lock.lock().unwrap_or_else(|e| e.into_inner()));
        f(&self.segment(kind))
    }

    fn ensure_open(&self) -> Result<(), RecordStoreError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RecordStoreError::Closed)
        }
    }

    fn adjust_index(&self, kind: RecordKind, f: impl FnOnce(u64) -> u64) {
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        let count = index.entry(kind).or_insert(0);
        *count = f(*count);
    }

    fn set_index(&self, kind: RecordKind, count: u64) {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, count);
    }

    fn indexed(&self, kind: RecordKind) -> u64 {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    fn count_read(&self, started: std::time::Instant) {
        let elapsed = self.clock.now().saturating_duration_since(started);
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.reads += 1;
        counters.read_time += elapsed;
    }

    fn count_write(&self, started: std::time::Instant) {
        let elapsed = self.clock.now().saturating_duration_since(started);
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.writes += 1;
        counters.write_time += elapsed;
    }

    fn remove_matching(
        &self,
        kind: RecordKind,
        criteria: &DeleteCriteria,
    ) -> Result<u64, RecordStoreError> {
        let removed = self.with_segment(kind, |path| {
            let lines = segment::read_lines(path).map_err(io_err)?;
            let keep: Vec<&Line> = lines
                .iter()
                .filter(|l| !l.record().is_some_and(|r| criteria.matches(r)))
                .collect();
            let removed = (lines.len() - keep.len()) as u64;
            if removed > 0 {
                segment::rewrite(path, keep.iter().map(|l| l.raw())).map_err(io_err)?;
            }
            Ok(removed)
        })?;
        self.adjust_index(kind, |count| count.saturating_sub(removed));
        Ok(removed)
    }

    fn valid_count(&self, kind: RecordKind) -> Result<u64, RecordStoreError> {
        self.with_segment(kind, |path| {
            let lines = segment::read_lines(path).map_err(io_err)?;
            Ok(lines.iter().filter(|l| l.record().is_some()).count() as u64)
        })
    }
}

/// JSON-lines record store rooted at a directory
#[derive(Clone)]
pub struct JsonRecordStore<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl JsonRecordStore<SystemClock> {
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self::with_clock(dir, retention, SystemClock)
    }
}

impl<C: Clock> JsonRecordStore<C> {
    pub fn with_clock(dir: impl Into<PathBuf>, retention: Duration, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                dir: dir.into(),
                retention,
                clock,
                open: AtomicBool::new(false),
                locks: RecordKind::ALL.into_iter().map(|k| (k, Mutex::new(()))).collect(),
                index: Mutex::new(BTreeMap::new()),
                counters: Mutex::new(Counters::default()),
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn segment_path(&self, kind: RecordKind) -> PathBuf {
        self.inner.segment(kind)
    }

    /// Run blocking work against the store on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T, RecordStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner<C>) -> Result<T, RecordStoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| RecordStoreError::Storage(format!("blocking task failed: {}", e)))?
    }

    /// Like [`Self::blocking`] but rejects calls on a closed store
    async fn open_blocking<T, F>(&self, f: F) -> Result<T, RecordStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner<C>) -> Result<T, RecordStoreError> + Send + 'static,
    {
        self.inner.ensure_open()?;
        self.blocking(f).await
    }
}

#[async_trait]
impl<C: Clock> RecordStore for JsonRecordStore<C> {
    async fn initialize(&self) -> Result<(), RecordStoreError> {
        if self.inner.open.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.blocking(|inner| {
            std::fs::create_dir_all(&inner.dir)
                .map_err(|e| RecordStoreError::Connection(e.to_string()))?;
            for kind in RecordKind::ALL {
                let count = inner.valid_count(kind)?;
                inner.set_index(kind, count);
            }
            Ok(())
        })
        .await?;
        self.inner.open.store(true, Ordering::SeqCst);
        tracing::debug!(dir = %self.inner.dir.display(), "record segments loaded");
        Ok(())
    }

    async fn close(&self) -> Result<(), RecordStoreError> {
        self.inner.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup(&self) -> Result<u64, RecordStoreError> {
        // A retention reaching past the earliest representable time expires nothing
        let now = self.inner.clock.utc_now();
        let cutoff = chrono::Duration::from_std(self.inner.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention));
        self.open_blocking(move |inner| {
            let Some(cutoff) = cutoff else {
                return Ok(0);
            };
            let criteria = DeleteCriteria::older_than(cutoff);
            let mut removed = 0;
            for kind in RecordKind::ALL {
                removed += inner.remove_matching(kind, &criteria)?;
            }
            Ok(removed)
        })
        .await
    }

    async fn insert(&self, kind: RecordKind, record: Record) -> Result<(), RecordStoreError> {
        self.insert_batch(kind, vec![record]).await.map(|_| ())
    }

    async fn insert_batch(
        &self,
        kind: RecordKind,
        records: Vec<Record>,
    ) -> Result<u64, RecordStoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.open_blocking(move |inner| {
            let started = inner.clock.now();
            let entries = records
                .into_iter()
                .map(SegmentEntry::new)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RecordStoreError::Query(format!("unserializable record: {}", e)))?;
            let count = entries.len() as u64;
            inner.with_segment(kind, |path| segment::append(path, &entries).map_err(io_err))?;
            inner.adjust_index(kind, |n| n + count);
            inner.count_write(started);
            Ok(count)
        })
        .await
    }

    async fn query_page(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
        offset: usize,
        page_size: usize,
    ) -> Result<RecordPage, RecordStoreError> {
        let filter = filter.clone();
        self.open_blocking(move |inner| {
            let started = inner.clock.now();
            let lines = inner.with_segment(kind, |path| segment::read_lines(path).map_err(io_err))?;
            let mut matching = lines
                .into_iter()
                .filter_map(|l| match l {
                    Line::Valid { record, .. } => Some(record),
                    _ => None,
                })
                .filter(|r| filter.matches(r))
                .skip(offset);

            let records: Vec<Record> = matching.by_ref().take(page_size).collect();
            let more = matching.next().is_some();
            inner.count_read(started);
            Ok(RecordPage {
                next_offset: more.then_some(offset + records.len()),
                records,
            })
        })
        .await
    }

    async fn delete(
        &self,
        kind: RecordKind,
        criteria: &DeleteCriteria,
    ) -> Result<u64, RecordStoreError> {
        let criteria = criteria.clone();
        self.open_blocking(move |inner| {
            let started = inner.clock.now();
            let removed = inner.remove_matching(kind, &criteria)?;
            inner.count_write(started);
            Ok(removed)
        })
        .await
    }

    async fn repair(&self) -> Result<u64, RecordStoreError> {
        self.open_blocking(|inner| {
            let mut dropped = 0;
            for kind in RecordKind::ALL {
                let valid = inner.with_segment(kind, |path| {
                    let lines = segment::read_lines(path).map_err(io_err)?;
                    let valid: Vec<&str> = lines
                        .iter()
                        .filter(|l| l.record().is_some())
                        .map(Line::raw)
                        .collect();
                    let bad = (lines.len() - valid.len()) as u64;
                    if bad > 0 {
                        segment::rewrite(path, valid.iter().copied()).map_err(io_err)?;
                        tracing::warn!(%kind, dropped = bad, "dropped unreadable record lines");
                        dropped += bad;
                    }
                    Ok(valid.len() as u64)
                })?;
                inner.set_index(kind, valid);
            }
            Ok(dropped)
        })
        .await
    }

    async fn rebuild_indexes(&self) -> Result<(), RecordStoreError> {
        self.open_blocking(|inner| {
            for kind in RecordKind::ALL {
                let count = inner.valid_count(kind)?;
                inner.set_index(kind, count);
            }
            Ok(())
        })
        .await
    }

    async fn scan(&self) -> Result<Vec<StorageIssue>, RecordStoreError> {
        self.open_blocking(|inner| {
            let mut issues = Vec::new();
            for kind in RecordKind::ALL {
                let location = format!("recordstore/{}", kind);
                let lines =
                    inner.with_segment(kind, |path| segment::read_lines(path).map_err(io_err))?;
                // Corrupt lines are still indexed records; they are reported once
                let mut recorded = 0u64;
                for line in &lines {
                    match line {
                        Line::Valid { .. } => recorded += 1,
                        Line::Corrupt { number, .. } => {
                            recorded += 1;
                            issues.push(StorageIssue::new(
                                IssueType::Corruption,
                                location.clone(),
                                format!("line {} failed checksum verification", number),
                                IssueSeverity::High,
                            ))
                        }
                        Line::Malformed { number, reason, .. } => {
                            issues.push(StorageIssue::new(
                                IssueType::InvalidFormat,
                                location.clone(),
                                format!("line {} is not a record entry: {}", number, reason),
                                IssueSeverity::Medium,
                            ))
                        }
                    }
                }
                let indexed = inner.indexed(kind);
                if indexed != recorded {
                    issues.push(StorageIssue::new(
                        IssueType::Inconsistency,
                        location,
                        format!("index holds {} records, segment holds {}", indexed, recorded),
                        IssueSeverity::Medium,
                    ));
                }
            }
            Ok(issues)
        })
        .await
    }

    async fn status(&self) -> Result<RecordStoreStatus, RecordStoreError> {
        let connected = self.inner.open.load(Ordering::SeqCst);
        let record_counts = self
            .inner
            .index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let size_bytes = self
            .blocking(|inner| {
                Ok(RecordKind::ALL
                    .into_iter()
                    .filter_map(|k| std::fs::metadata(inner.segment(k)).ok())
                    .map(|m| m.len())
                    .sum())
            })
            .await?;
        Ok(RecordStoreStatus {
            connected,
            size_bytes,
            record_counts,
            performance: None,
        })
    }

    async fn sample_metrics(&self) -> Result<RecordStoreMetrics, RecordStoreError> {
        self.inner.ensure_open()?;
        let status = self.status().await?;
        let counters = {
            let mut counters = self.inner.counters.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *counters)
        };
        Ok(RecordStoreMetrics {
            reads: counters.reads,
            writes: counters.writes,
            read_time: counters.read_time,
            write_time: counters.write_time,
            size_bytes: status.size_bytes,
            record_count: status.total_records(),
        })
    }
}

#[cfg(test)]
#[path = "record_store_tests.rs"]
mod tests;
