// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake file store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    ChangeKind, DirectoryChange, DirectoryClassified, FileInfo, FileStore, FileStoreError,
    ListFilter, StandardLayout, WriteOptions,
};
use crate::path::{validate_dir_path, validate_path};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stow_core::{DirectoryClass, FileStoreMetrics, FileStoreStatus, StorageUsage};
use tokio::sync::broadcast;

/// Operation selector for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOp {
    Initialize,
    Close,
    Write,
    Read,
    Delete,
    Exists,
    Info,
    List,
    CreateDirectory,
    Status,
    SampleMetrics,
}

/// Recorded file store call
#[derive(Debug, Clone, PartialEq)]
pub enum FileCall {
    Initialize,
    Close,
    Write { path: String, len: usize },
    Read { path: String },
    Delete { path: String },
    Exists { path: String },
    Info { path: String },
    List { path: String },
    CreateDirectory { path: String },
    Status,
    SampleMetrics,
}

impl FileCall {
    pub fn op(&self) -> FileOp {
        match self {
            FileCall::Initialize => FileOp::Initialize,
            FileCall::Close => FileOp::Close,
            FileCall::Write { .. } => FileOp::Write,
            FileCall::Read { .. } => FileOp::Read,
            FileCall::Delete { .. } => FileOp::Delete,
            FileCall::Exists { .. } => FileOp::Exists,
            FileCall::Info { .. } => FileOp::Info,
            FileCall::List { .. } => FileOp::List,
            FileCall::CreateDirectory { .. } => FileOp::CreateDirectory,
            FileCall::Status => FileOp::Status,
            FileCall::SampleMetrics => FileOp::SampleMetrics,
        }
    }
}

#[derive(Debug, Clone)]
struct FakeFile {
    bytes: Vec<u8>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

struct FakeState {
    files: BTreeMap<String, FakeFile>,
    dirs: BTreeSet<String>,
    calls: Vec<FileCall>,
    failures: HashMap<FileOp, FileStoreError>,
    stalls: HashMap<FileOp, Duration>,
    quota: u64,
    metrics: FileStoreMetrics,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            dirs: BTreeSet::from([String::new()]),
            calls: Vec::new(),
            failures: HashMap::new(),
            stalls: HashMap::new(),
            quota: 1024 * 1024,
            metrics: FileStoreMetrics::default(),
        }
    }
}

/// In-memory file store with call recording and failure injection
///
/// Classification follows [`StandardLayout`] and can be switched off to
/// exercise stores without the capability.
#[derive(Clone)]
pub struct FakeFileStore {
    state: Arc<Mutex<FakeState>>,
    classify: Arc<AtomicBool>,
    layout: StandardLayout,
    changes: broadcast::Sender<DirectoryChange>,
}

impl Default for FakeFileStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            state: Arc::default(),
            classify: Arc::new(AtomicBool::new(true)),
            layout: StandardLayout,
            changes,
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

impl FakeFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with every classified directory already present
    pub fn with_standard_layout() -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            for class in DirectoryClass::ALL {
                insert_dir_with_parents(&mut state.dirs, class.default_path());
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<FileCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: FileOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn fail_on(&self, op: FileOp, error: FileStoreError) {
        self.lock().failures.insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn stall_on(&self, op: FileOp, delay: Duration) {
        self.lock().stalls.insert(op, delay);
    }

    pub fn set_classified(&self, enabled: bool) {
        self.classify.store(enabled, Ordering::SeqCst);
    }

    pub fn set_quota(&self, bytes: u64) {
        self.lock().quota = bytes;
    }

    /// Seed a file with an explicit modification time, creating parents
    pub fn add_file_at(&self, path: &str, bytes: &[u8], modified_at: DateTime<Utc>) {
        let mut state = self.lock();
        insert_dir_with_parents(&mut state.dirs, parent_of(path));
        state.files.insert(
            path.to_string(),
            FakeFile {
                bytes: bytes.to_vec(),
                created_at: modified_at,
                modified_at,
            },
        );
    }

    /// Drop a directory and everything beneath it
    pub fn remove_directory(&self, path: &str) {
        let mut state = self.lock();
        let prefix = format!("{}/", path);
        state.dirs.retain(|d| d != path && !d.starts_with(&prefix));
        state.files.retain(|f, _| !f.starts_with(&prefix));
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.lock().dirs.contains(path)
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.lock().files.contains_key(path)
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    async fn enter(&self, call: FileCall) -> Result<(), FileStoreError> {
        let op = call.op();
        let stall = {
            let mut state = self.lock();
            state.calls.push(call);
            state.stalls.get(&op).copied()
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        match self.lock().failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn publish(&self, path: &str, kind: ChangeKind) {
        // No receivers is fine
        let _ = self.changes.send(DirectoryChange {
            path: path.to_string(),
            kind,
        });
    }

    fn dir_info(path: &str) -> FileInfo {
        FileInfo {
            name: name_of(path).to_string(),
            path: path.to_string(),
            size: 0,
            created_at: None,
            modified_at: DateTime::<Utc>::default(),
            is_directory: true,
            attributes: BTreeMap::new(),
        }
    }

    fn file_info(path: &str, file: &FakeFile) -> FileInfo {
        FileInfo {
            name: name_of(path).to_string(),
            path: path.to_string(),
            size: file.bytes.len() as u64,
            created_at: Some(file.created_at),
            modified_at: file.modified_at,
            is_directory: false,
            attributes: BTreeMap::new(),
        }
    }
}

fn insert_dir_with_parents(dirs: &mut BTreeSet<String>, path: &str) {
    let mut current = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        dirs.insert(current.clone());
    }
}

#[async_trait]
impl FileStore for FakeFileStore {
    async fn initialize(&self) -> Result<(), FileStoreError> {
        self.enter(FileCall::Initialize).await
    }

    async fn close(&self) -> Result<(), FileStoreError> {
        self.enter(FileCall::Close).await
    }

    async fn write_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: WriteOptions,
    ) -> Result<FileInfo, FileStoreError> {
        let path = validate_path(path)?;
        self.enter(FileCall::Write {
            path: path.clone(),
            len: bytes.len(),
        })
        .await?;

        let (info, kind) = {
            let mut state = self.lock();
            let parent = parent_of(&path).to_string();
            if !state.dirs.contains(&parent) {
                if !options.create_directories {
                    return Err(FileStoreError::NotFound(parent));
                }
                insert_dir_with_parents(&mut state.dirs, &parent);
            }
            let existing = state.files.get(&path).cloned();
            if existing.is_some() && !options.overwrite && !options.append {
                return Err(FileStoreError::AlreadyExists(path));
            }

            let used: u64 = state.files.values().map(|f| f.bytes.len() as u64).sum();
            let replaced = match (&existing, options.append) {
                (Some(file), false) => file.bytes.len() as u64,
                _ => 0,
            };
            if used - replaced + bytes.len() as u64 > state.quota {
                return Err(FileStoreError::QuotaExceeded { quota: state.quota });
            }

            let now = Utc::now();
            let kind = if existing.is_some() {
                ChangeKind::Modified
            } else {
                ChangeKind::Created
            };
            let mut content = match (&existing, options.append) {
                (Some(file), true) => file.bytes.clone(),
                _ => Vec::new(),
            };
            content.extend_from_slice(bytes);
            let file = FakeFile {
                bytes: content,
                created_at: existing.map(|f| f.created_at).unwrap_or(now),
                modified_at: now,
            };
            let info = Self::file_info(&path, &file);
            state.files.insert(path.clone(), file);
            state.metrics.writes += 1;
            state.metrics.bytes_written += bytes.len() as u64;
            (info, kind)
        };
        self.publish(&path, kind);
        Ok(info)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileStoreError> {
        let path = validate_path(path)?;
        self.enter(FileCall::Read { path: path.clone() }).await?;
        let mut state = self.lock();
        let bytes = state
            .files
            .get(&path)
            .map(|f| f.bytes.clone())
            .ok_or(FileStoreError::NotFound(path))?;
        state.metrics.reads += 1;
        state.metrics.bytes_read += bytes.len() as u64;
        Ok(bytes)
    }

    async fn delete_file(&self, path: &str) -> Result<bool, FileStoreError> {
        let path = validate_path(path)?;
        self.enter(FileCall::Delete { path: path.clone() }).await?;
        let removed = self.lock().files.remove(&path).is_some();
        if removed {
            self.publish(&path, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    async fn file_exists(&self, path: &str) -> Result<bool, FileStoreError> {
        let path = validate_dir_path(path)?;
        self.enter(FileCall::Exists { path: path.clone() }).await?;
        let state = self.lock();
        Ok(state.files.contains_key(&path) || state.dirs.contains(&path))
    }

    async fn get_info(&self, path: &str) -> Result<FileInfo, FileStoreError> {
        let path = validate_dir_path(path)?;
        self.enter(FileCall::Info { path: path.clone() }).await?;
        let state = self.lock();
        if let Some(file) = state.files.get(&path) {
            return Ok(Self::file_info(&path, file));
        }
        if state.dirs.contains(&path) {
            return Ok(Self::dir_info(&path));
        }
        Err(FileStoreError::NotFound(path))
    }

    async fn list_directory(
        &self,
        path: &str,
        filter: &ListFilter,
    ) -> Result<Vec<FileInfo>, FileStoreError> {
        let path = validate_dir_path(path)?;
        self.enter(FileCall::List { path: path.clone() }).await?;
        let state = self.lock();
        if !state.dirs.contains(&path) {
            return Err(FileStoreError::NotFound(path));
        }
        let dirs = state
            .dirs
            .iter()
            .filter(|d| !d.is_empty() && parent_of(d) == path)
            .map(|d| Self::dir_info(d));
        let files = state
            .files
            .iter()
            .filter(|(f, _)| parent_of(f) == path)
            .map(|(f, file)| Self::file_info(f, file));
        Ok(dirs.chain(files).filter(|i| filter.matches(i)).collect())
    }

    async fn create_directory(&self, path: &str) -> Result<(), FileStoreError> {
        let path = validate_path(path)?;
        self.enter(FileCall::CreateDirectory { path: path.clone() })
            .await?;
        let created = {
            let mut state = self.lock();
            let existed = state.dirs.contains(&path);
            insert_dir_with_parents(&mut state.dirs, &path);
            !existed
        };
        if created {
            self.publish(&path, ChangeKind::DirectoryCreated);
        }
        Ok(())
    }

    async fn status(&self) -> Result<FileStoreStatus, FileStoreError> {
        self.enter(FileCall::Status).await?;
        let classified = self.classified().is_some();
        let state = self.lock();
        let used: u64 = state.files.values().map(|f| f.bytes.len() as u64).sum();
        let missing_directories = if classified {
            DirectoryClass::ALL
                .into_iter()
                .filter(|c| !state.dirs.contains(&self.layout.directory_for(*c)))
                .collect()
        } else {
            Vec::new()
        };
        Ok(FileStoreStatus {
            root: "fake://".to_string(),
            usage: StorageUsage::of_capacity(used, state.quota),
            file_count: state.files.len() as u64,
            missing_directories,
        })
    }

    async fn sample_metrics(&self) -> Result<FileStoreMetrics, FileStoreError> {
        self.enter(FileCall::SampleMetrics).await?;
        let mut state = self.lock();
        let used: u64 = state.files.values().map(|f| f.bytes.len() as u64).sum();
        let mut metrics = std::mem::take(&mut state.metrics);
        metrics.used_bytes = used;
        Ok(metrics)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<DirectoryChange> {
        self.changes.subscribe()
    }

    fn classified(&self) -> Option<&dyn DirectoryClassified> {
        if self.classify.load(Ordering::SeqCst) {
            Some(&self.layout)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
