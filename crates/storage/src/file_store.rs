// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File store over a local directory tree

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use stow_adapters::{
    validate_dir_path, validate_path, ChangeKind, DirectoryChange, DirectoryClassified, FileInfo,
    FileStore, FileStoreError, ListFilter, StandardLayout, WriteOptions,
};
use stow_core::{DirectoryClass, FileStoreMetrics, FileStoreStatus, StorageUsage};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

const CHANGE_CAPACITY: usize = 64;

struct Inner {
    root: PathBuf,
    max_file_size: u64,
    quota: u64,
    layout: StandardLayout,
    changes: broadcast::Sender<DirectoryChange>,
    metrics: Mutex<FileStoreMetrics>,
}

/// Local filesystem store with the standard directory layout
#[derive(Clone)]
pub struct LocalFileStore {
    inner: Arc<Inner>,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64, quota: u64) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                root: root.into(),
                max_file_size,
                quota,
                layout: StandardLayout,
                changes,
                metrics: Mutex::new(FileStoreMetrics::default()),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn resolve(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.inner.root.clone()
        } else {
            self.inner.root.join(rel)
        }
    }

    fn publish(&self, path: &str, kind: ChangeKind) {
        // No subscribers is fine
        let _ = self.inner.changes.send(DirectoryChange {
            path: path.to_string(),
            kind,
        });
    }

    fn record_metrics(&self, f: impl FnOnce(&mut FileStoreMetrics)) {
        f(&mut self.inner.metrics.lock().unwrap_or_else(|e| e.into_inner()));
    }

    /// Bytes and file count under the root
    async fn usage(&self) -> Result<(u64, u64), FileStoreError> {
        let root = self.inner.root.clone();
        tokio::task::spawn_blocking(move || walk_usage(&root))
            .await
            .map_err(|e| FileStoreError::Io(format!("usage walk failed: {}", e)))?
            .map_err(FileStoreError::from)
    }
}

fn walk_usage(dir: &Path) -> std::io::Result<(u64, u64)> {
    let mut bytes = 0;
    let mut files = 0;
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((0, 0)),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let meta = entry.path().symlink_metadata()?;
        if meta.is_dir() {
            let (b, f) = walk_usage(&entry.path())?;
            bytes += b;
            files += f;
        } else if meta.is_file() {
            bytes += meta.len();
            files += 1;
        }
    }
    Ok((bytes, files))
}

fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn info_from(rel: &str, meta: &Metadata) -> FileInfo {
    let name = rel.rsplit('/').next().unwrap_or(rel).to_string();
    let mut attributes = BTreeMap::new();
    if meta.permissions().readonly() {
        attributes.insert("readonly".to_string(), "true".to_string());
    }
    FileInfo {
        name,
        path: rel.to_string(),
        size: if meta.is_dir() { 0 } else { meta.len() },
        created_at: meta.created().ok().map(DateTime::<Utc>::from),
        modified_at: meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default(),
        is_directory: meta.is_dir(),
        attributes,
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn initialize(&self) -> Result<(), FileStoreError> {
        tokio::fs::create_dir_all(&self.inner.root).await?;
        for class in DirectoryClass::ALL {
            let dir = self.inner.layout.directory_for(class);
            tokio::fs::create_dir_all(self.resolve(&dir)).await?;
        }
        tracing::debug!(root = %self.inner.root.display(), "file store layout ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), FileStoreError> {
        Ok(())
    }

    async fn write_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: WriteOptions,
    ) -> Result<FileInfo, FileStoreError> {
        let rel = validate_path(path)?;
        let started = Instant::now();
        let full = self.resolve(&rel);

        let existing = match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => {
                return Err(FileStoreError::InvalidPath(format!("{} is a directory", rel)))
            }
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        if existing.is_some() && !options.overwrite && !options.append {
            return Err(FileStoreError::AlreadyExists(rel));
        }

        let size = bytes.len() as u64;
        let resulting = match (existing, options.append) {
            (Some(len), true) => len + size,
            _ => size,
        };
        if resulting > self.inner.max_file_size {
            return Err(FileStoreError::TooLarge {
                size: resulting,
                limit: self.inner.max_file_size,
            });
        }
        let (used, _) = self.usage().await?;
        let replaced = if options.append { 0 } else { existing.unwrap_or(0) };
        if used.saturating_sub(replaced) + size > self.inner.quota {
            return Err(FileStoreError::QuotaExceeded {
                quota: self.inner.quota,
            });
        }

        if let Some(parent) = full.parent() {
            if !tokio::fs::try_exists(parent).await? {
                if !options.create_directories {
                    let parent_rel = rel.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
                    return Err(FileStoreError::NotFound(parent_rel.to_string()));
                }
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        if options.append {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&full)
                .await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
        } else {
            tokio::fs::write(&full, bytes).await?;
        }

        let meta = tokio::fs::metadata(&full).await?;
        self.record_metrics(|m| {
            m.writes += 1;
            m.bytes_written += size;
            m.write_time += started.elapsed();
        });
        let kind = if existing.is_some() {
            ChangeKind::Modified
        } else {
            ChangeKind::Created
        };
        self.publish(&rel, kind);
        Ok(info_from(&rel, &meta))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileStoreError> {
        let rel = validate_path(path)?;
        let started = Instant::now();
        let bytes = tokio::fs::read(self.resolve(&rel))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FileStoreError::NotFound(rel.clone()),
                _ => e.into(),
            })?;
        self.record_metrics(|m| {
            m.reads += 1;
            m.bytes_read += bytes.len() as u64;
            m.read_time += started.elapsed();
        });
        Ok(bytes)
    }

    async fn delete_file(&self, path: &str) -> Result<bool, FileStoreError> {
        let rel = validate_path(path)?;
        match tokio::fs::remove_file(self.resolve(&rel)).await {
            Ok(()) => {
                self.publish(&rel, ChangeKind::Deleted);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn file_exists(&self, path: &str) -> Result<bool, FileStoreError> {
        let rel = validate_dir_path(path)?;
        Ok(tokio::fs::try_exists(self.resolve(&rel)).await?)
    }

    async fn get_info(&self, path: &str) -> Result<FileInfo, FileStoreError> {
        let rel = validate_dir_path(path)?;
        let meta = tokio::fs::metadata(self.resolve(&rel))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FileStoreError::NotFound(rel.clone()),
                _ => e.into(),
            })?;
        Ok(info_from(&rel, &meta))
    }

    async fn list_directory(
        &self,
        path: &str,
        filter: &ListFilter,
    ) -> Result<Vec<FileInfo>, FileStoreError> {
        let rel = validate_dir_path(path)?;
        let mut entries = tokio::fs::read_dir(self.resolve(&rel))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FileStoreError::NotFound(rel.clone()),
                _ => e.into(),
            })?;

        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(path = %entry.path().display(), "skipping non-utf8 name");
                continue;
            };
            let meta = entry.metadata().await?;
            let info = info_from(&join_rel(&rel, &name), &meta);
            if filter.matches(&info) {
                listed.push(info);
            }
        }
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    async fn create_directory(&self, path: &str) -> Result<(), FileStoreError> {
        let rel = validate_path(path)?;
        let full = self.resolve(&rel);
        if tokio::fs::metadata(&full).await.is_ok_and(|m| m.is_dir()) {
            return Ok(());
        }
        tokio::fs::create_dir_all(&full).await?;
        self.publish(&rel, ChangeKind::DirectoryCreated);
        Ok(())
    }

    async fn status(&self) -> Result<FileStoreStatus, FileStoreError> {
        let root = self.inner.root.clone();
        let (used, file_count, disk) = tokio::task::spawn_blocking(move || {
            let (used, files) = walk_usage(&root)?;
            Ok::<_, std::io::Error>((used, files, fs2::available_space(&root).ok()))
        })
        .await
        .map_err(|e| FileStoreError::Io(format!("usage walk failed: {}", e)))??;
        let quota_left = self.inner.quota.saturating_sub(used);
        let available = disk.map_or(quota_left, |disk| quota_left.min(disk));

        let mut missing_directories = Vec::new();
        for class in DirectoryClass::ALL {
            let dir = self.resolve(&self.inner.layout.directory_for(class));
            if !tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
                missing_directories.push(class);
            }
        }

        Ok(FileStoreStatus {
            root: self.inner.root.display().to_string(),
            usage: StorageUsage::bounded(used, available, self.inner.quota),
            file_count,
            missing_directories,
        })
    }

    async fn sample_metrics(&self) -> Result<FileStoreMetrics, FileStoreError> {
        let (used, _) = self.usage().await?;
        let mut metrics = {
            let mut current = self.inner.metrics.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *current)
        };
        metrics.used_bytes = used;
        Ok(metrics)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<DirectoryChange> {
        self.inner.changes.subscribe()
    }

    fn classified(&self) -> Option<&dyn DirectoryClassified> {
        Some(&self.inner.layout)
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
