// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical file store adapters

mod filter;
mod layout;

pub use filter::ListFilter;
pub use layout::StandardLayout;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeFileStore, FileCall, FileOp};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stow_core::{DirectoryClass, FileStoreMetrics, FileStoreStatus, StorageError};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from file store operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FileStoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("path rejected: {0}")]
    Security(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("file of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("quota of {quota} bytes exceeded")]
    QuotaExceeded { quota: u64 },
    #[error("invalid name pattern: {0}")]
    InvalidPattern(String),
}

impl From<std::io::Error> for FileStoreError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FileStoreError::NotFound(e.to_string()),
            std::io::ErrorKind::AlreadyExists => FileStoreError::AlreadyExists(e.to_string()),
            _ => FileStoreError::Io(e.to_string()),
        }
    }
}

impl From<FileStoreError> for StorageError {
    fn from(e: FileStoreError) -> Self {
        match e {
            FileStoreError::Security(msg) => StorageError::Security(msg),
            FileStoreError::InvalidPath(msg) => StorageError::InvalidPath(msg),
            FileStoreError::InvalidPattern(msg) => StorageError::InvalidPath(msg),
            other => StorageError::Io(other.to_string()),
        }
    }
}

/// How `write_file` treats existing files and missing parents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub append: bool,
    pub create_directories: bool,
    pub overwrite: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            append: false,
            create_directories: true,
            overwrite: true,
        }
    }
}

impl WriteOptions {
    pub fn append() -> Self {
        Self {
            append: true,
            ..Self::default()
        }
    }

    pub fn create_new() -> Self {
        Self {
            overwrite: false,
            ..Self::default()
        }
    }

    pub fn without_parents(mut self) -> Self {
        self.create_directories = false;
        self
    }
}

/// Metadata of a file or directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    /// Path relative to the store root
    pub path: String,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
    pub is_directory: bool,
    pub attributes: BTreeMap<String, String>,
}

impl FileInfo {
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    DirectoryCreated,
}

/// Notification published when the store's tree changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryChange {
    pub path: String,
    pub kind: ChangeKind,
}

/// Maps well-known directory classes onto a store's tree
pub trait DirectoryClassified: Send + Sync {
    /// Path of the class relative to the store root
    fn directory_for(&self, class: DirectoryClass) -> String;

    /// Most specific class containing `path`
    fn classify(&self, path: &str) -> Option<DirectoryClass>;
}

/// Adapter for the hierarchical file store
///
/// Paths are relative to the store root and validated before use.
#[async_trait]
pub trait FileStore: Clone + Send + Sync + 'static {
    async fn initialize(&self) -> Result<(), FileStoreError>;

    async fn close(&self) -> Result<(), FileStoreError>;

    async fn write_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: WriteOptions,
    ) -> Result<FileInfo, FileStoreError>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileStoreError>;

    /// Returns whether a file was removed
    async fn delete_file(&self, path: &str) -> Result<bool, FileStoreError>;

    async fn file_exists(&self, path: &str) -> Result<bool, FileStoreError>;

    async fn get_info(&self, path: &str) -> Result<FileInfo, FileStoreError>;

    /// Direct children of `path` matching the filter
    async fn list_directory(
        &self,
        path: &str,
        filter: &ListFilter,
    ) -> Result<Vec<FileInfo>, FileStoreError>;

    async fn create_directory(&self, path: &str) -> Result<(), FileStoreError>;

    async fn status(&self) -> Result<FileStoreStatus, FileStoreError>;

    /// Counters accumulated since the previous sample
    async fn sample_metrics(&self) -> Result<FileStoreMetrics, FileStoreError>;

    fn subscribe_changes(&self) -> broadcast::Receiver<DirectoryChange>;

    /// Directory classification, when the store supports it
    fn classified(&self) -> Option<&dyn DirectoryClassified>;
}
