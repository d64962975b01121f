//! Shared fixtures for storage specs

#![allow(dead_code)]

pub use chrono::{DateTime, Utc};
pub use serde_json::json;
pub use std::path::{Path, PathBuf};
pub use std::time::{Duration, SystemTime};
pub use stow_adapters::{FileStore, RecordStore, WriteOptions};
pub use stow_core::{
    DirectoryClass, IssueType, Record, RecordFilter, RecordKind, RecoveryStrategy, StorageConfig,
    StorageEvent,
};
pub use stow_engine::{LifecycleState, LocalStorageManager};

use tempfile::TempDir;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A storage root in a temp directory
pub struct Stow {
    dir: TempDir,
    config: StorageConfig,
}

impl Stow {
    pub fn new() -> Self {
        Self::configured(|config| config)
    }

    pub fn configured(f: impl FnOnce(StorageConfig) -> StorageConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = f(StorageConfig::rooted(dir.path()).with_monitor_enabled(false));
        Self { dir, config }
    }

    pub fn files_root(&self) -> PathBuf {
        self.dir.path().join("files")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.dir.path().join("records")
    }

    /// A fresh manager over this root, not yet initialized
    pub fn manager(&self) -> LocalStorageManager {
        LocalStorageManager::local(self.config.clone())
    }

    /// An initialized manager over this root
    pub async fn ready(&self) -> LocalStorageManager {
        let manager = self.manager();
        manager.initialize().await.unwrap();
        manager
    }

    /// Write a file under the file-store root and backdate it
    pub fn file_aged(&self, rel: &str, bytes: &[u8], age_days: u64) {
        let path = self.files_root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - DAY * age_days as u32)
            .unwrap();
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.files_root().join(rel).exists()
    }
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::days(days)
}
