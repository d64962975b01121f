// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File retention sweep run by maintenance.
//!
//! Files older than their class's max age are deleted. When the store is
//! over the configured size, the oldest remaining files are deleted in class
//! priority order until it fits. Single-file failures become warnings.

use crate::call::bounded;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use stow_adapters::{DirectoryClassified, FileInfo, FileStore, FileStoreError, ListFilter};
use stow_core::{CleanupPolicy, DirectoryClass, StorageResult, Subsystem};

/// What one maintenance run removed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub records_removed: u64,
    pub files_removed: u64,
    pub bytes_freed: u64,
    pub finished_at: DateTime<Utc>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct SweepOutcome {
    pub files_removed: u64,
    pub bytes_freed: u64,
    pub warnings: Vec<String>,
}

pub(crate) async fn sweep_files<F: FileStore>(
    store: &F,
    policy: &CleanupPolicy,
    now: DateTime<Utc>,
    timeout: Duration,
) -> StorageResult<SweepOutcome> {
    let mut outcome = SweepOutcome::default();
    let Some(layout) = store.classified() else {
        tracing::warn!("file store does not classify directories, retention sweep skipped");
        outcome
            .warnings
            .push("retention sweep skipped: no directory classification".to_string());
        return Ok(outcome);
    };

    let mut files = BTreeMap::new();
    for class in DirectoryClass::ALL {
        let found = list_class(store, layout, class, timeout, &mut outcome.warnings).await;
        files.insert(class, found);
    }

    for (class, entries) in files.iter_mut() {
        let Some(max_age) = policy
            .max_age_for(*class)
            .and_then(|age| chrono::Duration::from_std(age).ok())
        else {
            continue;
        };
        // An age reaching past the earliest representable time expires nothing
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            continue;
        };
        let mut kept = Vec::with_capacity(entries.len());
        for info in entries.drain(..) {
            if info.modified_at < cutoff && remove(store, &info, timeout, &mut outcome).await {
                continue;
            }
            kept.push(info);
        }
        *entries = kept;
    }

    if let Some(limit) = policy.max_size {
        let status = bounded(Subsystem::FileStore, "status", timeout, store.status()).await?;
        let mut used = status.usage.used_bytes;
        'classes: for class in &policy.priority {
            let Some(entries) = files.get_mut(class) else {
                continue;
            };
            entries.sort_by_key(|info| info.modified_at);
            for info in entries.iter() {
                if used <= limit {
                    break 'classes;
                }
                if remove(store, info, timeout, &mut outcome).await {
                    used = used.saturating_sub(info.size);
                }
            }
        }
        if used > limit {
            tracing::warn!(used, limit, "file store still over size limit after sweep");
            outcome
                .warnings
                .push(format!("file store uses {} bytes, over the {} byte limit", used, limit));
        }
    }

    Ok(outcome)
}

/// Every file belonging to `class`, descending into unclassified subdirectories
async fn list_class<F: FileStore>(
    store: &F,
    layout: &dyn DirectoryClassified,
    class: DirectoryClass,
    timeout: Duration,
    warnings: &mut Vec<String>,
) -> Vec<FileInfo> {
    let mut found = Vec::new();
    let mut pending = vec![layout.directory_for(class)];
    while let Some(dir) = pending.pop() {
        let listed =
            tokio::time::timeout(timeout, store.list_directory(&dir, &ListFilter::new())).await;
        let entries = match listed {
            Ok(Ok(entries)) => entries,
            // Missing class directories are recovery's concern
            Ok(Err(FileStoreError::NotFound(_))) => continue,
            Ok(Err(e)) => {
                warnings.push(format!("could not list {}: {}", dir, e));
                continue;
            }
            Err(_) => {
                warnings.push(format!("listing {} timed out", dir));
                continue;
            }
        };
        for entry in entries {
            if !entry.is_directory {
                found.push(entry);
            } else if layout.classify(&entry.path) == Some(class) {
                pending.push(entry.path);
            }
        }
    }
    found
}

async fn remove<F: FileStore>(
    store: &F,
    info: &FileInfo,
    timeout: Duration,
    outcome: &mut SweepOutcome,
) -> bool {
    match bounded(
        Subsystem::FileStore,
        "delete_file",
        timeout,
        store.delete_file(&info.path),
    )
    .await
    {
        Ok(true) => {
            tracing::debug!(path = %info.path, size = info.size, "expired file removed");
            outcome.files_removed += 1;
            outcome.bytes_freed += info.size;
            true
        }
        Ok(false) => false,
        Err(e) => {
            tracing::warn!(path = %info.path, error = %e, "could not remove file");
            outcome
                .warnings
                .push(format!("could not remove {}: {}", info.path, e));
            false
        }
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
