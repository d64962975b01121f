// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integrity scans, recovery strategies and post-recovery validation.
//!
//! State machine: Idle → Checking → {Valid, Recovering → Validating → Idle}.
//! Failures always return the machine to Idle so another attempt can run.

use crate::call::{bounded, CallTimeouts};
use std::sync::Mutex;
use stow_adapters::{FileStore, ListFilter, RecordStore};
use stow_core::{
    BackupPolicy, DeleteCriteria, DirectoryClass, IntegrityResult, IssueSeverity, IssueType,
    RecordFilter, RecordKind, RecoveryReport, RecoveryStep, RecoveryStrategy, StorageIssue,
    StorageResult, Subsystem, ValidationResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Idle,
    Checking,
    Valid,
    Recovering,
    Validating,
}

/// Severity of a missing directory of the given class
fn missing_severity(class: DirectoryClass) -> IssueSeverity {
    match class {
        DirectoryClass::Root => IssueSeverity::Critical,
        DirectoryClass::Log | DirectoryClass::Media => IssueSeverity::Medium,
        DirectoryClass::Temp | DirectoryClass::Image | DirectoryClass::Audio => IssueSeverity::Low,
    }
}

pub struct StorageRecovery<R, F> {
    record_store: R,
    file_store: F,
    backup: BackupPolicy,
    timeouts: CallTimeouts,
    state: Mutex<RecoveryState>,
    last_check: Mutex<Option<IntegrityResult>>,
    /// Serializes check, recovery and validation
    serial: tokio::sync::Mutex<()>,
}

impl<R: RecordStore, F: FileStore> StorageRecovery<R, F> {
    pub fn new(record_store: R, file_store: F) -> Self {
        Self {
            record_store,
            file_store,
            backup: BackupPolicy::default(),
            timeouts: CallTimeouts::default(),
            state: Mutex::new(RecoveryState::Idle),
            last_check: Mutex::new(None),
            serial: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_backup(mut self, backup: BackupPolicy) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn state(&self) -> RecoveryState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn last_check(&self) -> Option<IntegrityResult> {
        self.last_check
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_state(&self, state: RecoveryState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn store_check(&self, result: &IntegrityResult) {
        *self.last_check.lock().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());
    }

    /// Read-only scan of both stores; the result is kept for validation
    pub async fn check_integrity(&self) -> StorageResult<IntegrityResult> {
        let _serial = self.serial.lock().await;
        self.set_state(RecoveryState::Checking);
        match self.scan().await {
            Ok(result) => {
                self.store_check(&result);
                self.set_state(if result.is_valid {
                    RecoveryState::Valid
                } else {
                    RecoveryState::Idle
                });
                tracing::info!(
                    valid = result.is_valid,
                    issues = result.issues.len(),
                    "integrity check finished"
                );
                Ok(result)
            }
            Err(e) => {
                self.set_state(RecoveryState::Idle);
                Err(e)
            }
        }
    }

    pub async fn perform_recovery(
        &self,
        strategy: &RecoveryStrategy,
    ) -> StorageResult<RecoveryReport> {
        let _serial = self.serial.lock().await;
        self.set_state(RecoveryState::Recovering);
        tracing::info!(strategy = strategy.name(), "recovery started");

        let mut report = RecoveryReport::default();
        for step in strategy.steps() {
            report.steps.push(step);
            match step {
                RecoveryStep::RecreateDirectories => self.recreate_directories(&mut report).await,
                RecoveryStep::RepairRecordStore => self.repair_record_store(&mut report).await,
                RecoveryStep::CleanupTempFiles => self.cleanup_temp_files(&mut report).await,
                RecoveryStep::RebuildIndexes => self.rebuild_indexes(&mut report).await,
                RecoveryStep::RemoveOrphans => self.remove_orphans(&mut report).await,
            }
        }

        self.set_state(RecoveryState::Idle);
        tracing::info!(
            strategy = strategy.name(),
            directories_created = report.directories_created.len(),
            records_repaired = report.records_repaired,
            warnings = report.warnings.len(),
            "recovery finished"
        );
        Ok(report)
    }

    /// Re-scan and diff against the previous check by `(location, type)`
    pub async fn validate_recovery(&self) -> StorageResult<ValidationResult> {
        let _serial = self.serial.lock().await;
        self.set_state(RecoveryState::Validating);

        let previous = self.last_check();
        let current = match self.scan().await {
            Ok(current) => current,
            Err(e) => {
                self.set_state(RecoveryState::Idle);
                return Err(e);
            }
        };
        let mut result = ValidationResult::diff(
            previous.as_ref().unwrap_or(&IntegrityResult::default()),
            &current,
        );
        if previous.is_none() {
            result
                .warnings
                .insert(0, "no previous integrity check to compare against".to_string());
        }
        self.store_check(&current);
        self.set_state(RecoveryState::Idle);

        tracing::info!(
            success = result.success,
            resolved = result.resolved_count,
            unresolved = result.unresolved_count,
            new = result.new_issue_count,
            "recovery validated"
        );
        Ok(result)
    }

    async fn scan(&self) -> StorageResult<IntegrityResult> {
        let (mut issues, file_issues) =
            tokio::join!(self.scan_record_store(), self.scan_file_store());
        issues.extend(file_issues?);

        match self.orphaned_metadata().await {
            Ok(orphans) if !orphans.is_empty() => issues.push(StorageIssue::new(
                IssueType::Inconsistency,
                format!("recordstore/{}", RecordKind::FileMetadata),
                format!("{} file metadata records reference missing files", orphans.len()),
                IssueSeverity::Medium,
            )),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipped orphaned metadata check"),
        }

        let backup = self.backup.advertised_location();
        Ok(IntegrityResult::from_issues_with_backup(issues, backup.as_deref()))
    }

    async fn scan_record_store(&self) -> Vec<StorageIssue> {
        match bounded(
            Subsystem::RecordStore,
            "scan",
            self.timeouts.record_store,
            self.record_store.scan(),
        )
        .await
        {
            Ok(issues) => issues,
            Err(e) => vec![StorageIssue::new(
                IssueType::Corruption,
                "recordstore",
                format!("record store scan failed: {}", e),
                IssueSeverity::Critical,
            )],
        }
    }

    async fn scan_file_store(&self) -> StorageResult<Vec<StorageIssue>> {
        if self.file_store.classified().is_none() {
            return Ok(vec![StorageIssue::new(
                IssueType::Inconsistency,
                "filestore",
                "file store does not support directory classification",
                IssueSeverity::Medium,
            )]);
        }
        let status = bounded(
            Subsystem::FileStore,
            "status",
            self.timeouts.file_store,
            self.file_store.status(),
        )
        .await?;
        Ok(status
            .missing_directories
            .into_iter()
            .map(|class| {
                StorageIssue::new(
                    IssueType::MissingData,
                    class.location(),
                    format!("{} directory is missing", class.as_str()),
                    missing_severity(class),
                )
            })
            .collect())
    }

    /// File metadata records whose `path` no longer exists in the file store
    async fn orphaned_metadata(&self) -> StorageResult<Vec<String>> {
        let mut cursor = self
            .record_store
            .sub_store(RecordKind::FileMetadata)
            .query(RecordFilter::new());
        let mut orphans = Vec::new();
        loop {
            let page = bounded(
                Subsystem::RecordStore,
                "query",
                self.timeouts.record_store,
                cursor.next_page(),
            )
            .await?;
            let Some(records) = page else {
                break;
            };
            for record in records {
                let Some(path) = record.file_path() else {
                    continue;
                };
                let exists = bounded(
                    Subsystem::FileStore,
                    "file_exists",
                    self.timeouts.file_store,
                    self.file_store.file_exists(path),
                )
                .await
                .unwrap_or(false);
                if !exists {
                    orphans.push(record.id);
                }
            }
        }
        Ok(orphans)
    }

    async fn recreate_directories(&self, report: &mut RecoveryReport) {
        let Some(layout) = self.file_store.classified() else {
            report
                .warnings
                .push("file store does not classify directories; none recreated".to_string());
            return;
        };
        let missing = match bounded(
            Subsystem::FileStore,
            "status",
            self.timeouts.file_store,
            self.file_store.status(),
        )
        .await
        {
            Ok(status) => status.missing_directories,
            Err(e) => {
                report
                    .warnings
                    .push(format!("file store status unavailable, recreating all: {}", e));
                DirectoryClass::ALL.to_vec()
            }
        };

        for class in missing {
            let dir = layout.directory_for(class);
            let created = if dir.is_empty() {
                // The root comes back through initialization, which lays out every class
                bounded(
                    Subsystem::FileStore,
                    "initialize",
                    self.timeouts.file_store,
                    self.file_store.initialize(),
                )
                .await
            } else {
                bounded(
                    Subsystem::FileStore,
                    "create_directory",
                    self.timeouts.file_store,
                    self.file_store.create_directory(&dir),
                )
                .await
            };
            match created {
                Ok(()) => {
                    tracing::info!(class = class.as_str(), "recreated directory");
                    report.directories_created.push(class);
                }
                Err(e) => {
                    tracing::warn!(class = class.as_str(), error = %e, "could not recreate directory");
                    report
                        .warnings
                        .push(format!("could not recreate {}: {}", class.location(), e));
                }
            }
        }
    }

    async fn repair_record_store(&self, report: &mut RecoveryReport) {
        match bounded(
            Subsystem::RecordStore,
            "repair",
            self.timeouts.record_store,
            self.record_store.repair(),
        )
        .await
        {
            Ok(repaired) => report.records_repaired += repaired,
            Err(e) => {
                tracing::warn!(error = %e, "record store repair failed");
                report.warnings.push(format!("record store repair failed: {}", e));
            }
        }
    }

    async fn cleanup_temp_files(&self, report: &mut RecoveryReport) {
        let Some(layout) = self.file_store.classified() else {
            report
                .warnings
                .push("file store does not classify directories; temp not cleaned".to_string());
            return;
        };
        let temp = layout.directory_for(DirectoryClass::Temp);
        let entries = match bounded(
            Subsystem::FileStore,
            "list_directory",
            self.timeouts.file_store,
            self.file_store.list_directory(&temp, &ListFilter::new()),
        )
        .await
        {
            Ok(entries) => entries,
            Err(e) => {
                report.warnings.push(format!("could not list temp files: {}", e));
                return;
            }
        };

        for entry in entries.into_iter().filter(|e| !e.is_directory) {
            match bounded(
                Subsystem::FileStore,
                "delete_file",
                self.timeouts.file_store,
                self.file_store.delete_file(&entry.path),
            )
            .await
            {
                Ok(true) => report.temp_files_removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(path = %entry.path, error = %e, "temp file not removed");
                    report
                        .warnings
                        .push(format!("could not remove {}: {}", entry.path, e));
                }
            }
        }
    }

    async fn rebuild_indexes(&self, report: &mut RecoveryReport) {
        if let Err(e) = bounded(
            Subsystem::RecordStore,
            "rebuild_indexes",
            self.timeouts.record_store,
            self.record_store.rebuild_indexes(),
        )
        .await
        {
            tracing::warn!(error = %e, "index rebuild failed");
            report.warnings.push(format!("index rebuild failed: {}", e));
        }
    }

    async fn remove_orphans(&self, report: &mut RecoveryReport) {
        let orphans = match self.orphaned_metadata().await {
            Ok(orphans) if orphans.is_empty() => return,
            Ok(orphans) => orphans,
            Err(e) => {
                report.warnings.push(format!("orphan scan failed: {}", e));
                return;
            }
        };
        match bounded(
            Subsystem::RecordStore,
            "delete",
            self.timeouts.record_store,
            self.record_store
                .delete(RecordKind::FileMetadata, &DeleteCriteria::ids(orphans)),
        )
        .await
        {
            Ok(removed) => report.orphans_removed += removed,
            Err(e) => report.warnings.push(format!("orphan removal failed: {}", e)),
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
