// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage manager: lifecycle, status and maintenance over both stores.
//!
//! Store handles are built at most once, on first initialization, and
//! shared by the monitor and recovery. Failures of lifecycle, maintenance
//! and recovery calls go both to the caller and to the event feed.

use crate::call::{bounded, with_retry, CallTimeouts};
use crate::events::{EventBus, EventStream};
use crate::maintenance::{sweep_files, MaintenanceReport};
use crate::monitor::{PerformanceFeed, StorageMonitor};
use crate::recovery::StorageRecovery;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use stow_adapters::{FileStore, RecordStore, TracedFileStore, TracedRecordStore};
use stow_core::{
    Clock, IntegrityResult, LifecycleKind, MaintenanceKind, RecoveryReport, RecoveryStrategy,
    StorageConfig, StorageError, StorageEvent, StorageMetrics, StorageResult, StorageStatus,
    Subsystem, SystemClock, ValidationResult,
};
use stow_storage::{JsonRecordStore, LocalFileStore};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    ShuttingDown,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct Components<R, F, C: Clock> {
    monitor: StorageMonitor<R, F, C>,
    recovery: StorageRecovery<R, F>,
}

/// Manager over the local JSON-lines record store and filesystem file store
pub type LocalStorageManager = StorageManager<
    TracedRecordStore<JsonRecordStore>,
    TracedFileStore<LocalFileStore>,
    SystemClock,
>;

pub struct StorageManager<R, F, C: Clock = SystemClock> {
    config: StorageConfig,
    clock: C,
    timeouts: CallTimeouts,
    record_factory: Factory<R>,
    file_factory: Factory<F>,
    record_store: OnceCell<R>,
    file_store: OnceCell<F>,
    components: OnceCell<Components<R, F, C>>,
    state: Mutex<LifecycleState>,
    /// Serializes initialize and shutdown
    lifecycle: tokio::sync::Mutex<()>,
    /// Held for the duration of maintenance or recovery
    maintenance: tokio::sync::Mutex<()>,
    last_maintenance: Mutex<Option<DateTime<Utc>>>,
    events: EventBus,
}

impl LocalStorageManager {
    /// Manager over stores rooted at the configured paths
    pub fn local(config: StorageConfig) -> Self {
        let records = config.record_store.clone();
        let files = config.file_store.clone();
        Self::new(
            config,
            SystemClock,
            move || {
                TracedRecordStore::new(JsonRecordStore::new(
                    records.path.clone(),
                    records.retention,
                ))
            },
            move || {
                TracedFileStore::new(LocalFileStore::new(
                    files.root.clone(),
                    files.max_file_size,
                    files.quota_bytes,
                ))
            },
        )
    }
}

impl<R, F, C> StorageManager<R, F, C>
where
    R: RecordStore,
    F: FileStore,
    C: Clock,
{
    /// Manager whose stores are built by the factories on first initialization
    pub fn new(
        config: StorageConfig,
        clock: C,
        record_factory: impl Fn() -> R + Send + Sync + 'static,
        file_factory: impl Fn() -> F + Send + Sync + 'static,
    ) -> Self {
        Self {
            timeouts: CallTimeouts::from_config(&config),
            events: EventBus::new(config.events.capacity),
            config,
            clock,
            record_factory: Box::new(record_factory),
            file_factory: Box::new(file_factory),
            record_store: OnceCell::new(),
            file_store: OnceCell::new(),
            components: OnceCell::new(),
            state: Mutex::new(LifecycleState::Uninitialized),
            lifecycle: tokio::sync::Mutex::new(()),
            maintenance: tokio::sync::Mutex::new(()),
            last_maintenance: Mutex::new(None),
        }
    }

    /// Manager over already-built stores
    pub fn with_stores(config: StorageConfig, clock: C, record_store: R, file_store: F) -> Self {
        Self::new(
            config,
            clock,
            move || record_store.clone(),
            move || file_store.clone(),
        )
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub fn last_maintenance(&self) -> Option<DateTime<Utc>> {
        *self
            .last_maintenance
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// New subscriber to lifecycle, maintenance and error events
    pub fn observe_events(&self) -> EventStream {
        self.events.subscribe()
    }

    fn emit(&self, event: StorageEvent) {
        tracing::debug!(event = %event.name(), "storage event");
        self.events.publish(event);
    }

    /// Log and broadcast a failure, handing it back for the caller
    fn report(&self, error: StorageError, context: &str) -> StorageError {
        tracing::error!(context, kind = %error.kind(), error = %error, "storage operation failed");
        self.emit(StorageEvent::error(&error, context));
        error
    }

    async fn records(&self) -> &R {
        self.record_store
            .get_or_init(|| async { (self.record_factory)() })
            .await
    }

    async fn files(&self) -> &F {
        self.file_store
            .get_or_init(|| async { (self.file_factory)() })
            .await
    }

    async fn components(&self) -> &Components<R, F, C> {
        let records = self.records().await.clone();
        let files = self.files().await.clone();
        self.components
            .get_or_init(move || async move {
                Components {
                    monitor: StorageMonitor::with_timeouts(
                        records.clone(),
                        files.clone(),
                        self.clock.clone(),
                        self.config.monitor.clone(),
                        self.timeouts,
                    ),
                    recovery: StorageRecovery::new(records, files)
                        .with_backup(self.config.backup.clone())
                        .with_timeouts(self.timeouts),
                }
            })
            .await
    }

    fn ensure_ready(&self) -> StorageResult<()> {
        match self.lifecycle_state() {
            LifecycleState::Ready => Ok(()),
            _ => Err(StorageError::NotInitialized),
        }
    }

    /// Bring both stores up; a no-op when already ready
    pub async fn initialize(&self) -> StorageResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.lifecycle_state() == LifecycleState::Ready {
            return Ok(());
        }

        let started = self.clock.now();
        if let Err(e) = self.bring_up().await {
            self.set_state(LifecycleState::Uninitialized);
            return Err(self.report(e, "initialize"));
        }

        self.emit(StorageEvent::lifecycle(
            Subsystem::RecordStore,
            LifecycleKind::Initialized,
        ));
        self.emit(StorageEvent::lifecycle(
            Subsystem::FileStore,
            LifecycleKind::Initialized,
        ));
        self.set_state(LifecycleState::Ready);

        if self.config.monitor.enabled {
            self.components().await.monitor.start_monitoring();
        }
        let elapsed_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;
        tracing::info!(elapsed_ms, "storage initialized");
        Ok(())
    }

    async fn bring_up(&self) -> StorageResult<()> {
        let records = self.records().await;
        let files = self.files().await;
        let record_timeout = self.timeouts.record_store;
        let file_timeout = self.timeouts.file_store;

        let (record_result, file_result) = tokio::join!(
            with_retry(&self.config.record_store.retry, "record_store.initialize", move || {
                bounded(
                    Subsystem::RecordStore,
                    "initialize",
                    record_timeout,
                    records.initialize(),
                )
            }),
            bounded(
                Subsystem::FileStore,
                "initialize",
                file_timeout,
                files.initialize()
            ),
        );

        // Roll back whichever side came up
        match (record_result, file_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), file_result) => {
                if file_result.is_ok() {
                    let _ = bounded(Subsystem::FileStore, "close", file_timeout, files.close()).await;
                }
                Err(e)
            }
            (Ok(()), Err(e)) => {
                let _ = bounded(
                    Subsystem::RecordStore,
                    "close",
                    record_timeout,
                    records.close(),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Stop monitoring and close both stores. The state always ends up
    /// uninitialized; the first close failure is returned.
    pub async fn shutdown(&self) -> StorageResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.lifecycle_state() == LifecycleState::Uninitialized {
            return Ok(());
        }
        self.set_state(LifecycleState::ShuttingDown);
        // Let an in-flight maintenance or recovery pass finish before closing
        let _maintenance = self.maintenance.lock().await;

        if let Some(components) = self.components.get() {
            components.monitor.stop_monitoring();
        }

        let records = self.records().await;
        let files = self.files().await;
        let (record_result, file_result) = tokio::join!(
            bounded(
                Subsystem::RecordStore,
                "close",
                self.timeouts.record_store,
                records.close(),
            ),
            bounded(
                Subsystem::FileStore,
                "close",
                self.timeouts.file_store,
                files.close()
            ),
        );

        let mut first_error = None;
        for (subsystem, result) in [
            (Subsystem::RecordStore, record_result),
            (Subsystem::FileStore, file_result),
        ] {
            match result {
                Ok(()) => self.emit(StorageEvent::lifecycle(
                    subsystem,
                    LifecycleKind::Disconnected,
                )),
                Err(e) => {
                    let e = self.report(e, "shutdown");
                    first_error.get_or_insert(e);
                }
            }
        }

        self.set_state(LifecycleState::Uninitialized);
        tracing::info!("storage shut down");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn get_record_store(&self) -> StorageResult<R> {
        self.ensure_ready()?;
        self.record_store
            .get()
            .cloned()
            .ok_or(StorageError::NotInitialized)
    }

    pub async fn get_file_store(&self) -> StorageResult<F> {
        self.ensure_ready()?;
        self.file_store
            .get()
            .cloned()
            .ok_or(StorageError::NotInitialized)
    }

    /// Fresh status of both stores; performance comes from the monitor's
    /// latest sample when there is one
    pub async fn get_storage_status(&self) -> StorageResult<StorageStatus> {
        self.ensure_ready()?;
        let records = self.records().await;
        let files = self.files().await;
        let (record_status, file_status) = tokio::join!(
            bounded(
                Subsystem::RecordStore,
                "status",
                self.timeouts.record_store,
                records.status(),
            ),
            bounded(
                Subsystem::FileStore,
                "status",
                self.timeouts.file_store,
                files.status()
            ),
        );
        let mut record_status = record_status?;
        let file_status = file_status?;

        if let Some(components) = self.components.get() {
            let metrics = components.monitor.get_metrics();
            if metrics.cycles > 0 {
                record_status.performance = Some(metrics.performance);
            }
        }
        Ok(StorageStatus::compose(
            record_status,
            file_status,
            self.last_maintenance(),
        ))
    }

    /// Record cleanup plus the file retention sweep, bounded by the
    /// configured maximum duration. Concurrent runs are rejected.
    pub async fn perform_maintenance(&self) -> StorageResult<MaintenanceReport> {
        let Ok(_maintenance) = self.maintenance.try_lock() else {
            return Err(StorageError::MaintenanceInProgress);
        };
        self.ensure_ready()?;

        self.emit(StorageEvent::maintenance(MaintenanceKind::Started));
        let max_duration = self.config.maintenance.max_duration;
        let result = match tokio::time::timeout(max_duration, self.run_maintenance()).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                subsystem: Subsystem::Manager,
                operation: "maintenance".to_string(),
                after: max_duration,
            }),
        };

        match result {
            Ok(report) => {
                *self
                    .last_maintenance
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(report.finished_at);
                self.emit(StorageEvent::maintenance(MaintenanceKind::Completed));
                tracing::info!(
                    records_removed = report.records_removed,
                    files_removed = report.files_removed,
                    bytes_freed = report.bytes_freed,
                    warnings = report.warnings.len(),
                    "maintenance completed"
                );
                Ok(report)
            }
            Err(e) => Err(self.report(e, "maintenance")),
        }
    }

    async fn run_maintenance(&self) -> StorageResult<MaintenanceReport> {
        let records = self.records().await;
        let files = self.files().await;

        let records_removed = bounded(
            Subsystem::RecordStore,
            "cleanup",
            self.timeouts.record_store,
            records.cleanup(),
        )
        .await?;
        let sweep = sweep_files(
            files,
            &self.config.cleanup,
            self.clock.utc_now(),
            self.timeouts.file_store,
        )
        .await?;

        Ok(MaintenanceReport {
            records_removed,
            files_removed: sweep.files_removed,
            bytes_freed: sweep.bytes_freed,
            finished_at: self.clock.utc_now(),
            warnings: sweep.warnings,
        })
    }

    pub async fn check_integrity(&self) -> StorageResult<IntegrityResult> {
        self.ensure_ready()?;
        let recovery = &self.components().await.recovery;
        recovery
            .check_integrity()
            .await
            .map_err(|e| self.report(e, "integrity_check"))
    }

    /// Run a recovery strategy; shares the maintenance slot
    pub async fn perform_recovery(
        &self,
        strategy: &RecoveryStrategy,
    ) -> StorageResult<RecoveryReport> {
        let Ok(_maintenance) = self.maintenance.try_lock() else {
            return Err(StorageError::MaintenanceInProgress);
        };
        self.ensure_ready()?;
        let recovery = &self.components().await.recovery;

        self.emit(StorageEvent::maintenance(MaintenanceKind::RecoveryStarted));
        let report = recovery
            .perform_recovery(strategy)
            .await
            .map_err(|e| self.report(e, "recovery"))?;
        for warning in &report.warnings {
            tracing::warn!(strategy = strategy.name(), "{}", warning);
        }
        self.emit(StorageEvent::maintenance(
            MaintenanceKind::RecoveryCompleted,
        ));
        Ok(report)
    }

    pub async fn validate_recovery(&self) -> StorageResult<ValidationResult> {
        self.ensure_ready()?;
        let recovery = &self.components().await.recovery;
        recovery
            .validate_recovery()
            .await
            .map_err(|e| self.report(e, "validation"))
    }

    /// Latest monitor snapshot; zeroed before the first sample
    pub fn get_metrics(&self) -> StorageMetrics {
        self.components
            .get()
            .map(|c| c.monitor.get_metrics())
            .unwrap_or_default()
    }

    /// Performance feed of the monitor; available once the stores exist
    pub fn observe_performance(&self) -> StorageResult<PerformanceFeed> {
        self.components
            .get()
            .map(|c| c.monitor.observe_performance())
            .ok_or(StorageError::NotInitialized)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
