// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic maintenance with a follow-up integrity check.
//!
//! The first pass runs at the configured time of day (UTC), or right away
//! when none is set. Each pass runs maintenance, then checks integrity and,
//! when configured, runs full recovery on an invalid result.

use crate::maintenance::MaintenanceReport;
use crate::manager::StorageManager;
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use stow_adapters::{FileStore, RecordStore};
use stow_core::{
    Clock, IntegrityResult, RecoveryStrategy, StorageError, StorageResult, ValidationResult,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Outcome of one scheduled pass
#[derive(Debug, Default)]
pub struct ScheduledRun {
    pub maintenance: Option<MaintenanceReport>,
    pub integrity: Option<IntegrityResult>,
    pub validation: Option<ValidationResult>,
}

/// Handle to the background maintenance loop
pub struct MaintenanceScheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceScheduler {
    /// Spawn the loop for `manager`; fails on a malformed start time
    pub fn spawn<R, F, C>(manager: Arc<StorageManager<R, F, C>>) -> StorageResult<Self>
    where
        R: RecordStore,
        F: FileStore,
        C: Clock,
    {
        let maintenance = &manager.config().maintenance;
        let start_time = maintenance.start_time()?;
        let period = maintenance.interval;
        if period.is_zero() {
            return Err(StorageError::Configuration(
                "maintenance.interval must be positive".to_string(),
            ));
        }
        let first = start_time
            .map(|at| delay_until(manager.clock().utc_now(), at))
            .unwrap_or(Duration::ZERO);

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + first;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_once(&manager).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            tracing::debug!("maintenance scheduler exited");
        });

        tracing::info!(
            first_run_in = ?first,
            interval = ?period,
            "maintenance scheduled"
        );
        Ok(Self { shutdown, task })
    }

    /// Stop the loop and wait for an in-flight pass to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "maintenance scheduler task failed");
        }
    }
}

/// One scheduled pass; failures are logged and the pass carries on
pub async fn run_once<R, F, C>(manager: &StorageManager<R, F, C>) -> ScheduledRun
where
    R: RecordStore,
    F: FileStore,
    C: Clock,
{
    let mut run = ScheduledRun::default();

    match manager.perform_maintenance().await {
        Ok(report) => run.maintenance = Some(report),
        Err(StorageError::MaintenanceInProgress) => {
            tracing::info!("maintenance already running, scheduled pass skipped");
            return run;
        }
        Err(e) => tracing::warn!(error = %e, "scheduled maintenance failed"),
    }

    let integrity = match manager.check_integrity().await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "scheduled integrity check failed");
            return run;
        }
    };
    let needs_recovery = !integrity.is_valid;
    if !integrity.issues.is_empty() {
        tracing::warn!(
            issues = integrity.issues.len(),
            valid = integrity.is_valid,
            "integrity check found issues"
        );
    }
    run.integrity = Some(integrity);

    if needs_recovery && manager.config().maintenance.auto_recover {
        match manager.perform_recovery(&RecoveryStrategy::FullRecovery).await {
            Ok(_) => match manager.validate_recovery().await {
                Ok(validation) => {
                    tracing::info!(
                        resolved = validation.resolved_count,
                        unresolved = validation.unresolved_count,
                        new = validation.new_issue_count,
                        "automatic recovery validated"
                    );
                    run.validation = Some(validation);
                }
                Err(e) => tracing::warn!(error = %e, "recovery validation failed"),
            },
            Err(e) => tracing::warn!(error = %e, "automatic recovery failed"),
        }
    }
    run
}

/// Time from `now` until the next occurrence of `at`, today or tomorrow
pub(crate) fn delay_until(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let today = now.date_naive().and_time(at).and_utc();
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
