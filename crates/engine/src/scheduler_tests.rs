// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use stow_adapters::{FakeFileStore, FakeRecordStore, RecordOp};
use stow_core::{FakeClock, IssueSeverity, IssueType, RetryPolicy, StorageConfig, StorageIssue};
use yare::parameterized;

fn manager_with(
    config: StorageConfig,
) -> (
    FakeRecordStore,
    FakeFileStore,
    Arc<StorageManager<FakeRecordStore, FakeFileStore, FakeClock>>,
) {
    let records = FakeRecordStore::new();
    let files = FakeFileStore::with_standard_layout();
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    let config = config
        .with_monitor_enabled(false)
        .with_retry(RetryPolicy::none());
    let manager = StorageManager::with_stores(config, clock, records.clone(), files.clone());
    (records, files, Arc::new(manager))
}

fn corrupt(records: &FakeRecordStore) {
    records.seed_issue(StorageIssue::new(
        IssueType::Corruption,
        "recordstore/logs",
        "checksum mismatch",
        IssueSeverity::High,
    ));
}

#[parameterized(
    later_today = { 12, 0, 14, 30, 150 },
    earlier_than_now = { 12, 0, 9, 0, 21 * 60 },
    exactly_now = { 12, 0, 12, 0, 24 * 60 },
    just_after_midnight = { 23, 59, 0, 1, 2 },
)]
fn delay_until_next_occurrence(now_h: u32, now_m: u32, at_h: u32, at_m: u32, minutes: u64) {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, now_h, now_m, 0).unwrap();
    let at = NaiveTime::from_hms_opt(at_h, at_m, 0).unwrap();

    assert_eq!(delay_until(now, at), Duration::from_secs(minutes * 60));
}

#[tokio::test]
async fn healthy_pass_runs_maintenance_and_check() {
    let (records, _files, manager) = manager_with(StorageConfig::new());
    manager.initialize().await.unwrap();

    let run = run_once(&manager).await;

    assert!(run.maintenance.is_some());
    assert!(run.integrity.unwrap().is_valid);
    assert!(run.validation.is_none());
    assert_eq!(records.call_count(RecordOp::Cleanup), 1);
}

#[tokio::test]
async fn invalid_check_triggers_recovery_when_enabled() {
    let mut config = StorageConfig::new();
    config.maintenance.auto_recover = true;
    let (records, _files, manager) = manager_with(config);
    manager.initialize().await.unwrap();
    corrupt(&records);

    let run = run_once(&manager).await;

    assert!(!run.integrity.unwrap().is_valid);
    let validation = run.validation.unwrap();
    assert_eq!(validation.resolved_count, 1);
    assert_eq!(records.call_count(RecordOp::RebuildIndexes), 1);
}

#[tokio::test]
async fn invalid_check_is_only_reported_without_auto_recover() {
    let (records, _files, manager) = manager_with(StorageConfig::new());
    manager.initialize().await.unwrap();
    corrupt(&records);

    let run = run_once(&manager).await;

    assert!(!run.integrity.unwrap().is_valid);
    assert!(run.validation.is_none());
    assert_eq!(records.call_count(RecordOp::Repair), 0);
}

#[tokio::test]
async fn pass_before_initialize_does_nothing() {
    let (records, _files, manager) = manager_with(StorageConfig::new());

    let run = run_once(&manager).await;

    assert!(run.maintenance.is_none());
    assert!(run.integrity.is_none());
    assert!(records.calls().is_empty());
}

#[test]
fn malformed_start_time_is_rejected() {
    let mut config = StorageConfig::new();
    config.maintenance.start_time = Some("25:99".to_string());
    let (_records, _files, manager) = manager_with(config);

    let err = MaintenanceScheduler::spawn(manager).err().unwrap();

    assert_eq!(err.kind(), stow_core::ErrorKind::Configuration);
}

#[tokio::test(start_paused = true)]
async fn scheduler_waits_for_start_time_then_repeats() {
    let mut config = StorageConfig::new();
    config.maintenance.start_time = Some("13:00".to_string());
    config.maintenance.interval = Duration::from_secs(3600);
    let (records, _files, manager) = manager_with(config);
    manager.initialize().await.unwrap();

    let scheduler = MaintenanceScheduler::spawn(Arc::clone(&manager)).unwrap();

    tokio::time::sleep(Duration::from_secs(59 * 60)).await;
    assert_eq!(records.call_count(RecordOp::Cleanup), 0);

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(records.call_count(RecordOp::Cleanup), 1);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(records.call_count(RecordOp::Cleanup), 2);

    scheduler.stop().await;
    tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
    assert_eq!(records.call_count(RecordOp::Cleanup), 2);
}
