// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use stow_adapters::{FakeFileStore, FileOp};

const TIMEOUT: Duration = Duration::from_secs(5);

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
}

fn days_ago(days: i64) -> DateTime<Utc> {
    now() - chrono::Duration::days(days)
}

fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - chrono::Duration::hours(hours)
}

#[tokio::test]
async fn expired_files_are_removed_per_class() {
    let files = FakeFileStore::with_standard_layout();
    files.add_file_at("temp/old.part", b"0123", days_ago(2));
    files.add_file_at("temp/fresh.part", b"01", hours_ago(1));
    files.add_file_at("logs/app.log", b"log", days_ago(10));
    files.add_file_at("logs/ancient.log", b"log", days_ago(45));
    files.add_file_at("media/images/cat.png", b"png", days_ago(400));

    let outcome = sweep_files(&files, &CleanupPolicy::default(), now(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(outcome.files_removed, 2);
    assert_eq!(outcome.bytes_freed, 7);
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        files.file_paths(),
        vec!["logs/app.log", "media/images/cat.png", "temp/fresh.part"]
    );
}

#[tokio::test]
async fn max_age_beyond_calendar_range_expires_nothing() {
    let files = FakeFileStore::with_standard_layout();
    files.add_file_at("temp/old.part", b"0123", days_ago(3650));
    let ages = Duration::from_secs(1_000_000 * 365 * 24 * 60 * 60);
    let policy = CleanupPolicy::default().with_max_age(DirectoryClass::Temp, Some(ages));

    let outcome = sweep_files(&files, &policy, now(), TIMEOUT).await.unwrap();

    assert_eq!(outcome.files_removed, 0);
    assert!(files.has_file("temp/old.part"));
}

#[tokio::test]
async fn unclassified_subdirectories_follow_their_parent_class() {
    let files = FakeFileStore::with_standard_layout();
    files.add_file_at("logs/archive/2025.log", b"x", days_ago(90));
    files.add_file_at("misc/notes.txt", b"x", days_ago(900));

    let outcome = sweep_files(&files, &CleanupPolicy::default(), now(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(outcome.files_removed, 1);
    assert!(!files.has_file("logs/archive/2025.log"));
    assert!(files.has_file("misc/notes.txt"));
}

#[tokio::test]
async fn size_pressure_removes_oldest_in_priority_order() {
    let files = FakeFileStore::with_standard_layout();
    files.add_file_at("temp/a", &[0; 60], hours_ago(2));
    files.add_file_at("logs/b", &[0; 60], hours_ago(3));
    files.add_file_at("logs/c", &[0; 60], hours_ago(1));
    files.add_file_at("media/d", &[0; 60], days_ago(300));
    let policy = CleanupPolicy::default().with_max_size(Some(150));

    let outcome = sweep_files(&files, &policy, now(), TIMEOUT).await.unwrap();

    // 240 bytes: temp goes first, then the older log
    assert_eq!(outcome.files_removed, 2);
    assert_eq!(files.file_paths(), vec!["logs/c", "media/d"]);
}

#[tokio::test]
async fn size_limit_out_of_reach_warns() {
    let files = FakeFileStore::with_standard_layout();
    // Root files are never deleted for space
    files.add_file_at("big.bin", &[0; 500], days_ago(1));
    let policy = CleanupPolicy::default().with_max_size(Some(100));

    let outcome = sweep_files(&files, &policy, now(), TIMEOUT).await.unwrap();

    assert_eq!(outcome.files_removed, 0);
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test]
async fn missing_class_directory_is_skipped_quietly() {
    let files = FakeFileStore::with_standard_layout();
    files.remove_directory("temp");
    files.add_file_at("logs/old.log", b"x", days_ago(31));

    let outcome = sweep_files(&files, &CleanupPolicy::default(), now(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(outcome.files_removed, 1);
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn failed_deletes_become_warnings() {
    let files = FakeFileStore::with_standard_layout();
    files.add_file_at("temp/a", b"x", days_ago(3));
    files.add_file_at("temp/b", b"x", days_ago(3));
    files.fail_on(FileOp::Delete, FileStoreError::Io("busy".into()));

    let outcome = sweep_files(&files, &CleanupPolicy::default(), now(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(outcome.files_removed, 0);
    assert_eq!(outcome.warnings.len(), 2);
    assert_eq!(files.call_count(FileOp::Delete), 2);
}

#[tokio::test]
async fn sweep_is_skipped_without_classification() {
    let files = FakeFileStore::with_standard_layout();
    files.add_file_at("temp/a", b"x", days_ago(30));
    files.set_classified(false);

    let outcome = sweep_files(&files, &CleanupPolicy::default(), now(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(outcome.files_removed, 0);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(files.has_file("temp/a"));
}
