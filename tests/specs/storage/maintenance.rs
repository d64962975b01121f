//! Maintenance specs
//!
//! Verify retention cleanup of records and files over real stores.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn expired_files_are_swept_by_class() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    stow.file_aged("temp/upload.part", b"partial", 2);
    stow.file_aged("temp/current.part", b"partial", 0);
    stow.file_aged("logs/old.log", b"old log", 45);
    stow.file_aged("logs/recent.log", b"recent", 3);
    stow.file_aged("notes.txt", b"kept forever", 3000);

    let report = manager.perform_maintenance().await.unwrap();

    assert_eq!(report.files_removed, 2);
    assert_eq!(report.bytes_freed, 14);
    assert!(!stow.exists("temp/upload.part"));
    assert!(!stow.exists("logs/old.log"));
    assert!(stow.exists("temp/current.part"));
    assert!(stow.exists("logs/recent.log"));
    assert!(stow.exists("notes.txt"));
    assert_eq!(manager.last_maintenance(), Some(report.finished_at));
}

#[tokio::test]
async fn records_past_retention_are_cleaned_up() {
    let stow = Stow::configured(|mut config| {
        config.record_store.retention = Duration::from_secs(7 * 24 * 60 * 60);
        config
    });
    let manager = stow.ready().await;
    let records = manager.get_record_store().await.unwrap();
    records
        .insert_batch(
            RecordKind::Logs,
            vec![
                Record::new(json!({"line": "stale"}), days_ago(30)),
                Record::new(json!({"line": "stale too"}), days_ago(8)),
                Record::new(json!({"line": "fresh"}), days_ago(1)),
            ],
        )
        .await
        .unwrap();

    let report = manager.perform_maintenance().await.unwrap();

    assert_eq!(report.records_removed, 2);
    let page = records
        .query_page(RecordKind::Logs, &RecordFilter::new(), 0, 10)
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].payload, json!({"line": "fresh"}));
}

#[tokio::test]
async fn maintenance_is_announced_on_the_event_feed() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    let mut events = manager.observe_events();

    manager.perform_maintenance().await.unwrap();

    let names: Vec<_> = events.drain().iter().map(StorageEvent::name).collect();
    assert_eq!(names, vec!["maintenance:started", "maintenance:completed"]);
}

#[tokio::test]
async fn size_limit_evicts_oldest_temp_first() {
    let stow = Stow::configured(|mut config| {
        config.cleanup.max_size = Some(150);
        config
    });
    let manager = stow.ready().await;
    stow.file_aged("temp/a.part", &[0; 100], 0);
    stow.file_aged("media/images/b.png", &[0; 100], 10);

    let report = manager.perform_maintenance().await.unwrap();

    assert_eq!(report.files_removed, 1);
    assert!(!stow.exists("temp/a.part"));
    assert!(stow.exists("media/images/b.png"));
}
