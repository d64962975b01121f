//! Storage lifecycle specs
//!
//! Verify initialize/shutdown over real stores and persistence across runs.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn initialize_lays_out_the_file_store() {
    let stow = Stow::new();

    let manager = stow.ready().await;

    for dir in ["temp", "logs", "media", "media/images", "media/audio"] {
        assert!(stow.files_root().join(dir).is_dir(), "{} missing", dir);
    }
    assert!(stow.records_dir().is_dir());
    assert_eq!(manager.lifecycle_state(), LifecycleState::Ready);
}

#[tokio::test]
async fn status_counts_records_and_files() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    let records = manager.get_record_store().await.unwrap();
    records
        .insert(RecordKind::ChatMessages, Record::new(json!({"text": "hi"}), Utc::now()))
        .await
        .unwrap();
    let files = manager.get_file_store().await.unwrap();
    files
        .write_file("media/images/a.png", &[7; 64], WriteOptions::default())
        .await
        .unwrap();

    let status = manager.get_storage_status().await.unwrap();

    assert!(status.record_store.connected);
    assert_eq!(status.record_store.total_records(), 1);
    assert_eq!(status.file_store.file_count, 1);
    assert_eq!(status.file_store.usage.used_bytes, 64);
    assert_eq!(
        status.total_usage.used_bytes,
        64 + status.record_store.size_bytes
    );
    assert!(status.file_store.missing_directories.is_empty());
}

#[tokio::test]
async fn records_survive_a_restart() {
    let stow = Stow::new();
    let first = stow.ready().await;
    let records = first.get_record_store().await.unwrap();
    records
        .insert_batch(
            RecordKind::SensorSamples,
            vec![
                Record::new(json!({"c": 20.5}), days_ago(1)),
                Record::new(json!({"c": 21.0}), Utc::now()),
            ],
        )
        .await
        .unwrap();
    first.shutdown().await.unwrap();

    let second = stow.ready().await;
    let records = second.get_record_store().await.unwrap();
    let page = records
        .query_page(RecordKind::SensorSamples, &RecordFilter::new(), 0, 10)
        .await
        .unwrap();

    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].payload, json!({"c": 20.5}));
}

#[tokio::test]
async fn shutdown_closes_the_handles() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    let records = manager.get_record_store().await.unwrap();
    let mut events = manager.observe_events();

    manager.shutdown().await.unwrap();

    let names: Vec<_> = events.drain().iter().map(StorageEvent::name).collect();
    assert_eq!(
        names,
        vec![
            "lifecycle:record_store:disconnected",
            "lifecycle:file_store:disconnected"
        ]
    );
    assert!(records
        .insert(RecordKind::Logs, Record::new(json!({}), Utc::now()))
        .await
        .is_err());
    assert!(manager.get_storage_status().await.is_err());
}
