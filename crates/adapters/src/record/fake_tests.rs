// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use serde_json::json;
use stow_core::IssueSeverity;

fn record(id: &str) -> Record {
    Record::new(json!({"n": id}), Utc::now()).with_id(id)
}

#[tokio::test]
async fn fake_records_lifecycle_calls() {
    let store = FakeRecordStore::new();

    store.initialize().await.unwrap();
    assert!(store.is_open());
    store.close().await.unwrap();
    assert!(!store.is_open());

    assert_eq!(store.calls(), vec![RecordCall::Initialize, RecordCall::Close]);
}

#[tokio::test]
async fn sub_store_pages_lazily() {
    let store = FakeRecordStore::new();
    let logs = store.sub_store(RecordKind::Logs);
    let batch = (0..5).map(|i| record(&format!("log-{i}"))).collect();
    assert_eq!(logs.insert_batch(batch).await.unwrap(), 5);

    let mut cursor = logs.query(RecordFilter::new()).with_page_size(2);
    assert_eq!(store.call_count(RecordOp::Query), 0);

    let first = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(store.call_count(RecordOp::Query), 1);

    let rest = cursor.collect_all().await.unwrap();
    assert_eq!(rest.len(), 3);
}

#[tokio::test]
async fn cursor_honors_limit_across_pages() {
    let store = FakeRecordStore::new();
    let chat = store.sub_store(RecordKind::ChatMessages);
    for i in 0..10 {
        chat.insert(record(&format!("m{i}"))).await.unwrap();
    }

    let all = chat
        .query(RecordFilter::new().limit(5))
        .with_page_size(3)
        .collect_all()
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn delete_returns_count() {
    let store = FakeRecordStore::new();
    let samples = store.sub_store(RecordKind::SensorSamples);
    samples
        .insert_batch(vec![record("a"), record("b"), record("c")])
        .await
        .unwrap();

    let removed = samples.delete(&DeleteCriteria::ids(["a", "c"])).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.records(RecordKind::SensorSamples).len(), 1);
}

#[tokio::test]
async fn fail_times_recovers_after_n_calls() {
    let store = FakeRecordStore::new();
    store.fail_times(RecordOp::Initialize, 2, RecordStoreError::Connection("down".into()));

    assert!(store.initialize().await.is_err());
    assert!(store.initialize().await.is_err());
    assert!(store.initialize().await.is_ok());
}

#[tokio::test]
async fn repair_and_rebuild_clear_matching_issues() {
    let store = FakeRecordStore::new();
    store.seed_issue(StorageIssue::new(
        IssueType::Corruption,
        "recordstore/logs",
        "bad crc",
        IssueSeverity::High,
    ));
    store.seed_issue(StorageIssue::new(
        IssueType::Inconsistency,
        "recordstore/index",
        "count drift",
        IssueSeverity::Medium,
    ));

    assert_eq!(store.repair().await.unwrap(), 1);
    assert_eq!(store.scan().await.unwrap().len(), 1);
    store.rebuild_indexes().await.unwrap();
    assert!(store.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn sample_metrics_resets_counters() {
    let store = FakeRecordStore::new();
    store
        .sub_store(RecordKind::Logs)
        .insert(record("x"))
        .await
        .unwrap();

    let first = store.sample_metrics().await.unwrap();
    assert_eq!(first.writes, 1);
    assert_eq!(first.record_count, 1);

    let second = store.sample_metrics().await.unwrap();
    assert_eq!(second.writes, 0);
}
