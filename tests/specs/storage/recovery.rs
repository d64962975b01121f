//! Recovery specs
//!
//! Verify integrity checks, repair strategies and validation over real
//! stores with damage applied directly on disk.

use crate::prelude::*;
use similar_asserts::assert_eq;

fn missing(result: &stow_core::IntegrityResult) -> usize {
    result.issues_of(IssueType::MissingData).count()
}

#[tokio::test]
async fn fresh_storage_is_valid() {
    let stow = Stow::new();
    let manager = stow.ready().await;

    let result = manager.check_integrity().await.unwrap();

    assert!(result.is_valid);
    assert!(result.issues.is_empty());
}

#[tokio::test]
async fn quick_repair_restores_a_wiped_file_store() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    std::fs::remove_dir_all(stow.files_root()).unwrap();

    let before = manager.check_integrity().await.unwrap();
    assert_eq!(missing(&before), DirectoryClass::ALL.len());
    assert!(!before.is_valid);

    let report = manager
        .perform_recovery(&RecoveryStrategy::QuickRepair)
        .await
        .unwrap();
    let validation = manager.validate_recovery().await.unwrap();

    assert_eq!(report.directories_created.len(), DirectoryClass::ALL.len());
    assert!(stow.files_root().join("media/audio").is_dir());
    assert!(validation.success);
    assert_eq!(validation.resolved_count, before.issues.len());
    assert_eq!(validation.unresolved_count, 0);
    assert_eq!(validation.new_issue_count, 0);
}

#[tokio::test]
async fn damaged_record_lines_are_found_and_repaired() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    let records = manager.get_record_store().await.unwrap();
    records
        .insert(RecordKind::Logs, Record::new(json!({"line": 1}), Utc::now()))
        .await
        .unwrap();
    let segment = stow.records_dir().join("logs.jsonl");
    let mut content = std::fs::read_to_string(&segment).unwrap();
    content.push_str("{not json\n");
    std::fs::write(&segment, content).unwrap();

    let before = manager.check_integrity().await.unwrap();
    assert!(before
        .issues
        .iter()
        .any(|i| i.issue_type == IssueType::InvalidFormat && i.location == "recordstore/logs"));

    manager
        .perform_recovery(&RecoveryStrategy::QuickRepair)
        .await
        .unwrap();
    let validation = manager.validate_recovery().await.unwrap();

    assert!(validation.success);
    assert_eq!(validation.unresolved_count, 0);
    let page = records
        .query_page(RecordKind::Logs, &RecordFilter::new(), 0, 10)
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);
}

#[tokio::test]
async fn full_recovery_clears_temp_and_orphaned_metadata() {
    let stow = Stow::new();
    let manager = stow.ready().await;
    stow.file_aged("temp/left-over.part", b"x", 0);
    stow.file_aged("media/images/kept.png", b"png", 0);
    let records = manager.get_record_store().await.unwrap();
    records
        .insert_batch(
            RecordKind::FileMetadata,
            vec![
                Record::new(json!({"path": "media/images/kept.png"}), Utc::now()),
                Record::new(json!({"path": "media/images/gone.png"}), Utc::now()),
            ],
        )
        .await
        .unwrap();

    let before = manager.check_integrity().await.unwrap();
    let report = manager
        .perform_recovery(&RecoveryStrategy::FullRecovery)
        .await
        .unwrap();
    let after = manager.check_integrity().await.unwrap();

    assert_eq!(before.issues.len(), 1);
    assert_eq!(report.temp_files_removed, 1);
    assert_eq!(report.orphans_removed, 1);
    assert!(!stow.exists("temp/left-over.part"));
    assert!(stow.exists("media/images/kept.png"));
    assert!(after.issues.is_empty());
}
