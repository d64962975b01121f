// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use serde_json::json;
use tempfile::tempdir;

fn entry(id: &str) -> SegmentEntry {
    SegmentEntry::new(Record::new(json!({"id": id}), Utc::now()).with_id(id)).unwrap()
}

#[test]
fn missing_segment_reads_empty() {
    let dir = tempdir().unwrap();
    assert!(read_lines(&dir.path().join("logs.jsonl")).unwrap().is_empty());
}

#[test]
fn appended_entries_read_back_valid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs.jsonl");

    let written = append(&path, &[entry("a"), entry("b")]).unwrap();
    assert!(written > 0);

    let lines = read_lines(&path).unwrap();
    let ids: Vec<_> = lines
        .iter()
        .filter_map(Line::record)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn tampered_payload_fails_checksum() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs.jsonl");
    append(&path, &[entry("a")]).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"id\":\"a\"}", "\"id\":\"z\"}")).unwrap();

    let lines = read_lines(&path).unwrap();
    assert!(matches!(lines[0], Line::Corrupt { number: 1, .. }));
}

#[test]
fn garbage_line_is_malformed_and_kept_verbatim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs.jsonl");
    append(&path, &[entry("a")]).unwrap();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{{not json").unwrap();

    let lines = read_lines(&path).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(matches!(lines[1], Line::Malformed { number: 2, .. }));
    assert_eq!(lines[1].raw(), "{not json");
}

#[test]
fn rewrite_replaces_contents_without_leaving_temp() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chat_messages.jsonl");
    append(&path, &[entry("a"), entry("b")]).unwrap();

    let lines = read_lines(&path).unwrap();
    rewrite(&path, lines.iter().skip(1).map(Line::raw)).unwrap();

    let after = read_lines(&path).unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].record().unwrap().id, "b");
    assert!(!dir.path().join("chat_messages.jsonl.tmp").exists());
}
