// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use std::collections::BTreeMap;

fn info(name: &str, size: u64, day: u32) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        path: format!("media/{name}"),
        size,
        created_at: None,
        modified_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
        is_directory: false,
        attributes: BTreeMap::new(),
    }
}

#[test]
fn empty_filter_matches_everything() {
    assert!(ListFilter::new().matches(&info("a.bin", 0, 1)));
}

#[test]
fn extensions_ignore_case_and_dots() {
    let filter = ListFilter::new().extensions([".PNG", "jpg"]);
    assert!(filter.matches(&info("photo.png", 1, 1)));
    assert!(filter.matches(&info("photo.JPG", 1, 1)));
    assert!(!filter.matches(&info("clip.mp4", 1, 1)));
    assert!(!filter.matches(&info("README", 1, 1)));
}

#[test]
fn size_bounds_are_inclusive() {
    let filter = ListFilter::new().size_between(Some(10), Some(20));
    assert!(!filter.matches(&info("a", 9, 1)));
    assert!(filter.matches(&info("a", 10, 1)));
    assert!(filter.matches(&info("a", 20, 1)));
    assert!(!filter.matches(&info("a", 21, 1)));
}

#[test]
fn modified_window_is_exclusive() {
    let filter = ListFilter::new()
        .modified_after(Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap())
        .modified_before(Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap());
    assert!(!filter.matches(&info("a", 1, 5)));
    assert!(filter.matches(&info("a", 1, 7)));
    assert!(!filter.matches(&info("a", 1, 10)));
}

#[test]
fn name_pattern_uses_regex() {
    let filter = ListFilter::new().name_pattern(r"^cam-\d+\.png$").unwrap();
    assert!(filter.matches(&info("cam-12.png", 1, 1)));
    assert!(!filter.matches(&info("cam-x.png", 1, 1)));
}

#[test]
fn bad_pattern_is_rejected() {
    let err = ListFilter::new().name_pattern("(unclosed").unwrap_err();
    assert!(matches!(err, FileStoreError::InvalidPattern(_)));
}
