// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    absolute = { "/etc/passwd" },
    backslash_root = { "\\windows\\system32" },
    unc = { "\\\\server\\share" },
    drive = { "C:\\data" },
    parent = { "../secret" },
    nested_parent = { "media/../../secret" },
    backslash_parent = { "media\\..\\..\\x" },
)]
fn traversal_is_a_security_error(path: &str) {
    let err = validate_path(path).unwrap_err();
    assert!(matches!(err, FileStoreError::Security(_)), "{path}: {err:?}");
}

#[parameterized(
    empty = { "" },
    dot = { "." },
    dot_slash = { "./" },
    nul = { "media/a\0b" },
)]
fn malformed_is_an_invalid_path(path: &str) {
    let err = validate_path(path).unwrap_err();
    assert!(matches!(err, FileStoreError::InvalidPath(_)), "{path}: {err:?}");
}

#[test]
fn overlong_path_is_invalid() {
    let path = "a/".repeat(MAX_PATH_LEN);
    assert!(matches!(
        validate_path(&path),
        Err(FileStoreError::InvalidPath(_))
    ));
}

#[parameterized(
    plain = { "media/a.png", "media/a.png" },
    dotted = { "./logs/./app.log", "logs/app.log" },
    trailing = { "temp/", "temp" },
    backslashes = { "media\\images\\b.png", "media/images/b.png" },
)]
fn valid_paths_normalize(path: &str, expected: &str) {
    assert_eq!(validate_path(path).unwrap(), expected);
}

#[test]
fn directory_paths_may_name_the_root() {
    assert_eq!(validate_dir_path("").unwrap(), "");
    assert_eq!(validate_dir_path(".").unwrap(), "");
    assert!(validate_dir_path("/").is_err());
}

#[test]
fn security_errors_classify_distinctly_from_io() {
    use stow_core::{ErrorKind, StorageError};

    let security: StorageError = validate_path("../x").unwrap_err().into();
    let io: StorageError = FileStoreError::Io("disk".into()).into();
    assert_eq!(security.kind(), ErrorKind::Security);
    assert_eq!(io.kind(), ErrorKind::Io);
}
