// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation of store-relative paths
//!
//! Traversal and absolute-path injection are security violations;
//! malformed input is an invalid path. The two are reported separately.

use crate::file::FileStoreError;

pub const MAX_PATH_LEN: usize = 1024;

/// Check a store-relative file path, returning its normalized form
pub fn validate_path(path: &str) -> Result<String, FileStoreError> {
    validate(path, false)
}

/// Like [`validate_path`] but accepts the store root (`""` or `.`)
pub fn validate_dir_path(path: &str) -> Result<String, FileStoreError> {
    validate(path, true)
}

fn validate(path: &str, allow_root: bool) -> Result<String, FileStoreError> {
    if path.contains('\0') {
        return Err(FileStoreError::InvalidPath("path contains a NUL byte".into()));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(FileStoreError::InvalidPath(format!(
            "path exceeds {} bytes",
            MAX_PATH_LEN
        )));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(FileStoreError::Security(format!("absolute path: {}", path)));
    }
    if has_drive_prefix(path) {
        return Err(FileStoreError::Security(format!("drive prefix: {}", path)));
    }

    let mut parts = Vec::new();
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                return Err(FileStoreError::Security(format!(
                    "parent traversal: {}",
                    path
                )))
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() && !allow_root {
        return Err(FileStoreError::InvalidPath("empty path".into()));
    }
    Ok(parts.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
