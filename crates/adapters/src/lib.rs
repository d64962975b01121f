// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Store contracts the storage engine is built on

pub mod file;
pub mod path;
pub mod record;
pub mod traced;

pub use file::{
    ChangeKind, DirectoryChange, DirectoryClassified, FileInfo, FileStore, FileStoreError,
    ListFilter, StandardLayout, WriteOptions,
};
pub use path::{validate_dir_path, validate_path};
pub use record::{
    RecordCursor, RecordPage, RecordStore, RecordStoreError, SubStore, DEFAULT_PAGE_SIZE,
};
pub use traced::{TracedFileStore, TracedRecordStore};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use file::{FakeFileStore, FileCall, FileOp};
#[cfg(any(test, feature = "test-support"))]
pub use record::{FakeRecordStore, RecordCall, RecordOp};
