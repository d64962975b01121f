//! Behavioral specifications for the stow storage subsystem.
//!
//! These tests are black-box: they drive a `LocalStorageManager` over a
//! temporary directory and verify what ends up on disk and in the status,
//! integrity and event surfaces.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// storage/
#[path = "specs/storage/lifecycle.rs"]
mod storage_lifecycle;
#[path = "specs/storage/maintenance.rs"]
mod storage_maintenance;
#[path = "specs/storage/recovery.rs"]
mod storage_recovery;
