// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! stow-core: shared model of the stowage storage subsystem
//!
//! This crate provides:
//! - The error taxonomy and classified storage events
//! - Status, usage and metric snapshots
//! - Integrity issues, scan results and recovery strategies
//! - The record model and directory classes shared by store contracts
//! - Configuration and a clock abstraction

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod issue;
pub mod metrics;
pub mod record;
pub mod recovery;
pub mod status;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    BackupPolicy, CleanupPolicy, ConfigError, EventsConfig, FileStoreConfig, MaintenanceConfig,
    MaxAge, MonitorConfig, RecordStoreConfig, RetryPolicy, StorageConfig,
};
pub use directory::DirectoryClass;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use event::{LifecycleKind, MaintenanceKind, StorageEvent, Subsystem};
pub use issue::{IntegrityResult, IssueSeverity, IssueType, StorageIssue, ValidationResult};
pub use metrics::{
    calculate_operations_per_second, ErrorMetrics, FileStoreMetrics, PerformanceMetrics,
    RecordStoreMetrics, StorageMetrics,
};
pub use record::{DeleteCriteria, Record, RecordFilter, RecordKind};
pub use recovery::{RecoveryReport, RecoveryStep, RecoveryStrategy};
pub use status::{FileStoreStatus, RecordStoreStatus, StorageStatus, StorageUsage};
