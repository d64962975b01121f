// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the storage subsystem
//!
//! Every failure that crosses the engine boundary is a [`StorageError`].
//! [`StorageError::kind`] classifies it into one of the eight [`ErrorKind`]s
//! so that the event feed never carries an unclassified error.

use crate::event::Subsystem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classified error kind carried by error events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Record side
    Connection,
    Query,
    RecordStorage,
    // File side
    Io,
    Security,
    InvalidPath,
    // Orchestration
    Configuration,
    Maintenance,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Connection,
        ErrorKind::Query,
        ErrorKind::RecordStorage,
        ErrorKind::Io,
        ErrorKind::Security,
        ErrorKind::InvalidPath,
        ErrorKind::Configuration,
        ErrorKind::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Query => "query",
            ErrorKind::RecordStorage => "record_storage",
            ErrorKind::Io => "io",
            ErrorKind::Security => "security",
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the storage subsystem
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("storage subsystem is not initialized")]
    NotInitialized,
    #[error("record store connection error: {0}")]
    Connection(String),
    #[error("record store query error: {0}")]
    Query(String),
    #[error("record store storage error: {0}")]
    RecordStorage(String),
    #[error("file store io error: {0}")]
    Io(String),
    #[error("security violation: {0}")]
    Security(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("maintenance error: {0}")]
    Maintenance(String),
    #[error("maintenance already in progress")]
    MaintenanceInProgress,
    #[error("{subsystem} {operation} timed out after {}", human_duration(.after))]
    Timeout {
        subsystem: Subsystem,
        operation: String,
        after: Duration,
    },
}

impl StorageError {
    /// Classify into one of the enumerated error kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Connection(_) => ErrorKind::Connection,
            StorageError::Query(_) => ErrorKind::Query,
            StorageError::RecordStorage(_) => ErrorKind::RecordStorage,
            StorageError::Io(_) => ErrorKind::Io,
            StorageError::Security(_) => ErrorKind::Security,
            StorageError::InvalidPath(_) => ErrorKind::InvalidPath,
            StorageError::Configuration(_) => ErrorKind::Configuration,
            StorageError::Timeout { subsystem, .. } => match subsystem {
                Subsystem::RecordStore => ErrorKind::Connection,
                Subsystem::FileStore => ErrorKind::Io,
                Subsystem::Manager => ErrorKind::Maintenance,
            },
            StorageError::Maintenance(_)
            | StorageError::MaintenanceInProgress
            | StorageError::NotInitialized => ErrorKind::Maintenance,
        }
    }

    /// Wrap a failure of unknown origin in the catch-all kind
    pub fn maintenance(message: impl Into<String>) -> Self {
        StorageError::Maintenance(message.into())
    }
}

fn human_duration(duration: &Duration) -> String {
    humantime::format_duration(*duration).to_string()
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
