// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage events broadcast to observers

use crate::error::{ErrorKind, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of the subsystem an event or failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    RecordStore,
    FileStore,
    Manager,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::RecordStore => "record_store",
            Subsystem::FileStore => "file_store",
            Subsystem::Manager => "manager",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    Initialized,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Started,
    Completed,
    RecoveryStarted,
    RecoveryCompleted,
}

/// Events emitted by the storage manager
///
/// Immutable once emitted. Ordering is emission order per subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageEvent {
    Lifecycle {
        subsystem: Subsystem,
        kind: LifecycleKind,
    },
    Maintenance {
        kind: MaintenanceKind,
    },
    Error {
        kind: ErrorKind,
        message: String,
        context: String,
    },
}

impl StorageEvent {
    pub fn lifecycle(subsystem: Subsystem, kind: LifecycleKind) -> Self {
        StorageEvent::Lifecycle { subsystem, kind }
    }

    pub fn maintenance(kind: MaintenanceKind) -> Self {
        StorageEvent::Maintenance { kind }
    }

    /// Build an error event from a classified failure
    pub fn error(error: &StorageError, context: impl Into<String>) -> Self {
        StorageEvent::Error {
            kind: error.kind(),
            message: error.to_string(),
            context: context.into(),
        }
    }

    /// Event name for logging and filtering, e.g. `lifecycle:record_store:initialized`
    pub fn name(&self) -> String {
        match self {
            StorageEvent::Lifecycle { subsystem, kind } => {
                let kind = match kind {
                    LifecycleKind::Initialized => "initialized",
                    LifecycleKind::Disconnected => "disconnected",
                };
                format!("lifecycle:{}:{}", subsystem, kind)
            }
            StorageEvent::Maintenance { kind } => match kind {
                MaintenanceKind::Started => "maintenance:started".to_string(),
                MaintenanceKind::Completed => "maintenance:completed".to_string(),
                MaintenanceKind::RecoveryStarted => "maintenance:recovery_started".to_string(),
                MaintenanceKind::RecoveryCompleted => "maintenance:recovery_completed".to_string(),
            },
            StorageEvent::Error { kind, .. } => format!("error:{}", kind),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StorageEvent::Error { .. })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
