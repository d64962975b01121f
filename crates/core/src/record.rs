// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured record model shared by record store implementations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed sub-stores of the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    SensorSamples,
    ChatMessages,
    Logs,
    FileMetadata,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::SensorSamples,
        RecordKind::ChatMessages,
        RecordKind::Logs,
        RecordKind::FileMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::SensorSamples => "sensor_samples",
            RecordKind::ChatMessages => "chat_messages",
            RecordKind::Logs => "logs",
            RecordKind::FileMetadata => "file_metadata",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record
///
/// The payload is opaque to the storage subsystem. File-metadata records
/// carry the file store path under the `path` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Record {
    pub fn new(payload: serde_json::Value, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at,
            payload,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// File store path referenced by a file-metadata record
    pub fn file_path(&self) -> Option<&str> {
        self.payload.get("path").and_then(|v| v.as_str())
    }
}

/// Query filter for a sub-store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub id_prefix: Option<String>,
    /// Maximum records yielded across all pages
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }

    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.since.is_some_and(|since| record.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| record.created_at >= until) {
            return false;
        }
        match &self.id_prefix {
            Some(prefix) => record.id.starts_with(prefix.as_str()),
            None => true,
        }
    }
}

/// Which records a delete removes
///
/// A record matches when its id is listed or it is older than the cutoff.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteCriteria {
    pub ids: Vec<String>,
    pub older_than: Option<DateTime<Utc>>,
}

impl DeleteCriteria {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            older_than: None,
        }
    }

    pub fn older_than(cutoff: DateTime<Utc>) -> Self {
        Self {
            ids: Vec::new(),
            older_than: Some(cutoff),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.ids.iter().any(|id| *id == record.id)
            || self.older_than.is_some_and(|cutoff| record.created_at < cutoff)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
