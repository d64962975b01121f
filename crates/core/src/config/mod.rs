// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage configuration
//!
//! Loaded from TOML. Every section is optional and durations use the
//! humantime form (`"30s"`, `"7days"`).

mod policy;

pub use policy::{BackupPolicy, CleanupPolicy, MaxAge, RetryPolicy};

use crate::error::StorageError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for StorageError {
    fn from(e: ConfigError) -> Self {
        StorageError::Configuration(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordStoreConfig {
    pub path: PathBuf,
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
    /// Records older than this are dropped by cleanup
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    pub retry: RetryPolicy,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("records"),
            call_timeout: Duration::from_secs(10),
            retention: Duration::from_secs(90 * 24 * 60 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    pub root: PathBuf,
    pub max_file_size: u64,
    /// Capacity basis for usage figures
    pub quota_bytes: u64,
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("files"),
            max_file_size: 100 * 1024 * 1024,
            quota_bytes: 10 * 1024 * 1024 * 1024,
            call_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Assumed operation count the cumulative error count is divided by
    pub error_rate_baseline: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30),
            error_rate_baseline: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// First run time of day, `HH:MM` UTC
    pub start_time: Option<String>,
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
    /// Run full recovery when the post-maintenance check is invalid
    pub auto_recover: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            start_time: None,
            max_duration: Duration::from_secs(60 * 60),
            auto_recover: false,
        }
    }
}

impl MaintenanceConfig {
    pub fn start_time(&self) -> Result<Option<NaiveTime>, ConfigError> {
        self.start_time
            .as_deref()
            .map(|s| {
                NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| {
                    ConfigError::Invalid(format!("maintenance.start_time {:?} is not HH:MM", s))
                })
            })
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-subscriber queue bound
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Complete configuration consumed by the storage manager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub record_store: RecordStoreConfig,
    pub file_store: FileStoreConfig,
    pub monitor: MonitorConfig,
    pub maintenance: MaintenanceConfig,
    pub cleanup: CleanupPolicy,
    pub backup: BackupPolicy,
    pub events: EventsConfig,
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with both stores placed under one directory
    pub fn rooted(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::default()
            .with_record_store_path(dir.join("records"))
            .with_file_store_root(dir.join("files"))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded storage config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.record_store.retry.max_attempts == 0 {
            return invalid("record_store.retry.max_attempts must be at least 1");
        }
        let multiplier = self.record_store.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return invalid("record_store.retry.backoff_multiplier must be at least 1.0");
        }
        if self.record_store.call_timeout.is_zero() || self.file_store.call_timeout.is_zero() {
            return invalid("call_timeout must be non-zero");
        }
        if self.monitor.interval.is_zero() {
            return invalid("monitor.interval must be non-zero");
        }
        if self.monitor.error_rate_baseline == 0 {
            return invalid("monitor.error_rate_baseline must be non-zero");
        }
        if self.maintenance.interval.is_zero() || self.maintenance.max_duration.is_zero() {
            return invalid("maintenance.interval and max_duration must be non-zero");
        }
        if self.events.capacity == 0 {
            return invalid("events.capacity must be non-zero");
        }
        if self.file_store.max_file_size == 0 || self.file_store.quota_bytes == 0 {
            return invalid("file_store.max_file_size and quota_bytes must be non-zero");
        }
        self.maintenance.start_time()?;
        Ok(())
    }

    pub fn with_record_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_store.path = path.into();
        self
    }

    pub fn with_file_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_store.root = root.into();
        self
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.file_store.quota_bytes = bytes;
        self
    }

    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor.interval = interval;
        self
    }

    pub fn with_monitor_enabled(mut self, enabled: bool) -> Self {
        self.monitor.enabled = enabled;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events.capacity = capacity;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.record_store.retry = retry;
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_backup(mut self, backup: BackupPolicy) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_call_timeouts(mut self, timeout: Duration) -> Self {
        self.record_store.call_timeout = timeout;
        self.file_store.call_timeout = timeout;
        self
    }
}
