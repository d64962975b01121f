// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry, cleanup and backup policies

use crate::directory::DirectoryClass;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Exponential backoff applied to record store initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retrying after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }
}

/// Age limits per directory class; absent means never expire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxAge {
    #[serde(with = "humantime_serde")]
    pub temp: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub log: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub media: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub image: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub audio: Option<Duration>,
}

impl Default for MaxAge {
    fn default() -> Self {
        Self {
            temp: Some(DAY),
            log: Some(DAY * 30),
            media: None,
            image: None,
            audio: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupPolicy {
    pub max_age: MaxAge,
    /// Byte ceiling for the file store; oldest files go first once exceeded
    pub max_size: Option<u64>,
    /// Class order for size-pressure deletion
    pub priority: Vec<DirectoryClass>,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            max_age: MaxAge::default(),
            max_size: None,
            priority: vec![
                DirectoryClass::Temp,
                DirectoryClass::Log,
                DirectoryClass::Audio,
                DirectoryClass::Image,
                DirectoryClass::Media,
            ],
        }
    }
}

impl CleanupPolicy {
    /// The root class never expires as a whole
    pub fn max_age_for(&self, class: DirectoryClass) -> Option<Duration> {
        match class {
            DirectoryClass::Root => None,
            DirectoryClass::Temp => self.max_age.temp,
            DirectoryClass::Log => self.max_age.log,
            DirectoryClass::Media => self.max_age.media,
            DirectoryClass::Image => self.max_age.image,
            DirectoryClass::Audio => self.max_age.audio,
        }
    }

    pub fn with_max_age(mut self, class: DirectoryClass, age: Option<Duration>) -> Self {
        match class {
            DirectoryClass::Root => {}
            DirectoryClass::Temp => self.max_age.temp = age,
            DirectoryClass::Log => self.max_age.log = age,
            DirectoryClass::Media => self.max_age.media = age,
            DirectoryClass::Image => self.max_age.image = age,
            DirectoryClass::Audio => self.max_age.audio = age,
        }
        self
    }

    pub fn with_max_size(mut self, bytes: Option<u64>) -> Self {
        self.max_size = bytes;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupPolicy {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    pub location: Option<PathBuf>,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DAY,
            retention: DAY * 7,
            location: None,
        }
    }
}

impl BackupPolicy {
    /// Location named in recovery advice, when backups are on
    pub fn advertised_location(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.location.as_ref().map(|p| p.display().to_string())
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
