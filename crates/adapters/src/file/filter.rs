// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory listing filter

use super::{FileInfo, FileStoreError};
use chrono::{DateTime, Utc};
use regex::Regex;

/// Criteria applied to directory listings; empty criteria match everything
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Extensions without the dot, compared case-insensitively
    pub extensions: Vec<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub modified_after: Option<DateTime<Utc>>,
    pub modified_before: Option<DateTime<Utc>>,
    pub name_pattern: Option<Regex>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn size_between(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn modified_before(mut self, at: DateTime<Utc>) -> Self {
        self.modified_before = Some(at);
        self
    }

    pub fn modified_after(mut self, at: DateTime<Utc>) -> Self {
        self.modified_after = Some(at);
        self
    }

    pub fn name_pattern(mut self, pattern: &str) -> Result<Self, FileStoreError> {
        let regex =
            Regex::new(pattern).map_err(|e| FileStoreError::InvalidPattern(e.to_string()))?;
        self.name_pattern = Some(regex);
        Ok(self)
    }

    pub fn matches(&self, info: &FileInfo) -> bool {
        if !self.extensions.is_empty() {
            let ext = info.extension().map(str::to_lowercase);
            if !ext.is_some_and(|ext| self.extensions.contains(&ext)) {
                return false;
            }
        }
        if self.min_size.is_some_and(|min| info.size < min)
            || self.max_size.is_some_and(|max| info.size > max)
        {
            return false;
        }
        if self.modified_after.is_some_and(|t| info.modified_at <= t)
            || self.modified_before.is_some_and(|t| info.modified_at >= t)
        {
            return false;
        }
        match &self.name_pattern {
            Some(pattern) => pattern.is_match(&info.name),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
