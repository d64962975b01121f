// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integrity scan results and their comparison across scans
//!
//! Issues are recomputed on every scan and carry no stable identity.
//! Comparison between two scans keys issues by `(location, type)`, so two
//! distinct issues of the same type at the same location are
//! indistinguishable across runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const FULL_RECOVERY_ADVICE: &str =
    "Run full recovery: high or critical severity issues were detected";
pub const QUICK_REPAIR_ADVICE: &str = "Run quick repair to address low and medium severity issues";
pub const CHECK_BACKUPS_ADVICE: &str = "Check backups for missing data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Corruption,
    MissingData,
    Inconsistency,
    InvalidFormat,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueType::Corruption => "corruption",
            IssueType::MissingData => "missing_data",
            IssueType::Inconsistency => "inconsistency",
            IssueType::InvalidFormat => "invalid_format",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IssueSeverity {
    /// High and Critical issues invalidate a scan
    pub fn is_severe(&self) -> bool {
        *self >= IssueSeverity::High
    }
}

/// An anomaly found by an integrity scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageIssue {
    pub issue_type: IssueType,
    /// Opaque identifier such as `directory/temp` or `recordstore`
    pub location: String,
    pub description: String,
    pub severity: IssueSeverity,
}

impl StorageIssue {
    pub fn new(
        issue_type: IssueType,
        location: impl Into<String>,
        description: impl Into<String>,
        severity: IssueSeverity,
    ) -> Self {
        Self {
            issue_type,
            location: location.into(),
            description: description.into(),
            severity,
        }
    }

    fn key(&self) -> (&str, IssueType) {
        (self.location.as_str(), self.issue_type)
    }
}

impl fmt::Display for StorageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} ({:?}): {}",
            self.issue_type, self.location, self.severity, self.description
        )
    }
}

/// Outcome of one integrity scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub is_valid: bool,
    pub issues: Vec<StorageIssue>,
    pub recommendations: Vec<String>,
}

impl IntegrityResult {
    pub fn from_issues(issues: Vec<StorageIssue>) -> Self {
        Self::from_issues_with_backup(issues, None)
    }

    /// Derive validity and advice; a configured backup location is named
    /// in the backup advice
    pub fn from_issues_with_backup(issues: Vec<StorageIssue>, backup: Option<&str>) -> Self {
        let severe = issues.iter().any(|i| i.severity.is_severe());
        let mut recommendations = Vec::new();

        if severe {
            recommendations.push(FULL_RECOVERY_ADVICE.to_string());
        } else if !issues.is_empty() {
            recommendations.push(QUICK_REPAIR_ADVICE.to_string());
        }

        if issues.iter().any(|i| i.issue_type == IssueType::MissingData) {
            recommendations.push(match backup {
                Some(location) => format!("{} at {}", CHECK_BACKUPS_ADVICE, location),
                None => CHECK_BACKUPS_ADVICE.to_string(),
            });
        }

        Self {
            is_valid: !severe,
            issues,
            recommendations,
        }
    }

    pub fn issues_of(&self, issue_type: IssueType) -> impl Iterator<Item = &StorageIssue> {
        self.issues.iter().filter(move |i| i.issue_type == issue_type)
    }
}

/// Comparison of a scan against the one before it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub resolved_count: usize,
    pub unresolved_count: usize,
    pub new_issue_count: usize,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Diff two scans by `(location, type)`
    ///
    /// Severity of an unresolved issue is taken from the latest scan.
    pub fn diff(before: &IntegrityResult, after: &IntegrityResult) -> Self {
        let mut current: HashMap<(&str, IssueType), IssueSeverity> = HashMap::new();
        for issue in &after.issues {
            let entry = current.entry(issue.key()).or_insert(issue.severity);
            *entry = (*entry).max(issue.severity);
        }

        let mut resolved_count = 0;
        let mut unresolved = Vec::new();
        for issue in &before.issues {
            match current.get(&issue.key()) {
                Some(severity) => unresolved.push((issue, *severity)),
                None => resolved_count += 1,
            }
        }

        let previous: std::collections::HashSet<_> =
            before.issues.iter().map(StorageIssue::key).collect();
        let new_issues: Vec<_> = after
            .issues
            .iter()
            .filter(|i| !previous.contains(&i.key()))
            .collect();

        let mut warnings = Vec::new();
        for (issue, severity) in &unresolved {
            warnings.push(format!(
                "unresolved {} at {} ({:?})",
                issue.issue_type, issue.location, severity
            ));
        }
        for issue in &new_issues {
            warnings.push(format!("new issue: {}", issue));
        }

        Self {
            success: !unresolved.iter().any(|(_, s)| s.is_severe()),
            resolved_count,
            unresolved_count: unresolved.len(),
            new_issue_count: new_issues.len(),
            warnings,
        }
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
