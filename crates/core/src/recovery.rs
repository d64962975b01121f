// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery strategies and what running one did

use crate::directory::DirectoryClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single remediation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStep {
    RecreateDirectories,
    RepairRecordStore,
    CleanupTempFiles,
    RebuildIndexes,
    RemoveOrphans,
}

impl RecoveryStep {
    /// Steps selectable through custom strategy options, in execution order
    pub const CUSTOM: [RecoveryStep; 3] = [
        RecoveryStep::RecreateDirectories,
        RecoveryStep::RepairRecordStore,
        RecoveryStep::CleanupTempFiles,
    ];

    pub fn option_key(&self) -> &'static str {
        match self {
            RecoveryStep::RecreateDirectories => "recreate_directories",
            RecoveryStep::RepairRecordStore => "repair_record_store",
            RecoveryStep::CleanupTempFiles => "cleanup_temp_files",
            RecoveryStep::RebuildIndexes => "rebuild_indexes",
            RecoveryStep::RemoveOrphans => "remove_orphans",
        }
    }

    /// Match a custom option key, accepting snake_case or camelCase
    fn matches_option(&self, key: &str) -> bool {
        let normalized: String = key
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        normalized == self.option_key().replace('_', "")
    }
}

impl fmt::Display for RecoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_key())
    }
}

/// Remediation plan chosen by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RecoveryStrategy {
    QuickRepair,
    /// Quick repair plus temp cleanup, index rebuild and orphan removal
    FullRecovery,
    Custom { options: BTreeMap<String, bool> },
}

impl RecoveryStrategy {
    pub fn custom<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        RecoveryStrategy::Custom {
            options: options.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Steps this strategy runs, in order
    ///
    /// Unknown custom option keys are ignored.
    pub fn steps(&self) -> Vec<RecoveryStep> {
        match self {
            RecoveryStrategy::QuickRepair => {
                vec![RecoveryStep::RecreateDirectories, RecoveryStep::RepairRecordStore]
            }
            RecoveryStrategy::FullRecovery => vec![
                RecoveryStep::RecreateDirectories,
                RecoveryStep::RepairRecordStore,
                RecoveryStep::CleanupTempFiles,
                RecoveryStep::RebuildIndexes,
                RecoveryStep::RemoveOrphans,
            ],
            RecoveryStrategy::Custom { options } => RecoveryStep::CUSTOM
                .into_iter()
                .filter(|step| {
                    options
                        .iter()
                        .any(|(key, enabled)| *enabled && step.matches_option(key))
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecoveryStrategy::QuickRepair => "quick_repair",
            RecoveryStrategy::FullRecovery => "full_recovery",
            RecoveryStrategy::Custom { .. } => "custom",
        }
    }
}

/// What a recovery run did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub steps: Vec<RecoveryStep>,
    pub directories_created: Vec<DirectoryClass>,
    pub records_repaired: u64,
    pub temp_files_removed: u64,
    pub orphans_removed: u64,
    /// Secondary failures that were swallowed
    pub warnings: Vec<String>,
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
