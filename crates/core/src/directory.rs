// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory classes of the file store

use serde::{Deserialize, Serialize};
use std::fmt;

/// A well-known area of the file store targeted by recovery and maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryClass {
    Root,
    Temp,
    Log,
    Media,
    Image,
    Audio,
}

impl DirectoryClass {
    pub const ALL: [DirectoryClass; 6] = [
        DirectoryClass::Root,
        DirectoryClass::Temp,
        DirectoryClass::Log,
        DirectoryClass::Media,
        DirectoryClass::Image,
        DirectoryClass::Audio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryClass::Root => "root",
            DirectoryClass::Temp => "temp",
            DirectoryClass::Log => "log",
            DirectoryClass::Media => "media",
            DirectoryClass::Image => "image",
            DirectoryClass::Audio => "audio",
        }
    }

    /// Default location relative to the file store root
    pub fn default_path(&self) -> &'static str {
        match self {
            DirectoryClass::Root => "",
            DirectoryClass::Temp => "temp",
            DirectoryClass::Log => "logs",
            DirectoryClass::Media => "media",
            DirectoryClass::Image => "media/images",
            DirectoryClass::Audio => "media/audio",
        }
    }

    /// Opaque issue location for this class, e.g. `directory/temp`
    pub fn location(&self) -> String {
        format!("directory/{}", self.as_str())
    }
}

impl fmt::Display for DirectoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_use_class_name() {
        assert_eq!(DirectoryClass::Temp.location(), "directory/temp");
        assert_eq!(DirectoryClass::Root.location(), "directory/root");
    }

    #[test]
    fn nested_classes_live_under_media() {
        assert!(DirectoryClass::Image.default_path().starts_with("media/"));
        assert!(DirectoryClass::Audio.default_path().starts_with("media/"));
    }

    #[test]
    fn all_lists_six_distinct_classes() {
        let set: std::collections::HashSet<_> = DirectoryClass::ALL.iter().collect();
        assert_eq!(set.len(), 6);
    }
}
