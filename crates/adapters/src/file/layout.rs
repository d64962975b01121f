// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::DirectoryClassified;
use stow_core::DirectoryClass;

/// Classifies directories by their default locations under the root
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLayout;

impl DirectoryClassified for StandardLayout {
    fn directory_for(&self, class: DirectoryClass) -> String {
        class.default_path().to_string()
    }

    fn classify(&self, path: &str) -> Option<DirectoryClass> {
        let path = path.trim_matches('/');
        DirectoryClass::ALL
            .into_iter()
            .filter(|class| {
                let dir = class.default_path();
                dir.is_empty()
                    || path == dir
                    || path
                        .strip_prefix(dir)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|class| class.default_path().len())
    }
}
