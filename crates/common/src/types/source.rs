// TDB - Trace Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Where a frame's code lives: a display name and the path (or URI) of the source.
///
/// An empty locator means the signature could not be resolved; frames still
/// replay normally but breakpoints never match them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceLocator {
    /// File name shown to the user, e.g. `Foo.cls`.
    pub name: String,
    /// Full path or URI of the source.
    pub path: String,
}

impl SourceLocator {
    /// Build a locator from a path, using its last component as the name.
    pub fn from_path(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let trimmed = path.strip_prefix("file://").unwrap_or(path);
        let name = Path::new(trimmed)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path: path.to_string() }
    }

    /// Whether the locator resolved to nothing.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether `file` names this source, either exactly or as a trailing path segment.
    pub fn matches_file(&self, file: &str) -> bool {
        if self.is_empty() || file.is_empty() {
            return false;
        }
        if self.name == file || self.path == file {
            return true;
        }
        let normalized_path = self.path.replace('\\', "/");
        let normalized_file = file.replace('\\', "/");
        normalized_path.ends_with(&format!("/{}", normalized_file.trim_start_matches('/')))
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}", self.path)
        }
    }
}
