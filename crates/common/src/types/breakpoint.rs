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

use std::{fmt::Display, str::FromStr};

use eyre::{bail, eyre, Error, Result};
use serde::{Deserialize, Serialize};

use super::SourceLocator;

/// A line breakpoint set by the user on a source file.
///
/// The file is matched against a frame's [`SourceLocator`] by path suffix, so
/// `Foo.cls:12` hits `/project/force-app/classes/Foo.cls` at line 12.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LineBreakpoint {
    /// File name or path suffix of the source.
    pub file: String,
    /// Line number in the source file (1-based).
    pub line: usize,
}

impl LineBreakpoint {
    /// Create a breakpoint at `file:line`.
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self { file: file.into(), line }
    }

    /// Whether this breakpoint is hit by a frame at `locator` on `line`.
    pub fn is_hit_by(&self, locator: &SourceLocator, line: usize) -> bool {
        self.line == line && locator.matches_file(&self.file)
    }
}

impl Display for LineBreakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl FromStr for LineBreakpoint {
    type Err = Error;

    /// Parses a breakpoint from a string.
    /// Format: `<file>:<line>`, split on the last colon so drive letters survive.
    /// Examples:
    /// - `Foo.cls:12`
    /// - `C:\project\classes\Foo.cls:7`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some((file, line)) = trimmed.rsplit_once(':') else {
            bail!("Invalid breakpoint format. Expected <file>:<line>, got: {s}");
        };
        if file.is_empty() {
            bail!("Breakpoint file is empty in: {s}");
        }
        let line = line.parse::<usize>().map_err(|e| eyre!("Invalid line number: {e}"))?;
        if line == 0 {
            bail!("Breakpoint lines are 1-based, got 0");
        }
        Ok(Self::new(file, line))
    }
}
