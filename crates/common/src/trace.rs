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

//! Trace log loading.
//!
//! A trace is read once, split into lines and never modified afterwards.
//! Carriage returns from logs downloaded on Windows hosts are dropped.

use std::{fs, path::Path};

use eyre::{Result, WrapErr};

/// Split raw log contents into the ordered line sequence replayed by the engine.
pub fn split_trace_lines(contents: &str) -> Vec<String> {
    contents.lines().map(|line| line.trim_end_matches('\r').to_string()).collect()
}

/// Read a trace log from disk.
pub fn read_trace_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read trace log {}", path.display()))?;
    let lines = split_trace_lines(&contents);
    tracing::debug!(path = %path.display(), lines = lines.len(), "Loaded trace log");
    Ok(lines)
}
