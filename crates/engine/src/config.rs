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

use std::path::PathBuf;

/// Default number of physical lines echoed after a user debug line.
pub const DEFAULT_USER_DEBUG_CONTEXT_LINES: usize = 2;

/// Configuration for a replay session.
///
/// Controls how the [`LogContext`](crate::LogContext) attributes frames to the
/// trace file and how much it echoes to the host's console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Path of the trace being replayed; the root and inline-script frames point at it
    pub log_path: PathBuf,
    /// Echo every consumed line (except user debug output) to the console
    pub trace_log_file: bool,
    /// Continuation lines echoed after a user debug line
    pub user_debug_context_lines: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::new(),
            trace_log_file: false,
            user_debug_context_lines: DEFAULT_USER_DEBUG_CONTEXT_LINES,
        }
    }
}

impl ReplayConfig {
    /// Set the path of the trace being replayed
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Enable or disable echoing of consumed trace lines
    pub fn with_trace_log_file(mut self, trace: bool) -> Self {
        self.trace_log_file = trace;
        self
    }

    /// Set how many continuation lines follow a user debug line
    pub fn with_user_debug_context_lines(mut self, lines: usize) -> Self {
        self.user_debug_context_lines = lines;
        self
    }

    /// File name of the trace, or an empty string when no path is set.
    pub fn log_file_name(&self) -> String {
        self.log_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_and_file_name() {
        tdb_common::logging::ensure_test_logging(None);
        let config = ReplayConfig::default();
        assert_eq!(config.user_debug_context_lines, DEFAULT_USER_DEBUG_CONTEXT_LINES);
        assert!(!config.trace_log_file);
        assert_eq!(config.log_file_name(), "");

        let config = config
            .with_log_path("/logs/apex.log")
            .with_trace_log_file(true)
            .with_user_debug_context_lines(0);
        assert_eq!(config.log_file_name(), "apex.log");
        assert!(config.trace_log_file);
        assert_eq!(config.user_debug_context_lines, 0);
    }
}
