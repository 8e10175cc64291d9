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

use tdb_common::types::ConsoleChannel;
use tracing::trace;

use crate::{constants::EXEC_ANON_SIGNATURE, LogContext};

/// Parse a `[N]` line field.
pub(crate) fn parse_line_field(field: &str) -> Option<usize> {
    field.trim().trim_start_matches('[').trim_end_matches(']').parse().ok()
}

/// A statement boundary: `STATEMENT_EXECUTE|[N]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementExecute {
    /// Line of the statement within its code unit.
    pub line: usize,
}

impl StatementExecute {
    /// Build from the fields of the event.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        fields.get(2).and_then(|field| parse_line_field(field)).map(|line| Self { line })
    }

    /// Move the top frame to this statement. Always pauses.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        let line = ctx.frame_relative_line(self.line);
        if let Some(frame) = ctx.state.frames.last_mut() {
            trace!(frame = frame.id, line, "Statement");
            frame.line = line;
        }
        true
    }
}

/// Output of a debug statement: `USER_DEBUG|[N]|LEVEL|message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDebug {
    /// Line of the debug statement.
    pub line: usize,
    /// First line of the message; may itself contain `|`.
    pub message: String,
}

impl UserDebug {
    /// Build from the fields of the event.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        let line = fields.get(2).and_then(|field| parse_line_field(field))?;
        let message = fields.get(4..)?.join("|");
        Some(Self { line, message })
    }

    /// Write the message to the console, attributed to the current frame.
    /// Never pauses.
    ///
    /// The configured number of following trace lines are appended verbatim,
    /// whatever they hold.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        let mut message = self.message.clone();
        let continuation = ctx.lines_after_current(ctx.config.user_debug_context_lines);
        for next in continuation {
            message.push('\n');
            message.push_str(next);
        }

        let line = ctx.frame_relative_line(self.line);
        let source = ctx.state.top_frame().map(|frame| frame.source.clone());
        ctx.console.write(&message, source.as_ref(), Some(line), ConsoleChannel::Console);
        false
    }
}

impl LogContext {
    /// Translate a line reported by the log into a line of the top frame's
    /// source. Only inline scripts need translating.
    pub(crate) fn frame_relative_line(&self, line: usize) -> usize {
        match self.state.top_frame() {
            Some(frame) if frame.name == EXEC_ANON_SIGNATURE => self.exec_anon_location(line),
            _ => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_debug_fields() {
        tdb_common::logging::ensure_test_logging(None);
        let fields = ["t", "USER_DEBUG", "[7]", "DEBUG", "a", "b"];
        let state = UserDebug::from_fields(&fields);
        assert_eq!(state, Some(UserDebug { line: 7, message: "a|b".to_string() }));
        assert_eq!(UserDebug::from_fields(&["t", "USER_DEBUG", "[x]", "DEBUG", "a"]), None);
    }

    #[test]
    fn test_statement_fields() {
        tdb_common::logging::ensure_test_logging(None);
        assert_eq!(
            StatementExecute::from_fields(&["t", "STATEMENT_EXECUTE", "[12]"]),
            Some(StatementExecute { line: 12 })
        );
        assert_eq!(StatementExecute::from_fields(&["t", "STATEMENT_EXECUTE", "12x"]), None);
    }
}
