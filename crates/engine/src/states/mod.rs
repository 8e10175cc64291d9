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

//! Parser state machine.
//!
//! Every trace line is classified into exactly one [`ParserState`] by
//! [`LogContext::classify`]. The state's handler then mutates the context and
//! answers whether replay should pause on that line. States are values: a new
//! one replaces the previous after each line, none is ever mutated in place.
//!
//! | Event kind | State | Pauses |
//! |---|---|---|
//! | first line of the trace | [`ParserState::LogEntry`] | yes |
//! | `CODE_UNIT_STARTED`, `CONSTRUCTOR_ENTRY`, `METHOD_ENTRY`, `VF_APEX_CALL_START` | [`FrameEntry`] | no |
//! | `CODE_UNIT_FINISHED`, `CONSTRUCTOR_EXIT`, `METHOD_EXIT`, `VF_APEX_CALL_END` | [`FrameExit`] | no |
//! | `STATEMENT_EXECUTE` | [`StatementExecute`] | yes |
//! | `USER_DEBUG` | [`UserDebug`] | no |
//! | `VARIABLE_SCOPE_BEGIN` | [`VariableBegin`] | no |
//! | `VARIABLE_ASSIGNMENT` | [`VariableAssignment`] | no |
//! | anything else | [`ParserState::NoOp`] | no |

mod frame;
mod statement;
mod variable;

pub use frame::*;
pub use statement::*;
pub use variable::*;

use tdb_common::types::SourceLocator;
use tracing::debug;

use crate::{FrameInfo, LogContext, StackFrame};

/// The state a trace line was classified into, with the fields its handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    /// Start of the log: pushes the synthetic root frame.
    LogEntry,
    /// A call starts.
    FrameEntry(FrameEntry),
    /// A call returns.
    FrameExit(FrameExit),
    /// A statement boundary.
    StatementExecute(StatementExecute),
    /// Output of a user debug statement.
    UserDebug(UserDebug),
    /// A variable is declared.
    VariableBegin(VariableBegin),
    /// A variable is assigned.
    VariableAssignment(VariableAssignment),
    /// Nothing to do.
    NoOp,
}

impl ParserState {
    /// Apply this state to `ctx`; returns whether replay pauses here.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        match self {
            Self::LogEntry => handle_log_entry(ctx),
            Self::FrameEntry(state) => state.handle(ctx),
            Self::FrameExit(state) => state.handle(ctx),
            Self::StatementExecute(state) => state.handle(ctx),
            Self::UserDebug(state) => state.handle(ctx),
            Self::VariableBegin(state) => state.handle(ctx),
            Self::VariableAssignment(state) => state.handle(ctx),
            Self::NoOp => false,
        }
    }

    /// Whether this is the initial log entry state.
    pub fn is_log_entry(&self) -> bool {
        matches!(self, Self::LogEntry)
    }

    /// Whether this is a user debug state.
    pub fn is_user_debug(&self) -> bool {
        matches!(self, Self::UserDebug(_))
    }
}

/// Push the root frame standing for the top of the log, stopped at line 1.
fn handle_log_entry(ctx: &mut LogContext) -> bool {
    let name = ctx.log_file_name();
    let source = SourceLocator::from_path(ctx.log_file_path());
    let state = &mut ctx.state;
    let statics = state.statics.create_detached();
    let depth = state.frames.len();
    let id = state.frame_handles.create(FrameInfo::new(depth, name.as_str(), "", statics));
    debug!(frame = id, name = %name, "Entering log");
    state.frames.push(StackFrame { id, name, source, line: 1 });
    true
}
