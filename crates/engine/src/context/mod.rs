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

//! The replay orchestrator.
//!
//! [`LogContext`] owns the trace lines, the read position, the reconstructed
//! [`ReplayState`] and the host collaborators. Each [`LogContext::advance`]
//! consumes lines until a handler asks to pause, leaving the stack and
//! variables as they were at that point of the original execution.

mod heap_dump;

pub use heap_dump::*;

use eyre::Result;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tdb_common::{
    read_trace_file,
    types::{ConsoleChannel, SourceLocator},
};
use tracing::{debug, trace, warn};

use crate::{
    collaborators::{ConsoleSink, NoopResolver, SignatureResolver, TracingConsole},
    constants::*,
    states::{
        is_extraneous_vf_getter_or_setter, FrameEntry, FrameExit, StatementExecute, UserDebug,
        VariableAssignment, VariableBegin,
    },
    FrameInfo, ParserState, ReplayConfig, ReplayState, ScopeKind, ScopeView, StackFrame,
    StaticScope, VarId, VariableRef, VariableView,
};

static LOG_LEVELS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{2}.*APEX_CODE,FINEST;.*VISUALFORCE,(FINER|FINEST);.*").unwrap()
});
static STATEMENT_EXECUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r".*\|.*\|\[\d{1,}\]").unwrap());
static USER_DEBUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*\|.*\|\[\d{1,}\]\|.*\|.*").unwrap());

/// Replays a trace and holds the state reconstructed so far.
pub struct LogContext {
    pub(crate) config: ReplayConfig,
    lines: Vec<String>,
    /// Index of the last consumed line; `lines.len()` once the trace is exhausted.
    position: Option<usize>,
    current: Option<ParserState>,
    pub(crate) state: ReplayState,
    /// State saved by an active overlay.
    pub(crate) backup: Option<ReplayState>,
    /// Script line (1-based, as index + 1) to trace line (1-based).
    exec_anon_mapping: Vec<usize>,
    pub(crate) heap_dumps: Vec<HeapDumpRecord>,
    pub(crate) last_seen_heap_dump: Option<(String, usize)>,
    resolver: Box<dyn SignatureResolver>,
    pub(crate) console: Box<dyn ConsoleSink>,
}

impl std::fmt::Debug for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogContext")
            .field("config", &self.config)
            .field("lines", &self.lines.len())
            .field("position", &self.position)
            .field("current", &self.current)
            .field("frames", &self.state.frames.len())
            .field("variable_handles", &self.state.variable_handles.len())
            .field("overlay_active", &self.backup.is_some())
            .finish()
    }
}

impl LogContext {
    /// Context over `lines`, resolving nothing and writing to `tracing`.
    pub fn new(config: ReplayConfig, lines: Vec<String>) -> Self {
        Self {
            config,
            lines,
            position: None,
            current: None,
            state: ReplayState::new(),
            backup: None,
            exec_anon_mapping: Vec::new(),
            heap_dumps: Vec::new(),
            last_seen_heap_dump: None,
            resolver: Box::new(NoopResolver),
            console: Box::new(TracingConsole),
        }
    }

    /// Context over the trace at `config.log_path`.
    pub fn load(config: ReplayConfig) -> Result<Self> {
        let lines = read_trace_file(&config.log_path)?;
        debug!(path = %config.log_path.display(), lines = lines.len(), "Loaded trace");
        Ok(Self::new(config, lines))
    }

    /// Use `resolver` to locate the source of frames.
    pub fn with_resolver(mut self, resolver: Box<dyn SignatureResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Send console output to `console`.
    pub fn with_console(mut self, console: Box<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    /// Replay configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// The reconstructed state.
    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    /// All trace lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether replay is still on the trace.
    ///
    /// Stays true while paused on the last line; turns false once an advance
    /// runs off the end.
    pub fn has_log_lines(&self) -> bool {
        !self.lines.is_empty() && self.position.map_or(true, |position| position < self.lines.len())
    }

    /// Index of the last consumed line, `None` before the first advance.
    ///
    /// Equals the number of lines once the trace is exhausted.
    pub fn log_line_position(&self) -> Option<usize> {
        self.position
    }

    /// Index of the line after the last consumed one.
    fn next_index(&self) -> usize {
        self.position.map_or(0, |position| position + 1)
    }

    /// Whether the trace was captured with the detail replay needs.
    pub fn meets_log_level_requirements(&self) -> bool {
        self.lines.first().is_some_and(|header| LOG_LEVELS.is_match(header))
    }

    /// File name of the trace.
    pub fn log_file_name(&self) -> String {
        self.config.log_file_name()
    }

    /// Path of the trace.
    pub fn log_file_path(&self) -> String {
        self.config.log_path.to_string_lossy().into_owned()
    }

    /// Locator of the trace file itself.
    pub fn log_locator(&self) -> SourceLocator {
        SourceLocator::from_path(self.log_file_path())
    }

    /// Where the code of `signature` lives, empty when unknown.
    pub fn locator_for_signature(&self, signature: &str) -> SourceLocator {
        if signature == EXEC_ANON_SIGNATURE {
            return self.log_locator();
        }
        self.resolver.resolve(signature).unwrap_or_default()
    }

    /// Trace line echoing line `script_line` of the inline script, `0` when unknown.
    pub fn exec_anon_location(&self, script_line: usize) -> usize {
        script_line
            .checked_sub(1)
            .and_then(|index| self.exec_anon_mapping.get(index))
            .copied()
            .unwrap_or(0)
    }

    /// Trace lines of the inline script, in script order.
    pub fn exec_anon_mapping(&self) -> &[usize] {
        &self.exec_anon_mapping
    }

    /// The state of the last consumed line.
    pub fn current_state(&self) -> Option<&ParserState> {
        self.current.as_ref()
    }

    /// Call stack, bottom first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.state.frames
    }

    /// Depth of the call stack.
    pub fn num_frames(&self) -> usize {
        self.state.frames.len()
    }

    /// Whether any frame is on the stack.
    pub fn has_frames(&self) -> bool {
        !self.state.frames.is_empty()
    }

    /// Current frame.
    pub fn top_frame(&self) -> Option<&StackFrame> {
        self.state.top_frame()
    }

    /// Statics of `class_name`, if any frame of that class was entered.
    pub fn statics_for(&self, class_name: &str) -> Option<&StaticScope> {
        self.state.statics.statics_for(class_name)
    }

    /// Reference key to the canonical binding for that key.
    pub fn reference_table(&self) -> &IndexMap<String, VarId> {
        &self.state.refs
    }

    /// Scopes of the frame behind a frame handle.
    pub fn frame_info(&self, handle: u32) -> Option<&FrameInfo> {
        self.state.frame_handles.get(handle)
    }

    /// What a variable handle expands to.
    pub fn variable_ref(&self, handle: u32) -> Option<VariableRef> {
        self.state.variable_handles.get(handle).copied()
    }

    /// Whether the current frame runs a trigger.
    pub fn is_running_trigger(&self) -> bool {
        self.top_frame()
            .is_some_and(|frame| frame.source.name.to_lowercase().ends_with(TRIGGER_FILE_EXTENSION))
    }

    /// Lines following the one being handled, at most `count`.
    pub(crate) fn lines_after_current(&self, count: usize) -> &[String] {
        let start = self.next_index();
        let end = start.saturating_add(count).min(self.lines.len());
        &self.lines[start.min(end)..end]
    }

    /// Classify one trace line.
    ///
    /// The very first line always opens the log. Lines echoing an inline
    /// script are recorded so that script lines can be mapped back to the
    /// trace.
    pub fn classify(&mut self, line: &str) -> ParserState {
        if self.current.is_none() {
            return ParserState::LogEntry;
        }
        if line.starts_with(EVENT_EXECUTE_ANONYMOUS) {
            self.exec_anon_mapping.push(self.next_index());
        }

        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() < 3 {
            return ParserState::NoOp;
        }
        let classified = match fields[1] {
            EVENT_CODE_UNIT_STARTED | EVENT_CONSTRUCTOR_ENTRY | EVENT_METHOD_ENTRY => {
                FrameEntry::from_fields(&fields).map(ParserState::FrameEntry)
            }
            EVENT_VF_APEX_CALL_START if !is_vf_accessor(&fields) => {
                FrameEntry::from_fields(&fields).map(ParserState::FrameEntry)
            }
            EVENT_CODE_UNIT_FINISHED | EVENT_CONSTRUCTOR_EXIT | EVENT_METHOD_EXIT => {
                FrameExit::from_fields(&fields).map(ParserState::FrameExit)
            }
            EVENT_VF_APEX_CALL_END if !is_vf_accessor(&fields) => {
                FrameExit::from_fields(&fields).map(ParserState::FrameExit)
            }
            EVENT_VARIABLE_SCOPE_BEGIN => {
                VariableBegin::from_fields(&fields).map(ParserState::VariableBegin)
            }
            EVENT_VARIABLE_ASSIGNMENT => {
                VariableAssignment::from_fields(&fields).map(ParserState::VariableAssignment)
            }
            EVENT_STATEMENT_EXECUTE if STATEMENT_EXECUTE.is_match(line) => {
                StatementExecute::from_fields(&fields).map(ParserState::StatementExecute)
            }
            EVENT_USER_DEBUG if USER_DEBUG.is_match(line) => {
                UserDebug::from_fields(&fields).map(ParserState::UserDebug)
            }
            EVENT_HEAP_DUMP => {
                self.record_heap_dump_marker(line, &fields);
                None
            }
            _ => None,
        };
        classified.unwrap_or(ParserState::NoOp)
    }

    /// Consume lines until a handler pauses or the trace ends.
    pub fn advance(&mut self) {
        self.revert_overlay();
        if self.current.as_ref().is_some_and(ParserState::is_log_entry) {
            if let Some(root) = self.state.frames.pop() {
                self.state.frame_handles.remove(root.id);
            }
        }

        loop {
            let index = self.next_index();
            let Some(line) = self.lines.get(index).cloned() else {
                self.position = Some(self.lines.len());
                debug!(frames = self.state.frames.len(), "Trace exhausted");
                break;
            };
            self.position = Some(index);
            if line.is_empty() {
                continue;
            }

            let state = self.classify(&line);
            trace!(line = index + 1, ?state, "Classified");
            if self.config.trace_log_file && !state.is_user_debug() {
                self.console.write(&line, None, None, ConsoleChannel::Stdout);
            }

            let pause = state.handle(self);
            self.current = Some(state);
            if pause {
                debug!(line = index + 1, frames = self.state.frames.len(), "Paused");
                break;
            }
        }
    }

    /// Scopes of frame `frame_id`, each with a fresh handle.
    pub fn scopes(&mut self, frame_id: u32) -> Vec<ScopeView> {
        if self.state.frame_handles.get(frame_id).is_none() {
            return Vec::new();
        }
        ScopeKind::ALL
            .into_iter()
            .map(|kind| ScopeView {
                kind,
                handle: self
                    .state
                    .variable_handles
                    .create(VariableRef::Scope { frame: frame_id, kind }),
            })
            .collect()
    }

    /// Bindings behind a scope or variable handle; empty for unknown handles.
    pub fn variables(&self, handle: u32) -> Vec<VariableView> {
        self.state
            .expand(handle)
            .unwrap_or_default()
            .into_iter()
            .map(|var| self.state.view(var))
            .collect()
    }

    /// Remember the last heap-dump marker passed, or report it when malformed.
    fn record_heap_dump_marker(&mut self, line: &str, fields: &[&str]) {
        match HeapDumpRecord::from_fields(fields) {
            Some(record) => {
                trace!(class = %record.class_name, line = record.line, "Passed heap dump");
                self.last_seen_heap_dump = Some((record.class_name, record.line));
            }
            None => {
                warn!(line = self.next_index(), "Malformed heap dump line");
                self.console.write(
                    &malformed_line_message(self.next_index(), line),
                    None,
                    None,
                    ConsoleChannel::Stderr,
                );
            }
        }
    }
}

/// Whether a Visualforce call event is for a generated accessor.
fn is_vf_accessor(fields: &[&str]) -> bool {
    fields.len() >= 2 && is_extraneous_vf_getter_or_setter(fields[fields.len() - 2])
}

pub(crate) fn malformed_line_message(line_number: usize, line: &str) -> String {
    format!("Malformed log line at line {line_number}: {line}")
}
