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

//! Replay session driving a [`LogContext`] the way a debugger front-end would.
//!
//! Without breakpoints every pause of the trace is a stop, like stepping.
//! With breakpoints replay continues until a statement lands on one. A
//! [`StepKind`] navigates by call depth instead, still honoring breakpoints
//! on the way. Each stop applies the heap dump captured at that position, if
//! any, before the state is captured for display.

use std::fmt;

use tdb_engine::{
    BreakpointIndex, LineBreakpoints, LogContext, ParserState, ScopeKind, StackFrame,
    VariableView,
};
use tracing::debug;

/// Step over, into or out of calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StepKind {
    /// Next pause in the current frame or a caller.
    Over,
    /// Next pause in the current frame or a callee.
    In,
    /// Next pause in a caller.
    Out,
}

impl StepKind {
    /// Whether moving from `prev` frames to `cur` frames completes the step.
    pub fn completes(self, prev: usize, cur: usize) -> bool {
        match self {
            Self::Over => cur != 0 && cur <= prev,
            Self::In => cur >= prev,
            Self::Out => cur != 0 && cur < prev,
        }
    }
}

/// Why replay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The start of the log.
    Entry,
    /// The next pause of the trace.
    Step,
    /// A statement on a breakpoint.
    Breakpoint,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Step => write!(f, "step"),
            Self::Breakpoint => write!(f, "breakpoint"),
        }
    }
}

/// Snapshot of the replay state at a stop.
#[derive(Debug, Clone)]
pub struct Stop {
    /// 1-based number of the stop.
    pub index: usize,
    /// Why replay stopped.
    pub reason: StopReason,
    /// Whether a heap dump overlay is applied.
    pub overlay: bool,
    /// Call stack, top first.
    pub frames: Vec<StackFrame>,
    /// Non-empty scopes of the top frame.
    pub scopes: Vec<(ScopeKind, Vec<VariableView>)>,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stop #{} ({})", self.index, self.reason)?;
        if let Some(top) = self.frames.first() {
            write!(f, " at {}:{}", top.source.name, top.line)?;
        }
        if self.overlay {
            write!(f, " [heap dump]")?;
        }
        writeln!(f)?;
        for (depth, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  #{depth} {} at {}:{}", frame.name, frame.source, frame.line)?;
        }
        for (kind, variables) in &self.scopes {
            writeln!(f, "  {kind}:")?;
            for variable in variables {
                writeln!(f, "    {}: {} = {}", variable.name, variable.type_name, variable.value)?;
            }
        }
        Ok(())
    }
}

/// A log being replayed with a set of breakpoints.
pub struct ReplaySession {
    ctx: LogContext,
    breakpoints: LineBreakpoints,
    stops: usize,
}

impl ReplaySession {
    /// Session over `ctx`, which must not have been advanced yet.
    pub fn new(ctx: LogContext, breakpoints: LineBreakpoints) -> Self {
        Self { ctx, breakpoints, stops: 0 }
    }

    /// The replayed log.
    pub fn context(&self) -> &LogContext {
        &self.ctx
    }

    /// Number of stops reported so far.
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// Enter the log; returns the entry stop when `stop_on_entry` is set.
    pub fn start(&mut self, stop_on_entry: bool) -> Option<Stop> {
        self.ctx.advance();
        stop_on_entry.then(|| self.stop(StopReason::Entry))
    }

    /// Advance to the next stop, or `None` once the trace is exhausted.
    pub fn next_stop(&mut self) -> Option<Stop> {
        loop {
            self.ctx.advance();
            if !self.ctx.has_log_lines() {
                debug!(stops = self.stops, "Trace exhausted");
                return None;
            }
            if self.is_at_breakpoint() {
                return Some(self.stop(StopReason::Breakpoint));
            }
            if self.breakpoints.is_empty() {
                return Some(self.stop(StopReason::Step));
            }
        }
    }

    /// Step by call depth, or `None` once the trace is exhausted.
    ///
    /// A breakpoint passed on the way ends the step early.
    pub fn step(&mut self, kind: StepKind) -> Option<Stop> {
        let prev = self.ctx.num_frames();
        loop {
            self.ctx.advance();
            if !self.ctx.has_log_lines() {
                debug!(stops = self.stops, ?kind, "Trace exhausted");
                return None;
            }
            if kind.completes(prev, self.ctx.num_frames()) {
                return Some(self.stop(StopReason::Step));
            }
            if self.is_at_breakpoint() {
                return Some(self.stop(StopReason::Breakpoint));
            }
        }
    }

    /// Replay the whole log, handing every stop to `on_stop`.
    ///
    /// Each move is a [`step`](Self::step) of `step_kind` when given, else
    /// [`next_stop`](Self::next_stop). Stops after `max_stops` stops when
    /// given. Returns the number of stops.
    pub fn run<E>(
        &mut self,
        stop_on_entry: bool,
        step_kind: Option<StepKind>,
        max_stops: Option<usize>,
        mut on_stop: impl FnMut(&Stop) -> Result<(), E>,
    ) -> Result<usize, E> {
        let limit = max_stops.unwrap_or(usize::MAX);
        if let Some(stop) = self.start(stop_on_entry) {
            on_stop(&stop)?;
        }
        while self.stops < limit {
            let next = match step_kind {
                Some(kind) => self.step(kind),
                None => self.next_stop(),
            };
            let Some(stop) = next else {
                break;
            };
            on_stop(&stop)?;
        }
        Ok(self.stops)
    }

    /// Whether replay paused on a statement carrying a breakpoint.
    fn is_at_breakpoint(&self) -> bool {
        if self.breakpoints.is_empty()
            || !matches!(self.ctx.current_state(), Some(ParserState::StatementExecute(_)))
        {
            return false;
        }
        self.ctx
            .top_frame()
            .is_some_and(|frame| self.breakpoints.is_line_breakable(&frame.source, frame.line))
    }

    fn stop(&mut self, reason: StopReason) -> Stop {
        self.stops += 1;
        let overlay = self.ctx.apply_overlay_for_top_frame();
        let frames: Vec<StackFrame> = self.ctx.frames().iter().rev().cloned().collect();
        let scopes = match frames.first() {
            Some(top) => self
                .ctx
                .scopes(top.id)
                .into_iter()
                .map(|scope| (scope.kind, self.ctx.variables(scope.handle)))
                .filter(|(_, variables)| !variables.is_empty())
                .collect(),
            None => Vec::new(),
        };
        debug!(stop = self.stops, %reason, overlay, frames = frames.len(), "Stopped");
        Stop { index: self.stops, reason, overlay, frames, scopes }
    }
}
