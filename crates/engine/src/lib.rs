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

//! TDB Engine - log replay core
//!
//! This crate replays a finished execution trace line by line and rebuilds
//! the call stack and the variable state that existed at every step, so a
//! debugger front-end can offer stepping over a program that is no longer
//! running.
//!
//! # Components
//!
//! - [`LogContext`] - the orchestrator owning the trace, the read position
//!   and the reconstructed [`ReplayState`]
//! - [`ParserState`] - one variant per trace event kind, each with its own
//!   handler deciding whether replay pauses
//! - [`model`] - the aliasing-aware variable arena, static scopes and frames
//! - [`overlay`] - heap-dump overlays applied over the reconstructed state
//!   with full rollback
//! - [`collaborators`] - the interfaces the host plugs in (signature
//!   resolution, breakpoints, console output, snapshot fetching)

/// Trace grammar keywords and well-known names
pub mod constants;

/// Host-visible identity handle tables
pub mod handles;
pub use handles::*;

pub mod model;
pub use model::*;

pub mod states;
pub use states::*;

pub mod context;
pub use context::*;

pub mod overlay;

pub mod collaborators;
pub use collaborators::*;

mod config;
pub use config::*;

mod error;
pub use error::*;
