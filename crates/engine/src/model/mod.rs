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

//! Reconstructed program state.
//!
//! Variables live in an arena ([`VariableStore`]) and refer to their children
//! through a [`CollectionId`]. Two bindings alias the same object exactly when
//! they hold the same collection id, which is how reference semantics from the
//! trace survive without any runtime pointers.
//!
//! - [`Variable`] / [`VariableStore`] - bindings and their child collections
//! - [`StaticScopes`] - statics per class, shared by every frame of that class
//! - [`StackFrame`] / [`FrameInfo`] - the call stack and per-frame scopes
//! - [`ReplayState`] - everything an overlay must be able to roll back
//! - [`literal`] - the tolerant parser for object literals in assignments

mod frame;
pub mod literal;
mod scope;
mod state;
mod variable;

pub use frame::*;
pub use scope::*;
pub use state::*;
pub use variable::*;

/// Split a dotted name at its last `.` into owner and leaf.
pub fn split_last_dot(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((owner, leaf)) => (Some(owner), leaf),
        None => (None, name),
    }
}
