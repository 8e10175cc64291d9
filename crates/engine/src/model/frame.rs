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

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tdb_common::types::SourceLocator;

use super::{StaticScopeId, VarId};

/// One entry of the reconstructed call stack as the host sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Frame handle, also the key of its [`FrameInfo`].
    pub id: u32,
    /// Display signature, e.g. `Foo.bar(Integer)`.
    pub name: String,
    /// Where the frame's code lives.
    pub source: SourceLocator,
    /// Current line, updated by statement events.
    pub line: usize,
}

/// Per-frame scopes and bookkeeping behind a frame handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Depth of the frame when it was pushed.
    pub depth: usize,
    /// Signature the frame was entered with.
    pub signature: String,
    /// Owning class, used to share statics.
    pub class_name: String,
    /// Local variables.
    pub locals: IndexMap<String, VarId>,
    /// Statics of the owning class, shared with every frame of that class.
    pub statics: StaticScopeId,
    /// Trigger context variables, only filled by heap-dump overlays.
    pub globals: IndexMap<String, VarId>,
}

impl FrameInfo {
    /// Frame info with empty locals and globals.
    pub fn new(
        depth: usize,
        signature: impl Into<String>,
        class_name: impl Into<String>,
        statics: StaticScopeId,
    ) -> Self {
        Self {
            depth,
            signature: signature.into(),
            class_name: class_name.into(),
            locals: IndexMap::new(),
            statics,
            globals: IndexMap::new(),
        }
    }
}

/// The three scopes of a frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum ScopeKind {
    /// Locals of the frame.
    #[display("Local")]
    Local,
    /// Statics of the frame's class.
    #[display("Static")]
    Static,
    /// Trigger context variables.
    #[display("Global")]
    Global,
}

impl ScopeKind {
    /// All scopes in the order they are shown.
    pub const ALL: [Self; 3] = [Self::Local, Self::Static, Self::Global];
}

/// What a variable handle expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRef {
    /// The children of a binding.
    Binding(VarId),
    /// One scope of a frame.
    Scope {
        /// Frame handle.
        frame: u32,
        /// Which scope.
        kind: ScopeKind,
    },
}

/// A scope of a frame, ready to be sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeView {
    /// Which scope.
    pub kind: ScopeKind,
    /// Handle to expand the scope's variables.
    pub handle: u32,
}

/// A binding as sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableView {
    /// Name shown to the user.
    pub name: String,
    /// Declared type.
    pub type_name: String,
    /// Display value.
    pub value: String,
    /// Handle to expand the binding, `0` when it has none.
    pub handle: u32,
}
