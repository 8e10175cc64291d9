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

use super::{
    FrameInfo, ScopeKind, StackFrame, StaticScopes, VarId, VariableRef, VariableStore,
    VariableView,
};
use crate::Handles;

/// Everything replay mutates: the frame stack, the variable arena, the reference
/// table, the static scopes and the handle tables.
///
/// The whole state is one value so a heap-dump overlay can back it up and
/// restore it verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayState {
    /// Variable arena.
    pub store: VariableStore,
    /// Statics per class.
    pub statics: StaticScopes,
    /// Reference key to the canonical binding for that key.
    pub refs: IndexMap<String, VarId>,
    /// Call stack, bottom first.
    pub frames: Vec<StackFrame>,
    /// Frame handle to frame scopes.
    pub frame_handles: Handles<FrameInfo>,
    /// Variable handle to what it expands to.
    pub variable_handles: Handles<VariableRef>,
}

impl ReplayState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current frame.
    pub fn top_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Scopes of the current frame.
    pub fn top_frame_info(&self) -> Option<&FrameInfo> {
        self.top_frame().and_then(|frame| self.frame_handles.get(frame.id))
    }

    /// Scopes of the current frame, mutably.
    pub fn top_frame_info_mut(&mut self) -> Option<&mut FrameInfo> {
        let id = self.top_frame()?.id;
        self.frame_handles.get_mut(id)
    }

    /// Give `var` a host-visible handle unless it already has one.
    pub fn ensure_handle(&mut self, var: VarId) -> u32 {
        if let Some(handle) = self.store.get(var).handle {
            return handle;
        }
        let handle = self.variable_handles.create(VariableRef::Binding(var));
        self.store.get_mut(var).handle = Some(handle);
        handle
    }

    /// Bindings of one scope of a frame.
    pub fn scope_bindings(&self, frame: u32, kind: ScopeKind) -> Option<Vec<VarId>> {
        let info = self.frame_handles.get(frame)?;
        let bindings = match kind {
            ScopeKind::Local => info.locals.values().copied().collect(),
            ScopeKind::Static => self.statics.get(info.statics).values().copied().collect(),
            ScopeKind::Global => info.globals.values().copied().collect(),
        };
        Some(bindings)
    }

    /// Bindings a variable handle expands to.
    pub fn expand(&self, handle: u32) -> Option<Vec<VarId>> {
        match *self.variable_handles.get(handle)? {
            VariableRef::Binding(var) => Some(self.store.children(var).values().copied().collect()),
            VariableRef::Scope { frame, kind } => self.scope_bindings(frame, kind),
        }
    }

    /// Host view of a binding.
    pub fn view(&self, var: VarId) -> VariableView {
        let variable = self.store.get(var);
        VariableView {
            name: variable.name.clone(),
            type_name: variable.type_name.clone(),
            value: variable.value.clone(),
            handle: variable.handle_or_zero(),
        }
    }
}
