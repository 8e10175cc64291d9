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

//! Heap-snapshot overlays.
//!
//! A heap dump captured at a checkpoint holds the exact values alive at that
//! point, which the trace alone may only approximate. Applying an overlay
//! substitutes those values into the reconstructed state of the current
//! frame. The live state is backed up first and restored verbatim by
//! [`LogContext::revert_overlay`], which [`LogContext::advance`] calls before
//! consuming any further line.
//!
//! The payload is applied in passes:
//!
//! 1. string extents form an address to text table
//! 2. every entry of a non-primitive extent refreshes the reference binding
//!    for its address; address-valued children are staged
//! 3. staged children are resolved to strings, references or raw addresses
//! 4. symbols name roots: locals and statics of the current frame take the
//!    entry's value
//! 5. inside a trigger, `Trigger.*` symbols become global bindings
//! 6. display values of every touched reference binding are recomputed

mod display;

pub use display::*;

use std::collections::HashMap;

use serde_json::Value;
use tdb_common::types::{value_text, HeapDump, HeapDumpExtent, HeapDumpExtents};
use tracing::{debug, trace};

use crate::{
    constants::{
        is_address, is_collection_type, is_primitive_type, is_string_type, EXTENT_TRIGGER_PREFIX,
        KEY_VALUE_PAIR, KEY_VALUE_PAIR_KEY, KEY_VALUE_PAIR_VALUE,
    },
    split_last_dot, LogContext, ReplayState, VarId,
};

impl LogContext {
    /// Overlay the heap dump captured at the current frame's position.
    ///
    /// Requires a checkpoint matching the top frame's class and line with a
    /// fetched payload; returns whether an overlay was applied. An overlay
    /// that is already active is reverted first.
    pub fn apply_overlay(&mut self) -> bool {
        self.revert_overlay();
        let Some(frame) = self.top_frame() else {
            return false;
        };
        let Some(dump) = self
            .heap_dump_for_location(&frame.name, frame.line)
            .and_then(|record| record.payload.clone())
        else {
            trace!(frame = %frame.name, line = frame.line, "No heap dump payload for frame");
            return false;
        };

        let running_trigger = self.is_running_trigger();
        self.backup = Some(self.state.clone());
        OverlayBuilder::new(&mut self.state, running_trigger).apply(&dump);
        true
    }

    /// Overlay the heap dump of the checkpoint replay just stopped at, if any.
    pub fn apply_overlay_for_top_frame(&mut self) -> bool {
        if self.heap_dump_for_top_frame().is_none() {
            return false;
        }
        self.apply_overlay()
    }

    /// Restore the state saved when the active overlay was applied.
    ///
    /// Returns whether an overlay was active.
    pub fn revert_overlay(&mut self) -> bool {
        match self.backup.take() {
            Some(state) => {
                self.state = state;
                debug!("Reverted heap dump overlay");
                true
            }
            None => false,
        }
    }

    /// Whether a heap dump overlay is currently applied.
    pub fn has_active_overlay(&self) -> bool {
        self.backup.is_some()
    }
}

/// Applies one heap dump onto a replay state.
pub struct OverlayBuilder<'a> {
    state: &'a mut ReplayState,
    running_trigger: bool,
    /// String address to quoted text.
    strings: HashMap<String, String>,
    /// Children holding an address to resolve once every reference exists.
    staged: Vec<(VarId, String)>,
    /// Bindings whose display value must be recomputed.
    touched: Vec<VarId>,
    /// Map key/value nodes, renamed after display values are known.
    pairs: Vec<VarId>,
}

impl<'a> OverlayBuilder<'a> {
    /// Builder writing into `state`. Trigger context variables are only
    /// created when `running_trigger` is set.
    pub fn new(state: &'a mut ReplayState, running_trigger: bool) -> Self {
        Self {
            state,
            running_trigger,
            strings: HashMap::new(),
            staged: Vec::new(),
            touched: Vec::new(),
            pairs: Vec::new(),
        }
    }

    /// Apply every pass of `dump`.
    pub fn apply(mut self, dump: &HeapDump) {
        self.collect_strings(dump);
        for extents in dump.extents.iter().filter(|extents| !is_primitive_type(&extents.type_name)) {
            for entry in &extents.extent {
                self.refresh_reference(extents, entry);
            }
        }
        self.resolve_staged();
        for extents in &dump.extents {
            for entry in &extents.extent {
                self.update_root(extents, entry);
            }
        }
        if self.running_trigger {
            self.create_trigger_globals(dump);
        }
        self.refresh_displays();
        debug!(
            extents = dump.extents.len(),
            strings = self.strings.len(),
            touched = self.touched.len(),
            "Applied heap dump overlay"
        );
    }

    fn collect_strings(&mut self, dump: &HeapDump) {
        for extents in dump.extents.iter().filter(|extents| is_string_type(&extents.type_name)) {
            for entry in &extents.extent {
                let text = format!("'{}'", value_text(&entry.value.value));
                self.strings.insert(entry.address.clone(), text);
            }
        }
    }

    /// Refresh or create the reference binding for one extent entry.
    ///
    /// A reference already known is only updated field by field when the
    /// current frame belongs to its type; otherwise its children are rebuilt.
    fn refresh_reference(&mut self, extents: &HeapDumpExtents, entry: &HeapDumpExtent) {
        let merge = self.state.refs.contains_key(&entry.address)
            && self
                .state
                .top_frame_info()
                .is_some_and(|info| info.signature.contains(extents.type_name.as_str()));
        let var = match self.state.refs.get(&entry.address) {
            Some(var) => *var,
            None => {
                let var = self.state.store.create("", "", "");
                self.state.refs.insert(entry.address.clone(), var);
                var
            }
        };
        let variable = self.state.store.get_mut(var);
        variable.type_name = extents.type_name.clone();
        variable.reference = Some(entry.address.clone());
        if !merge {
            self.state.store.clear_children(var);
        }
        self.touched.push(var);

        let collection_type = extents.collection_type.as_deref().unwrap_or_default();
        let fields = entry.value.entry.as_deref().unwrap_or_default();
        if !is_collection_type(&extents.type_name) {
            for field in fields {
                let child = self.state.store.child_or_create(var, &field.key_display_value);
                self.assign_slot(child, &field.value.value);
            }
        } else if entry.value.entry.is_some() {
            let key_type = map_key_type(&extents.type_name, collection_type);
            for (index, field) in fields.iter().enumerate() {
                let name = format!("{KEY_VALUE_PAIR_KEY}{index}_{KEY_VALUE_PAIR_VALUE}{index}");
                let pair = self.state.store.child_or_create(var, &name);
                self.state.store.get_mut(pair).type_name = KEY_VALUE_PAIR.to_string();
                self.state.ensure_handle(pair);
                self.pairs.push(pair);

                let key = self.state.store.child_or_create(pair, KEY_VALUE_PAIR_KEY);
                self.state.store.get_mut(key).type_name = key_type.to_string();
                self.assign_slot(key, &Value::String(field.key_display_value.clone()));

                let value = self.state.store.child_or_create(pair, KEY_VALUE_PAIR_VALUE);
                self.state.store.get_mut(value).type_name = collection_type.to_string();
                self.assign_slot(value, &field.value.value);
            }
        } else {
            for (index, element) in entry.value.elements().into_iter().enumerate() {
                let child = self.state.store.child_or_create(var, &index.to_string());
                self.state.store.get_mut(child).type_name = collection_type.to_string();
                self.assign_slot(child, element);
            }
        }
    }

    /// Write one captured value into a child: strings resolve immediately,
    /// other addresses are staged, anything else is a scalar.
    fn assign_slot(&mut self, child: VarId, value: &Value) {
        match value.as_str().filter(|text| is_address(text)) {
            Some(address) => match self.strings.get(address) {
                Some(text) => {
                    let text = text.clone();
                    self.set_scalar(child, text);
                }
                None => {
                    self.state.store.get_mut(child).value = address.to_string();
                    self.staged.push((child, address.to_string()));
                }
            },
            None => self.set_scalar(child, value_text(value)),
        }
    }

    fn resolve_staged(&mut self) {
        for (child, address) in std::mem::take(&mut self.staged) {
            match self.state.refs.get(&address) {
                Some(entry) => {
                    let entry = *entry;
                    self.link(child, entry, &address);
                }
                None => {
                    trace!(address = %address, "Unresolved heap dump address");
                    self.set_scalar(child, address);
                }
            }
        }
    }

    /// Update the local or static named by an entry's first symbol.
    fn update_root(&mut self, extents: &HeapDumpExtents, entry: &HeapDumpExtent) {
        let Some(symbol) = entry.first_symbol() else {
            return;
        };
        let Some(target) = self.lookup_root(symbol) else {
            return;
        };
        self.state.store.get_mut(target).type_name = extents.type_name.clone();
        self.write_entry(target, extents, entry);
        trace!(symbol, "Updated root from heap dump");
    }

    fn lookup_root(&self, symbol: &str) -> Option<VarId> {
        let info = self.state.top_frame_info()?;
        if let Some(local) = info.locals.get(symbol) {
            return Some(*local);
        }
        let (owner, leaf) = split_last_dot(symbol);
        if let Some(var) =
            owner.and_then(|class_name| self.state.statics.statics_for(class_name)?.get(leaf))
        {
            return Some(*var);
        }
        self.state.statics.get(info.statics).get(symbol).copied()
    }

    /// Give `target` the value captured by `entry`: its string text, a link
    /// to its reference binding or its scalar text.
    fn write_entry(&mut self, target: VarId, extents: &HeapDumpExtents, entry: &HeapDumpExtent) {
        if let Some(text) = self.strings.get(&entry.address) {
            let text = text.clone();
            self.set_scalar(target, text);
            return;
        }
        let reference = self.state.refs.get(&entry.address).copied();
        match reference {
            Some(reference) if !is_primitive_type(&extents.type_name) => {
                self.link(target, reference, &entry.address);
            }
            _ => self.set_scalar(target, value_text(&entry.value.value)),
        }
    }

    /// Create a global binding for every `Trigger.*` symbol of the trigger
    /// context extents.
    fn create_trigger_globals(&mut self, dump: &HeapDump) {
        for extents in dump.extents.iter().filter(|extents| is_trigger_extent(extents)) {
            for entry in &extents.extent {
                for symbol in entry.symbols().filter(|symbol| symbol.starts_with(EXTENT_TRIGGER_PREFIX)) {
                    let var = self.state.store.create(symbol, extents.type_name.as_str(), "");
                    self.write_entry(var, extents, entry);
                    if let Some(info) = self.state.top_frame_info_mut() {
                        info.globals.insert(symbol.to_string(), var);
                    }
                }
            }
        }
    }

    /// Make `child` an alias of the reference binding `entry`.
    fn link(&mut self, child: VarId, entry: VarId, address: &str) {
        let type_name = self.state.store.get(entry).type_name.clone();
        self.state.store.share_children(child, entry);
        let variable = self.state.store.get_mut(child);
        variable.reference = Some(address.to_string());
        if variable.type_name.is_empty() {
            variable.type_name = type_name;
        }
        self.state.ensure_handle(child);
        self.touched.push(child);
    }

    /// Make `child` a plain value, ending any aliasing it took part in.
    fn set_scalar(&mut self, child: VarId, text: String) {
        if self.state.store.get(child).has_reference() {
            self.state.store.detach_children(child);
            self.state.store.get_mut(child).reference = None;
        }
        self.state.store.get_mut(child).value = text;
    }

    fn refresh_displays(&mut self) {
        let mut targets = std::mem::take(&mut self.touched);
        targets.extend(self.state.refs.values().copied());
        for var in targets {
            let variable = self.state.store.get(var);
            if !variable.has_reference() || is_string_type(&variable.type_name) {
                continue;
            }
            let display = display_value(&self.state.store, var);
            self.state.store.get_mut(var).value = display;
        }

        for pair in std::mem::take(&mut self.pairs) {
            let key = self.state.store.child(pair, KEY_VALUE_PAIR_KEY);
            let value = self.state.store.child(pair, KEY_VALUE_PAIR_VALUE);
            let key_text = key.map(|key| self.state.store.get(key).value.clone()).unwrap_or_default();
            let value_text =
                value.map(|value| self.state.store.get(value).value.clone()).unwrap_or_default();
            let node = self.state.store.get_mut(pair);
            node.name = key_text;
            node.value = value_text;
        }
    }
}

/// Key type of a map type, given the type of its values.
///
/// `Map<Id,Account>` with values `Account` has keys `Id`. Searching for the
/// value type from the end keeps nested generic keys intact.
pub fn map_key_type<'t>(type_name: &'t str, collection_type: &str) -> &'t str {
    let start = type_name.find('<').map_or(0, |index| index + 1);
    let end = type_name.rfind(&format!(",{collection_type}")).unwrap_or(type_name.len());
    type_name.get(start..end).unwrap_or_default()
}

/// Whether an extent holds trigger context variables.
fn is_trigger_extent(extents: &HeapDumpExtents) -> bool {
    (extents.type_name.eq_ignore_ascii_case("boolean") || is_collection_type(&extents.type_name))
        && extents
            .extent
            .first()
            .and_then(HeapDumpExtent::first_symbol)
            .is_some_and(|symbol| symbol.starts_with(EXTENT_TRIGGER_PREFIX))
}
