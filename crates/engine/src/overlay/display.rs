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

//! Display values of reference bindings.
//!
//! A reference binding shows a summary of its children: `(a, b)` for lists
//! and sets, `{k=v}` for maps and `Type:{field=value}` for objects. Object
//! graphs may be cyclic, so a reference already being rendered higher up
//! the same path prints as `already output`.

use std::collections::HashSet;

use itertools::Itertools;

use crate::{
    constants::{
        is_collection_type, is_list_or_set_type, is_string_type, ALREADY_OUTPUT, KEY_VALUE_PAIR,
        KEY_VALUE_PAIR_KEY, KEY_VALUE_PAIR_VALUE,
    },
    VarId, VariableStore,
};

/// Display value of `var` computed from its children.
///
/// Bindings without a reference, and strings, show their stored value.
pub fn display_value(store: &VariableStore, var: VarId) -> String {
    render(store, var, &mut HashSet::new())
}

fn render(store: &VariableStore, var: VarId, visited: &mut HashSet<String>) -> String {
    let variable = store.get(var);
    let Some(reference) = variable.reference.as_ref() else {
        return variable.value.clone();
    };
    if is_string_type(&variable.type_name) {
        return variable.value.clone();
    }
    if !visited.insert(reference.clone()) {
        return ALREADY_OUTPUT.to_string();
    }

    let list = is_list_or_set_type(&variable.type_name);
    let (open, close) = if list {
        ("(".to_string(), ")")
    } else if is_collection_type(&variable.type_name) {
        ("{".to_string(), "}")
    } else {
        (format!("{}:{{", variable.type_name), "}")
    };
    let body = store
        .children(var)
        .values()
        .map(|child| render_child(store, *child, list, visited))
        .join(", ");

    visited.remove(reference);
    format!("{open}{body}{close}")
}

fn render_child(
    store: &VariableStore,
    child: VarId,
    list: bool,
    visited: &mut HashSet<String>,
) -> String {
    let variable = store.get(child);
    if variable.has_reference() {
        return render(store, child, visited);
    }
    if variable.type_name == KEY_VALUE_PAIR {
        let key = store
            .child(child, KEY_VALUE_PAIR_KEY)
            .map(|key| render(store, key, visited))
            .unwrap_or_default();
        let value = store
            .child(child, KEY_VALUE_PAIR_VALUE)
            .map(|value| render(store, value, visited))
            .unwrap_or_default();
        return format!("{key}={value}");
    }
    if list {
        variable.value.clone()
    } else {
        format!("{}={}", variable.name, variable.value)
    }
}
