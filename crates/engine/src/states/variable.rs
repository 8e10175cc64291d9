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

//! Variable declaration and assignment.
//!
//! Assignments are where aliasing happens. An assignment carrying a
//! reference key makes the target share the child collection of the
//! canonical binding for that key, so a later assignment through any alias is
//! visible through all of them.

use tracing::trace;

use crate::{
    constants::{is_address, is_collection_type, THIS},
    model::literal::Literal,
    split_last_dot, LogContext, ReplayState, VarId,
};

/// A declaration: `VARIABLE_SCOPE_BEGIN|[N]|name|type|isRef|isStatic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBegin {
    /// Declared name; statics may be qualified with their class.
    pub name: String,
    /// Declared type.
    pub type_name: String,
    /// Whether the variable is a static of its class.
    pub is_static: bool,
}

impl VariableBegin {
    /// Build from the fields of the event.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < 5 {
            return None;
        }
        Some(Self {
            name: fields[3].to_string(),
            type_name: fields[4].to_string(),
            is_static: fields.get(6).is_some_and(|field| *field == "true"),
        })
    }

    /// Declare the variable. Never pauses.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        declare(&mut ctx.state, self);
        false
    }
}

/// An assignment: `VARIABLE_ASSIGNMENT|[N]|name|value[|ref]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAssignment {
    /// Assigned name, possibly dotted.
    pub name: String,
    /// Value exactly as logged.
    pub value: String,
    /// Reference key of the assigned object, when the log carries one.
    pub reference: Option<String>,
}

impl VariableAssignment {
    /// Build from the fields of the event.
    ///
    /// A value may itself contain `|`, so the reference is only split off when
    /// the last field looks like an address.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < 5 {
            return None;
        }
        let name = fields[3].to_string();
        let last = fields[fields.len() - 1];
        if fields.len() >= 6 && is_address(last) {
            Some(Self {
                name,
                value: fields[4..fields.len() - 1].join("|"),
                reference: Some(last.to_string()),
            })
        } else {
            Some(Self { name, value: fields[4..].join("|"), reference: None })
        }
    }

    /// Apply the assignment. Never pauses.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        assign(&mut ctx.state, self);
        false
    }
}

/// Declare a local or static binding with value `null`.
///
/// A static is (re)declared in the scope of its class, replacing any earlier
/// binding. A local is only declared once per frame.
pub fn declare(state: &mut ReplayState, begin: &VariableBegin) {
    let ReplayState { store, statics, frames, frame_handles, .. } = state;
    let Some(info) = frames.last().and_then(|frame| frame_handles.get_mut(frame.id)) else {
        trace!(name = %begin.name, "Declaration without a frame");
        return;
    };

    if begin.is_static {
        let (owner, leaf) = split_last_dot(&begin.name);
        let scope = match owner {
            Some(class_name) => statics.register(class_name),
            None => info.statics,
        };
        let var = store.declare(leaf, begin.type_name.as_str());
        statics.get_mut(scope).insert(leaf.to_string(), var);
        trace!(name = %begin.name, type_name = %begin.type_name, "Static declared");
    } else if !info.locals.contains_key(&begin.name) {
        let var = store.declare(begin.name.as_str(), begin.type_name.as_str());
        info.locals.insert(begin.name.clone(), var);
        trace!(name = %begin.name, type_name = %begin.type_name, "Local declared");
    }
}

/// Apply an assignment to the state.
pub fn assign(state: &mut ReplayState, assignment: &VariableAssignment) {
    let (owner, leaf) = split_last_dot(&assignment.name);
    let (target, nested) = match owner {
        Some(class_name) if state.statics.has_class(class_name) => (
            state.statics.statics_for(class_name).and_then(|scope| scope.get(leaf)).copied(),
            false,
        ),
        // An unknown owner is an object path; the leaf still rebinds a
        // local of that name when the frame has one.
        Some(_) => match lookup_local(state, leaf) {
            Some(local) => (Some(local), false),
            None => (None, true),
        },
        None => (lookup_unqualified(state, leaf), false),
    };
    let literal = Literal::parse(&assignment.value);

    if let Some(target) = target {
        let variable = state.store.get(target);
        if is_collection_type(&variable.type_name) || matches!(literal, Literal::Array(_)) {
            state.store.get_mut(target).value = assignment.value.clone();
            return;
        }
    }

    let Some(reference) = assignment.reference.as_deref() else {
        if let Some(target) = target {
            state.store.get_mut(target).value = assignment.value.clone();
        }
        return;
    };

    let entry = reference_entry(state, reference);
    if nested {
        let child = state.store.child_or_create(entry, leaf);
        decode_into(state, child, &literal);
        state.store.get_mut(entry).value.clear();
    } else if literal.is_empty_object() {
        state.store.get_mut(entry).value.clear();
    } else if let Literal::Object(fields) = &literal {
        decode_fields(state, entry, fields);
        state.store.get_mut(entry).value.clear();
    } else {
        match literal.as_key().and_then(|key| state.refs.get(key).copied()) {
            Some(known) if known != entry => state.store.share_children(entry, known),
            Some(_) => {}
            None => state.store.get_mut(entry).value = literal.display(),
        }
    }

    if let Some(target) = target {
        join(state, target, entry, reference, leaf);
    }
}

/// Local `name` of the top frame.
fn lookup_local(state: &ReplayState, name: &str) -> Option<VarId> {
    state.top_frame_info()?.locals.get(name).copied()
}

/// Local `name` of the top frame, else the static `name` of its class.
fn lookup_unqualified(state: &ReplayState, name: &str) -> Option<VarId> {
    let info = state.top_frame_info()?;
    info.locals.get(name).or_else(|| state.statics.get(info.statics).get(name)).copied()
}

/// Canonical binding for `reference`, created on first sight.
fn reference_entry(state: &mut ReplayState, reference: &str) -> VarId {
    if let Some(entry) = state.refs.get(reference) {
        return *entry;
    }
    let entry = state.store.create("", "", "");
    state.store.get_mut(entry).reference = Some(reference.to_string());
    state.refs.insert(reference.to_string(), entry);
    entry
}

/// Bind `target` to the object behind `reference`.
///
/// A `this` binding keeps the object it was first joined to.
fn join(state: &mut ReplayState, target: VarId, entry: VarId, reference: &str, leaf: &str) {
    if leaf == THIS && state.store.get(target).has_reference() {
        return;
    }
    let value = state.store.get(entry).value.clone();
    state.store.share_children(target, entry);
    let variable = state.store.get_mut(target);
    variable.reference = Some(reference.to_string());
    variable.value = value;
    state.ensure_handle(target);
    trace!(reference, name = %state.store.get(target).name, "Joined reference");
}

/// Decode a literal into an existing child binding.
fn decode_into(state: &mut ReplayState, child: VarId, literal: &Literal) {
    let known = literal.as_key().and_then(|key| state.refs.get(key).map(|entry| (key, *entry)));
    if let Some((key, entry)) = known {
        link(state, child, entry, key);
        return;
    }
    match literal {
        Literal::Object(fields) => {
            state.store.get_mut(child).value.clear();
            state.ensure_handle(child);
            decode_fields(state, child, fields);
        }
        other => state.store.get_mut(child).value = other.display(),
    }
}

/// Decode every field of an object literal into children of `parent`.
fn decode_fields(state: &mut ReplayState, parent: VarId, fields: &[(String, Literal)]) {
    for (key, value) in fields {
        let child = state.store.child_or_create(parent, key);
        decode_into(state, child, value);
    }
}

/// Make `child` an alias of the canonical binding `known` for `key`.
fn link(state: &mut ReplayState, child: VarId, known: VarId, key: &str) {
    state.store.share_children(child, known);
    let (value, type_name) = {
        let canonical = state.store.get(known);
        (canonical.value.clone(), canonical.type_name.clone())
    };
    let variable = state.store.get_mut(child);
    variable.reference = Some(key.to_string());
    variable.value = value;
    if variable.type_name.is_empty() {
        variable.type_name = type_name;
    }
    state.ensure_handle(child);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameInfo, StackFrame};

    fn state_with_frame(class_name: &str) -> ReplayState {
        let mut state = ReplayState::new();
        let statics = state.statics.register(class_name);
        let signature = format!("{class_name}.run()");
        let id = state.frame_handles.create(FrameInfo::new(0, signature.as_str(), class_name, statics));
        state.frames.push(StackFrame { id, name: signature, source: Default::default(), line: 0 });
        state
    }

    fn begin(name: &str, type_name: &str, is_static: bool) -> VariableBegin {
        VariableBegin { name: name.into(), type_name: type_name.into(), is_static }
    }

    fn assignment(name: &str, value: &str, reference: Option<&str>) -> VariableAssignment {
        VariableAssignment {
            name: name.into(),
            value: value.into(),
            reference: reference.map(Into::into),
        }
    }

    fn local(state: &ReplayState, name: &str) -> VarId {
        state.top_frame_info().and_then(|info| info.locals.get(name)).copied().unwrap()
    }

    #[test]
    fn test_assignment_fields() {
        tdb_common::logging::ensure_test_logging(None);
        let fields = ["t", "VARIABLE_ASSIGNMENT", "[4]", "this", "{}", "0x1a2b"];
        let parsed = VariableAssignment::from_fields(&fields).unwrap();
        assert_eq!(parsed, assignment("this", "{}", Some("0x1a2b")));

        let fields = ["t", "VARIABLE_ASSIGNMENT", "[4]", "s", "a", "b"];
        let parsed = VariableAssignment::from_fields(&fields).unwrap();
        assert_eq!(parsed, assignment("s", "a|b", None));

        assert!(VariableAssignment::from_fields(&["t", "VARIABLE_ASSIGNMENT", "[4]", "s"]).is_none());
    }

    #[test]
    fn test_begin_fields() {
        tdb_common::logging::ensure_test_logging(None);
        let fields = ["t", "VARIABLE_SCOPE_BEGIN", "[2]", "Foo.count", "Integer", "false", "true"];
        assert_eq!(VariableBegin::from_fields(&fields), Some(begin("Foo.count", "Integer", true)));
        let fields = ["t", "VARIABLE_SCOPE_BEGIN", "[2]", "i", "Integer"];
        assert_eq!(VariableBegin::from_fields(&fields), Some(begin("i", "Integer", false)));
    }

    #[test]
    fn test_duplicate_local_declaration_is_ignored() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("Foo");
        declare(&mut state, &begin("i", "Integer", false));
        let first = local(&state, "i");
        declare(&mut state, &begin("i", "Integer", false));
        assert_eq!(local(&state, "i"), first);
    }

    #[test]
    fn test_static_redeclaration_replaces() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("Foo");
        declare(&mut state, &begin("Foo.count", "Integer", true));
        assign(&mut state, &assignment("Foo.count", "5", None));
        declare(&mut state, &begin("Foo.count", "Integer", true));
        let count = state.statics.statics_for("Foo").and_then(|s| s.get("count")).copied().unwrap();
        assert_eq!(state.store.get(count).value, "null");
    }

    #[test]
    fn test_this_then_nested_field() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("MyObject");
        declare(&mut state, &begin("this", "MyObject", false));
        assign(&mut state, &assignment("this", "{}", Some("0x37e2e22e")));
        assign(&mut state, &assignment("this.s", "\"MyObject.s\"", Some("0x37e2e22e")));

        let this = local(&state, "this");
        let variable = state.store.get(this);
        assert_eq!(variable.value, "");
        assert_eq!(variable.reference.as_deref(), Some("0x37e2e22e"));
        assert!(variable.handle.is_some());

        let s = state.store.child(this, "s").unwrap();
        assert_eq!(state.store.get(s).value, "'MyObject.s'");
        assert_eq!(state.store.get(s).handle, None);
    }

    #[test]
    fn test_dotted_name_prefers_matching_local() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("MyObject");
        declare(&mut state, &begin("this", "MyObject", false));
        declare(&mut state, &begin("count", "Integer", false));
        assign(&mut state, &assignment("this", "{}", Some("0x1")));

        // `Unknown` is no class, but `count` is a local of the frame.
        assign(&mut state, &assignment("Unknown.count", "5", None));
        assert_eq!(state.store.get(local(&state, "count")).value, "5");
        assert!(state.store.child(local(&state, "this"), "count").is_none());

        // Without a matching local the leaf lands under the object.
        assign(&mut state, &assignment("this.total", "7", Some("0x1")));
        let this = local(&state, "this");
        let total = state.store.child(this, "total").unwrap();
        assert_eq!(state.store.get(total).value, "7");
        assert!(state.top_frame_info().is_some_and(|info| !info.locals.contains_key("total")));
    }

    #[test]
    fn test_this_is_not_rebound() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("MyObject");
        declare(&mut state, &begin("this", "MyObject", false));
        assign(&mut state, &assignment("this", "{}", Some("0x1")));
        assign(&mut state, &assignment("this", "{}", Some("0x2")));
        let this = local(&state, "this");
        assert_eq!(state.store.get(this).reference.as_deref(), Some("0x1"));
    }

    #[test]
    fn test_collection_value_is_kept_raw() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("Foo");
        declare(&mut state, &begin("amap", "Map<Integer,Account>", false));
        let raw = r#"{"1":{"Name":"a"}}"#;
        assign(&mut state, &assignment("amap", raw, Some("0xabc")));
        let amap = state.store.get(local(&state, "amap"));
        assert_eq!(amap.value, raw);
        assert_eq!(amap.reference, None);
        assert_eq!(amap.handle, None);
        assert!(state.refs.is_empty());
    }

    #[test]
    fn test_scalar_without_reference() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("Foo");
        declare(&mut state, &begin("i", "Integer", false));
        assign(&mut state, &assignment("i", "0", None));
        assert_eq!(state.store.get(local(&state, "i")).value, "0");
    }

    #[test]
    fn test_nested_object_literal() {
        tdb_common::logging::ensure_test_logging(None);
        let mut state = state_with_frame("Foo");
        declare(&mut state, &begin("acc", "Account", false));
        let value = r#"{"Name":"Acme","Owner":{"Alias":"jdoe"},"Other":"0x37e2e22e"}"#;
        assign(&mut state, &assignment("acc", value, Some("0x10")));

        let acc = local(&state, "acc");
        assert!(state.store.get(acc).handle.is_some());
        let name = state.store.child(acc, "Name").unwrap();
        assert_eq!(state.store.get(name).value, "'Acme'");
        let owner = state.store.child(acc, "Owner").unwrap();
        assert!(state.store.get(owner).handle.is_some());
        let alias = state.store.child(owner, "Alias").unwrap();
        assert_eq!(state.store.get(alias).value, "'jdoe'");
        assert_eq!(state.store.get(alias).handle, None);
        let other = state.store.child(acc, "Other").unwrap();
        assert_eq!(state.store.get(other).value, "'0x37e2e22e'");
    }
}
