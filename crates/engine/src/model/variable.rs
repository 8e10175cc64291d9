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

use crate::constants::NULL_VALUE;

/// Index of a [`Variable`] in its [`VariableStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("var#{_0}")]
pub struct VarId(usize);

/// Index of a child collection in its [`VariableStore`].
///
/// Bindings holding the same collection id observe each other's mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("collection#{_0}")]
pub struct CollectionId(usize);

/// Ordered children of a binding, keyed by field name or index.
pub type Children = IndexMap<String, VarId>;

/// One named value: a local, a static, a member or a reference table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Name shown to the user.
    pub name: String,
    /// Declared type, empty until known.
    pub type_name: String,
    /// Display value.
    pub value: String,
    /// Reference key shared by every binding pointing at the same object.
    pub reference: Option<String>,
    /// Host-visible handle, assigned once when the binding becomes expandable.
    pub handle: Option<u32>,
    /// Child collection, possibly shared with other bindings.
    pub children: CollectionId,
}

impl Variable {
    /// Whether the binding carries a reference key.
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Handle as sent on the wire, `0` when none was assigned.
    pub fn handle_or_zero(&self) -> u32 {
        self.handle.unwrap_or(0)
    }
}

/// Arena of variables and their child collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    vars: Vec<Variable>,
    collections: Vec<Children>,
}

impl VariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a binding with its own empty child collection.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        value: impl Into<String>,
    ) -> VarId {
        let children = self.new_collection();
        let id = VarId(self.vars.len());
        self.vars.push(Variable {
            name: name.into(),
            type_name: type_name.into(),
            value: value.into(),
            reference: None,
            handle: None,
            children,
        });
        id
    }

    /// Allocate a declared but unassigned binding.
    pub fn declare(&mut self, name: impl Into<String>, type_name: impl Into<String>) -> VarId {
        self.create(name, type_name, NULL_VALUE)
    }

    /// Allocate an empty child collection.
    pub fn new_collection(&mut self) -> CollectionId {
        let id = CollectionId(self.collections.len());
        self.collections.push(Children::new());
        id
    }

    /// Borrow a binding.
    ///
    /// Ids are only minted by this store, so lookups cannot miss.
    pub fn get(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    /// Borrow a binding mutably.
    pub fn get_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0]
    }

    /// Borrow a child collection.
    pub fn collection(&self, id: CollectionId) -> &Children {
        &self.collections[id.0]
    }

    /// Borrow a child collection mutably.
    pub fn collection_mut(&mut self, id: CollectionId) -> &mut Children {
        &mut self.collections[id.0]
    }

    /// Children of a binding.
    pub fn children(&self, id: VarId) -> &Children {
        self.collection(self.get(id).children)
    }

    /// Child `name` of a binding.
    pub fn child(&self, parent: VarId, name: &str) -> Option<VarId> {
        self.children(parent).get(name).copied()
    }

    /// Child `name` of a binding, created as an untyped empty binding when missing.
    pub fn child_or_create(&mut self, parent: VarId, name: &str) -> VarId {
        if let Some(child) = self.child(parent, name) {
            return child;
        }
        let child = self.create(name, "", "");
        let collection = self.get(parent).children;
        self.collection_mut(collection).insert(name.to_string(), child);
        child
    }

    /// Make `target` observe the very same child collection as `source`.
    pub fn share_children(&mut self, target: VarId, source: VarId) {
        let collection = self.get(source).children;
        self.get_mut(target).children = collection;
    }

    /// Give `target` a fresh empty collection, ending any aliasing it took part in.
    pub fn detach_children(&mut self, target: VarId) {
        let collection = self.new_collection();
        self.get_mut(target).children = collection;
    }

    /// Empty the collection of `target` in place; every alias observes the change.
    pub fn clear_children(&mut self, target: VarId) {
        let collection = self.get(target).children;
        self.collection_mut(collection).clear();
    }

    /// Number of bindings ever allocated.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no binding was ever allocated.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_children_observe_mutations() {
        tdb_common::logging::ensure_test_logging(None);
        let mut store = VariableStore::new();
        let a = store.declare("a", "Account");
        let b = store.declare("b", "Account");
        assert_eq!(store.get(a).value, NULL_VALUE);
        assert_ne!(store.get(a).children, store.get(b).children);

        store.share_children(b, a);
        assert_eq!(store.get(a).children, store.get(b).children);

        let name = store.child_or_create(a, "Name");
        store.get_mut(name).value = "'Acme'".to_string();
        assert_eq!(store.child(b, "Name"), Some(name));
        assert_eq!(store.get(store.child(b, "Name").unwrap()).value, "'Acme'");

        store.detach_children(b);
        assert!(store.children(b).is_empty());
        assert_eq!(store.children(a).len(), 1);
    }

    #[test]
    fn test_clear_children_in_place() {
        tdb_common::logging::ensure_test_logging(None);
        let mut store = VariableStore::new();
        let a = store.create("a", "", "");
        let b = store.create("b", "", "");
        store.share_children(b, a);
        store.child_or_create(a, "x");
        store.clear_children(b);
        assert!(store.children(a).is_empty());
    }
}
