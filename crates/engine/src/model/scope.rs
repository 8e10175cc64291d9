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

use super::VarId;

/// Index of a static scope in [`StaticScopes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticScopeId(usize);

/// Statics of one class, by name.
pub type StaticScope = IndexMap<String, VarId>;

/// Static variables per class.
///
/// Statics outlive the frames that declared them. Every frame of a class holds
/// the [`StaticScopeId`] registered for that class, so all of them read and
/// write the same scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticScopes {
    scopes: Vec<StaticScope>,
    by_class: IndexMap<String, StaticScopeId>,
}

impl StaticScopes {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope registered for `class_name`, if any.
    pub fn scope_for_class(&self, class_name: &str) -> Option<StaticScopeId> {
        self.by_class.get(class_name).copied()
    }

    /// Whether `class_name` has a registered scope.
    pub fn has_class(&self, class_name: &str) -> bool {
        self.by_class.contains_key(class_name)
    }

    /// Scope registered for `class_name`, registering a fresh one if needed.
    pub fn register(&mut self, class_name: &str) -> StaticScopeId {
        if let Some(id) = self.scope_for_class(class_name) {
            return id;
        }
        let id = self.create_detached();
        self.by_class.insert(class_name.to_string(), id);
        id
    }

    /// A fresh scope not registered under any class, for frames without one.
    pub fn create_detached(&mut self) -> StaticScopeId {
        let id = StaticScopeId(self.scopes.len());
        self.scopes.push(StaticScope::new());
        id
    }

    /// Borrow a scope.
    pub fn get(&self, id: StaticScopeId) -> &StaticScope {
        &self.scopes[id.0]
    }

    /// Borrow a scope mutably.
    pub fn get_mut(&mut self, id: StaticScopeId) -> &mut StaticScope {
        &mut self.scopes[id.0]
    }

    /// Statics of `class_name`, if the class is known.
    pub fn statics_for(&self, class_name: &str) -> Option<&StaticScope> {
        self.scope_for_class(class_name).map(|id| self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariableStore;

    #[test]
    fn test_register_shares_scope() {
        tdb_common::logging::ensure_test_logging(None);
        let mut store = VariableStore::new();
        let mut scopes = StaticScopes::new();
        let first = scopes.register("Foo");
        let second = scopes.register("Foo");
        assert_eq!(first, second);

        let count = store.declare("count", "Integer");
        scopes.get_mut(first).insert("count".to_string(), count);
        assert_eq!(scopes.get(second).get("count"), Some(&count));
        assert_eq!(scopes.statics_for("Foo").map(|s| s.len()), Some(1));
        assert!(scopes.statics_for("Bar").is_none());

        let detached = scopes.create_detached();
        assert_ne!(detached, first);
        assert!(!scopes.has_class("Bar"));
    }
}
