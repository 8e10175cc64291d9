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

use std::collections::BTreeMap;

/// First handle handed out by a fresh table.
pub const START_HANDLE: u32 = 1000;

/// A table of small integer handles the host uses to refer back to engine objects.
///
/// Handles grow monotonically from [`START_HANDLE`] and are never reused while the
/// table lives, so `0` is free to mean "no handle" on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Handles<T> {
    next: u32,
    items: BTreeMap<u32, T>,
}

impl<T> Default for Handles<T> {
    fn default() -> Self {
        Self { next: START_HANDLE, items: BTreeMap::new() }
    }
}

impl<T> Handles<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its new handle.
    pub fn create(&mut self, value: T) -> u32 {
        let handle = self.next;
        self.next += 1;
        self.items.insert(handle, value);
        handle
    }

    /// Look up a handle.
    pub fn get(&self, handle: u32) -> Option<&T> {
        self.items.get(&handle)
    }

    /// Look up a handle mutably.
    pub fn get_mut(&mut self, handle: u32) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    /// Drop a handle. Later handles keep their numbers.
    pub fn remove(&mut self, handle: u32) -> Option<T> {
        self.items.remove(&handle)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no handle is live.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_monotonic() {
        tdb_common::logging::ensure_test_logging(None);
        let mut handles = Handles::new();
        let a = handles.create("a");
        let b = handles.create("b");
        assert_eq!(a, START_HANDLE);
        assert_eq!(b, START_HANDLE + 1);

        assert_eq!(handles.remove(a), Some("a"));
        let c = handles.create("c");
        assert_eq!(c, START_HANDLE + 2);
        assert_eq!(handles.get(a), None);
        assert_eq!(handles.get(c), Some(&"c"));
        assert_eq!(handles.len(), 2);
    }
}
