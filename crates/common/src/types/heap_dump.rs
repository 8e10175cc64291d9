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

//! Wire types of heap-dump overlay payloads.
//!
//! A heap dump groups the values captured at a checkpoint into extents, one
//! per type. Every extent entry carries the runtime address of the value and,
//! for roots, the symbols (variable names) that pointed at it. Object and map
//! values come as `entry` lists; list, set and scalar values come in `value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of fetching an overlay checkpoint, as returned by the remote runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapDumpResult {
    /// The captured heap.
    #[serde(rename = "HeapDump")]
    pub heap_dump: HeapDump,
}

/// A captured heap: the extents of every type alive at the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapDump {
    /// Values grouped by type.
    #[serde(default)]
    pub extents: Vec<HeapDumpExtents>,
}

impl HeapDump {
    /// Decode either a wrapped [`HeapDumpResult`] or a bare [`HeapDump`].
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        if let Some(inner) = value.get("HeapDump") {
            return serde_json::from_value(inner.clone());
        }
        serde_json::from_value(value)
    }

    /// Decode from JSON text, see [`HeapDump::from_json`].
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }
}

/// All captured values of one type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapDumpExtents {
    /// Element type for lists, sets and map values.
    #[serde(default)]
    pub collection_type: Option<String>,
    /// Number of entries in `extent`.
    #[serde(default)]
    pub count: usize,
    /// The captured values.
    #[serde(default)]
    pub extent: Vec<HeapDumpExtent>,
    /// Total size in bytes.
    #[serde(default)]
    pub total_size: usize,
    /// Declared type, e.g. `Account` or `Map<Id,Account>`.
    pub type_name: String,
}

/// One captured value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapDumpExtent {
    /// Runtime address, e.g. `0x5f163c72`.
    pub address: String,
    /// Whether the value is held by a static.
    #[serde(default)]
    pub is_static: Option<bool>,
    /// Size in bytes.
    #[serde(default)]
    pub size: usize,
    /// Names of the variables that point at the value, if it is a root.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    /// The value itself.
    #[serde(default)]
    pub value: HeapDumpExtentValue,
}

impl HeapDumpExtent {
    /// First symbol naming this value, if any.
    pub fn first_symbol(&self) -> Option<&str> {
        self.symbols.as_ref().and_then(|symbols| symbols.first()).map(String::as_str)
    }

    /// All symbols naming this value.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().flatten().map(String::as_str)
    }
}

/// Value of a captured entry: scalars and list elements in `value`, object fields and map
/// entries in `entry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapDumpExtentValue {
    /// Scalar value, or an array of `{ "value": ... }` for lists and sets.
    #[serde(default)]
    pub value: Value,
    /// Object fields or map entries.
    #[serde(default)]
    pub entry: Option<Vec<HeapDumpEntry>>,
}

impl HeapDumpExtentValue {
    /// Elements of a list or set value.
    pub fn elements(&self) -> Vec<&Value> {
        match &self.value {
            Value::Array(items) => {
                items.iter().map(|item| item.get("value").unwrap_or(&Value::Null)).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A field of an object or an entry of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapDumpEntry {
    /// Field name, or the map key (possibly an address).
    pub key_display_value: String,
    /// Field or map value.
    pub value: HeapDumpEntryValue,
}

/// Wrapper around an entry's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapDumpEntryValue {
    /// The value, possibly an address.
    #[serde(default)]
    pub value: Value,
}

/// Text of a scalar payload value as the runtime would print it.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
