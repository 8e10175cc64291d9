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

/// Delimiter between the fields of a trace line.
pub const FIELD_DELIMITER: char = '|';

/// A new unit of code (trigger, anonymous block, web service) starts.
pub const EVENT_CODE_UNIT_STARTED: &str = "CODE_UNIT_STARTED";
/// A unit of code finishes.
pub const EVENT_CODE_UNIT_FINISHED: &str = "CODE_UNIT_FINISHED";
/// A constructor is entered.
pub const EVENT_CONSTRUCTOR_ENTRY: &str = "CONSTRUCTOR_ENTRY";
/// A constructor returns.
pub const EVENT_CONSTRUCTOR_EXIT: &str = "CONSTRUCTOR_EXIT";
/// A method is entered.
pub const EVENT_METHOD_ENTRY: &str = "METHOD_ENTRY";
/// A method returns.
pub const EVENT_METHOD_EXIT: &str = "METHOD_EXIT";
/// The view layer calls into code.
pub const EVENT_VF_APEX_CALL_START: &str = "VF_APEX_CALL_START";
/// A call from the view layer returns.
pub const EVENT_VF_APEX_CALL_END: &str = "VF_APEX_CALL_END";
/// A variable comes into scope.
pub const EVENT_VARIABLE_SCOPE_BEGIN: &str = "VARIABLE_SCOPE_BEGIN";
/// A variable is assigned.
pub const EVENT_VARIABLE_ASSIGNMENT: &str = "VARIABLE_ASSIGNMENT";
/// A statement starts executing.
pub const EVENT_STATEMENT_EXECUTE: &str = "STATEMENT_EXECUTE";
/// A user debug statement printed something.
pub const EVENT_USER_DEBUG: &str = "USER_DEBUG";
/// A heap dump checkpoint was taken.
pub const EVENT_HEAP_DUMP: &str = "HEAP_DUMP";
/// Prefix of the free-form lines echoing an inline (anonymous) script.
pub const EVENT_EXECUTE_ANONYMOUS: &str = "Execute Anonymous:";

/// Signature of the frame running an inline script.
pub const EXEC_ANON_SIGNATURE: &str = "execute_anonymous_apex";
/// Type reference prefix of triggers.
pub const SFDC_TRIGGER: &str = "__sfdc_trigger/";
/// File extension of trigger sources.
pub const TRIGGER_FILE_EXTENSION: &str = ".trigger";
/// File extension of class sources.
pub const CLASS_FILE_EXTENSION: &str = ".cls";

/// Prefix of runtime addresses in heap dumps and reference keys.
pub const ADDRESS_PREFIX: &str = "0x";
/// Prefix of trigger context variable symbols in heap dumps.
pub const EXTENT_TRIGGER_PREFIX: &str = "Trigger.";
/// Type given to the synthetic key/value nodes of maps.
pub const KEY_VALUE_PAIR: &str = "KeyValuePair";
/// Name of the key child of a map key/value node.
pub const KEY_VALUE_PAIR_KEY: &str = "key";
/// Name of the value child of a map key/value node.
pub const KEY_VALUE_PAIR_VALUE: &str = "value";
/// Name of the binding pinned to the current object instance.
pub const THIS: &str = "this";
/// Display value of a declared but unassigned variable.
pub const NULL_VALUE: &str = "null";
/// Display value of a reference already printed further up the same display path.
pub const ALREADY_OUTPUT: &str = "already output";

/// Lower-cased names of the primitive types.
pub const PRIMITIVE_TYPES: [&str; 11] = [
    "blob", "boolean", "date", "datetime", "decimal", "double", "id", "integer", "long", "string",
    "time",
];

/// Whether `type_name` names a primitive type.
pub fn is_primitive_type(type_name: &str) -> bool {
    let lower = type_name.to_lowercase();
    PRIMITIVE_TYPES.contains(&lower.as_str())
}

/// Whether `type_name` is a string type.
pub fn is_string_type(type_name: &str) -> bool {
    type_name.eq_ignore_ascii_case("string")
}

/// Whether `type_name` names a map, list or set.
pub fn is_collection_type(type_name: &str) -> bool {
    let lower = type_name.to_lowercase();
    lower.starts_with("map<") || lower.starts_with("list<") || lower.starts_with("set<")
}

/// Whether `type_name` names a list or set.
pub fn is_list_or_set_type(type_name: &str) -> bool {
    let lower = type_name.to_lowercase();
    lower.starts_with("list<") || lower.starts_with("set<")
}

/// Whether `text` looks like a runtime address.
pub fn is_address(text: &str) -> bool {
    text.starts_with(ADDRESS_PREFIX)
}
