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

use tracing::debug;

use crate::{FrameInfo, LogContext, StackFrame};

/// A call starts: `METHOD_ENTRY`, `CONSTRUCTOR_ENTRY`, `CODE_UNIT_STARTED` or
/// `VF_APEX_CALL_START`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    /// Signature of the callee, the last field of the event.
    pub signature: String,
}

impl FrameEntry {
    /// Build from the fields of an entry event.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        fields.last().map(|signature| Self { signature: signature.to_string() })
    }

    /// Class owning the callee: the signature without its parameter list,
    /// up to the last `.`.
    pub fn class_name(&self) -> &str {
        class_of_signature(&self.signature)
    }

    /// Push a frame for the callee. Never pauses.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        let source = ctx.locator_for_signature(&self.signature);

        let state = &mut ctx.state;
        let class_name = self.class_name();
        let statics = state.statics.register(class_name);
        let depth = state.frames.len();
        let id = state.frame_handles.create(FrameInfo::new(
            depth,
            self.signature.as_str(),
            class_name,
            statics,
        ));
        debug!(frame = id, depth, signature = %self.signature, source = %source, "Frame entry");
        state.frames.push(StackFrame { id, name: self.signature.clone(), source, line: 0 });
        false
    }
}

/// A call returns: `METHOD_EXIT`, `CONSTRUCTOR_EXIT`, `CODE_UNIT_FINISHED` or
/// `VF_APEX_CALL_END`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameExit {
    /// Signature of the returning callee, the last field of the event.
    pub signature: String,
}

impl FrameExit {
    /// Build from the fields of an exit event.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        fields.last().map(|signature| Self { signature: signature.to_string() })
    }

    /// Pop the top frame when this exit matches it. Never pauses.
    ///
    /// Exit events may carry a longer signature than their entry, so the top
    /// frame matches when its signature is a prefix of the exiting one.
    pub fn handle(&self, ctx: &mut LogContext) -> bool {
        let state = &mut ctx.state;
        let Some(info) = state.top_frame_info() else {
            debug!(signature = %self.signature, "Frame exit with no frame on the stack");
            return false;
        };
        if !self.signature.starts_with(info.signature.as_str()) {
            debug!(signature = %self.signature, top = %info.signature, "Unmatched frame exit");
            return false;
        }
        if let Some(frame) = state.frames.pop() {
            state.frame_handles.remove(frame.id);
            debug!(frame = frame.id, signature = %self.signature, "Frame exit");
        }
        false
    }
}

/// Whether a Visualforce call is a generated property getter or setter.
///
/// Those calls are not user code and would otherwise clutter the stack.
pub fn is_extraneous_vf_getter_or_setter(signature: &str) -> bool {
    signature.contains(" get(") || signature.contains(" set(")
}

/// Class part of a method signature.
pub(crate) fn class_of_signature(signature: &str) -> &str {
    let without_params = signature.split_once('(').map_or(signature, |(head, _)| head);
    without_params.rsplit_once('.').map_or(without_params, |(class, _)| class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EXEC_ANON_SIGNATURE;

    #[test]
    fn test_class_of_signature() {
        tdb_common::logging::ensure_test_logging(None);
        assert_eq!(class_of_signature("Foo.bar(Integer)"), "Foo");
        assert_eq!(class_of_signature("ns.Foo.bar(Map<String,Foo.Bar>)"), "ns.Foo");
        assert_eq!(class_of_signature("Foo.Inner.<init>()"), "Foo.Inner");
        assert_eq!(class_of_signature("signature"), "signature");
        assert_eq!(class_of_signature(EXEC_ANON_SIGNATURE), EXEC_ANON_SIGNATURE);
    }

    #[test]
    fn test_getter_setter_detection() {
        tdb_common::logging::ensure_test_logging(None);
        assert!(is_extraneous_vf_getter_or_setter("MyController get(name)"));
        assert!(is_extraneous_vf_getter_or_setter("MyController set(name)"));
        assert!(!is_extraneous_vf_getter_or_setter("MyController invoke(save)"));
    }

    #[test]
    fn test_from_fields_takes_last_field() {
        tdb_common::logging::ensure_test_logging(None);
        let entry = FrameEntry::from_fields(&["t", "METHOD_ENTRY", "[1]", "01p", "Foo.bar()"]);
        assert_eq!(entry.map(|e| e.signature), Some("Foo.bar()".to_string()));
        let exit = FrameExit::from_fields(&["t", "METHOD_EXIT", "[1]", "Foo"]);
        assert_eq!(exit.map(|e| e.signature), Some("Foo".to_string()));
    }
}
