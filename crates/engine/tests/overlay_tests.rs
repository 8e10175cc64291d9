use serde_json::{json, Value};
use tdb_common::types::{HeapDump, SourceLocator};
use tdb_engine::{
    overlay::display_value, LogContext, ReplayConfig, ScopeKind, TyperefResolver, VariableView,
};
use tracing::info;

const HEADER: &str = "43.0 APEX_CODE,FINEST;APEX_PROFILING,INFO;VISUALFORCE,FINER;";
const LONG_STRING: &str =
    "This is a longer string that will certainly get truncated until we hit a checkpoint and inspect it_extra";

fn context(trace: &[&str]) -> LogContext {
    let lines = std::iter::once(HEADER).chain(trace.iter().copied()).map(ToString::to_string).collect();
    LogContext::new(ReplayConfig::default().with_log_path("/logs/overlay.log"), lines)
}

/// Replay a `Foo.run()` frame that stops at the checkpoint on line 10.
fn stopped_at_checkpoint(declarations: &[&str], payload: Value) -> LogContext {
    let mut trace = vec!["t|METHOD_ENTRY|[1]|01p000000000001|Foo.run()"];
    trace.extend_from_slice(declarations);
    trace.extend_from_slice(&[
        "t|HEAP_DUMP|[10]|07nxx0000000001|Foo|ns|10",
        "t|STATEMENT_EXECUTE|[10]",
        "t|STATEMENT_EXECUTE|[11]",
        "t|METHOD_EXIT|[1]|Foo.run()",
    ]);
    let mut ctx = context(&trace);
    assert!(ctx.scan_for_heap_dumps());
    let dump = HeapDump::from_json(payload).expect("payload decodes");
    assert!(ctx.set_heap_dump_payload("07nxx0000000001", dump));

    ctx.advance();
    ctx.advance();
    assert_eq!(ctx.top_frame().map(|frame| frame.line), Some(10));
    ctx
}

fn scope(ctx: &mut LogContext, kind: ScopeKind) -> Vec<VariableView> {
    let frame = ctx.top_frame().map(|frame| frame.id).expect("a frame");
    let handle = ctx
        .scopes(frame)
        .into_iter()
        .find(|scope| scope.kind == kind)
        .map(|scope| scope.handle)
        .expect("scope");
    ctx.variables(handle)
}

fn find<'a>(views: &'a [VariableView], name: &str) -> &'a VariableView {
    views.iter().find(|view| view.name == name).unwrap_or_else(|| panic!("no variable {name}"))
}

fn field(name: &str, value: Value) -> Value {
    json!({ "keyDisplayValue": name, "value": { "value": value } })
}

fn strings() -> Value {
    json!({
        "collectionType": null,
        "typeName": "String",
        "extent": [
            { "address": "0x47a32f5b", "symbols": ["theString"], "value": { "value": LONG_STRING } },
            { "address": "0x6cda5efc", "symbols": null, "value": { "value": "9/13/2018" } }
        ]
    })
}

fn nested_refs() -> Value {
    json!({
        "HeapDump": {
            "extents": [{
                "collectionType": null,
                "typeName": "NonStaticClassWithVariablesToInspect",
                "extent": [{
                    "address": "0x3557adc7",
                    "symbols": ["foo"],
                    "value": { "entry": [
                        field("innerVariable", json!("0x55260a7a")),
                        field("MyBoolean", json!(false)),
                        field("MyDate", json!("Thu Sep 13 00:00:00 GMT 2018")),
                        field("MyDouble", json!(4.37559)),
                        field("MyInteger", json!(10)),
                        field("MyLong", json!(4271993)),
                        field("MyString", json!("0x47a32f5b"))
                    ]}
                }, {
                    "address": "0x55260a7a",
                    "symbols": null,
                    "value": { "entry": [
                        field("innerVariable", Value::Null),
                        field("MyBoolean", json!(true)),
                        field("MyDate", json!("Thu Sep 13 00:00:00 GMT 2018")),
                        field("MyDouble", json!(3.14159)),
                        field("MyInteger", json!(5)),
                        field("MyLong", json!(4271990)),
                        field("MyString", json!("0x6cda5efc"))
                    ]}
                }]
            }, strings()]
        }
    })
}

fn circular_refs() -> Value {
    json!({
        "extents": [{
            "collectionType": null,
            "typeName": "CircularReference",
            "extent": [{
                "address": "0x717304ef",
                "symbols": ["cf1"],
                "value": { "entry": [
                    field("cfList", json!("0x614edc98")),
                    field("someInt", json!(5))
                ]}
            }]
        }, {
            "collectionType": "CircularReference",
            "typeName": "List<CircularReference>",
            "extent": [{
                "address": "0x614edc98",
                "symbols": null,
                "value": { "value": [{ "value": "0x717304ef" }] }
            }]
        }]
    })
}

fn scalar_root(symbol: &str) -> Value {
    json!({
        "extents": [{
            "collectionType": null,
            "typeName": "Integer",
            "extent": [{
                "address": "0xfoo",
                "isStatic": false,
                "symbols": [symbol],
                "value": { "value": 5 }
            }]
        }]
    })
}

fn account(address: &str, id: &str, name: &str) -> Value {
    json!({
        "address": address,
        "symbols": null,
        "value": { "entry": [field("Id", json!(id)), field("Name", json!(name))] }
    })
}

fn trigger_context() -> Value {
    json!({
        "extents": [{
            "collectionType": null,
            "typeName": "Account",
            "extent": [
                account("0x5f163c72", "001xx000003Dv3YAAS", "okToDelete0"),
                account("0xf1fabe", "001xx000003Dv3ZAAS", "okToDelete1")
            ]
        }, {
            "collectionType": "Account",
            "typeName": "List<Account>",
            "extent": [{
                "address": "0x7ac2777",
                "symbols": ["Trigger.new"],
                "value": { "value": [{ "value": "0x5f163c72" }, { "value": "0xf1fabe" }] }
            }]
        }, {
            "collectionType": "Account",
            "typeName": "Map<Id,Account>",
            "extent": [{
                "address": "0x4266fa43",
                "symbols": ["Trigger.newmap"],
                "value": { "entry": [
                    { "keyDisplayValue": "0x5c288675", "value": { "value": "0x5f163c72" } },
                    { "keyDisplayValue": "0x5db01cb1", "value": { "value": "0xf1fabe" } }
                ]}
            }]
        }, {
            "collectionType": null,
            "typeName": "Boolean",
            "extent": [{
                "address": "0x10954bcf",
                "symbols": ["Trigger.isbefore", "Trigger.isdelete", "Trigger.isundelete", "Trigger.isupdate"],
                "value": { "value": false }
            }, {
                "address": "0x63903543",
                "symbols": ["Trigger.isafter", "Trigger.isinsert"],
                "value": { "value": true }
            }]
        }, {
            "collectionType": null,
            "typeName": "String",
            "extent": [
                { "address": "0x5c288675", "symbols": null, "value": { "value": "001xx000003Dv3YAAS" } },
                { "address": "0x5db01cb1", "symbols": null, "value": { "value": "001xx000003Dv3ZAAS" } }
            ]
        }]
    })
}

const FOO_LOCAL: &str = "t|VARIABLE_SCOPE_BEGIN|[2]|foo|NonStaticClassWithVariablesToInspect|true|false";

#[test]
fn test_nested_references_follow_the_chain() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = stopped_at_checkpoint(&[FOO_LOCAL], nested_refs());
    assert!(ctx.apply_overlay());
    assert!(ctx.has_active_overlay());

    let locals = scope(&mut ctx, ScopeKind::Local);
    let foo = find(&locals, "foo");
    assert_eq!(foo.type_name, "NonStaticClassWithVariablesToInspect");
    assert_ne!(foo.handle, 0);

    let fields = ctx.variables(foo.handle);
    assert_eq!(fields.len(), 7);
    assert_eq!(find(&fields, "MyBoolean").value, "false");
    assert_eq!(find(&fields, "MyDouble").value, "4.37559");
    assert_eq!(find(&fields, "MyLong").value, "4271993");
    assert_eq!(find(&fields, "MyString").value, format!("'{LONG_STRING}'"));

    let inner = find(&fields, "innerVariable");
    assert_eq!(inner.type_name, "NonStaticClassWithVariablesToInspect");
    let inner_fields = ctx.variables(inner.handle);
    assert_eq!(inner_fields.len(), 7);
    assert_eq!(find(&inner_fields, "MyBoolean").value, "true");
    assert_eq!(find(&inner_fields, "MyInteger").value, "5");
    assert_eq!(find(&inner_fields, "MyString").value, "'9/13/2018'");
    assert_eq!(find(&inner_fields, "innerVariable").value, "null");

    let state = ctx.state();
    assert_eq!(state.refs.len(), 2);
    let outer = state.refs["0x3557adc7"];
    assert!(display_value(&state.store, outer).starts_with("NonStaticClassWithVariablesToInspect:{"));
}

#[test]
fn test_circular_references_print_once() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = stopped_at_checkpoint(
        &[
            "t|VARIABLE_SCOPE_BEGIN|[2]|cf1|CircularReference|true|false",
            "t|VARIABLE_ASSIGNMENT|[2]|cf1|{\"someInt\":5}|0x717304ef",
        ],
        circular_refs(),
    );
    assert!(ctx.apply_overlay());

    let expected = "CircularReference:{(already output), someInt=5}";
    let expected_list = "(CircularReference:{already output, someInt=5})";

    let locals = scope(&mut ctx, ScopeKind::Local);
    let cf1 = find(&locals, "cf1");
    assert_eq!(cf1.value, expected);

    let fields = ctx.variables(cf1.handle);
    assert_eq!(fields.len(), 2);
    assert_eq!(find(&fields, "someInt").value, "5");
    let list = find(&fields, "cfList");
    assert_eq!(list.value, expected_list);

    let elements = ctx.variables(list.handle);
    assert_eq!(elements.len(), 1);
    let element = find(&elements, "0");
    assert_eq!(element.value, expected);
    assert_eq!(find(&ctx.variables(element.handle), "cfList").value, expected_list);
}

#[test]
fn test_scalar_local_and_static_roots() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let declarations = [
        "t|VARIABLE_SCOPE_BEGIN|[3]|theInt|Integer|false|false",
        "t|VARIABLE_ASSIGNMENT|[3]|theInt|2",
        "t|VARIABLE_SCOPE_BEGIN|[4]|Foo.theCount|Integer|false|true",
        "t|VARIABLE_ASSIGNMENT|[4]|Foo.theCount|2",
    ];

    let mut ctx = stopped_at_checkpoint(&declarations, scalar_root("theInt"));
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Local), "theInt").value, "2");
    assert!(ctx.apply_overlay());
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Local), "theInt").value, "5");
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Static), "theCount").value, "2");

    let mut ctx = stopped_at_checkpoint(&declarations, scalar_root("Foo.theCount"));
    assert!(ctx.apply_overlay());
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Local), "theInt").value, "2");
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Static), "theCount").value, "5");
}

#[test]
fn test_revert_restores_state_exactly() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = stopped_at_checkpoint(
        &[FOO_LOCAL, "t|VARIABLE_SCOPE_BEGIN|[3]|theInt|Integer|false|false"],
        nested_refs(),
    );
    let before = ctx.state().clone();
    assert!(!ctx.revert_overlay());

    assert!(ctx.apply_overlay());
    assert_ne!(ctx.state(), &before);
    assert!(ctx.revert_overlay());
    assert_eq!(ctx.state(), &before);
    assert!(!ctx.has_active_overlay());

    // Applying twice starts from the live state both times.
    assert!(ctx.apply_overlay());
    let once = ctx.state().clone();
    assert!(ctx.apply_overlay());
    assert_eq!(ctx.state(), &once);
    assert!(ctx.revert_overlay());
    assert_eq!(ctx.state(), &before);
}

#[test]
fn test_advance_reverts_the_overlay() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = stopped_at_checkpoint(
        &["t|VARIABLE_SCOPE_BEGIN|[3]|theInt|Integer|false|false", "t|VARIABLE_ASSIGNMENT|[3]|theInt|2"],
        scalar_root("theInt"),
    );
    assert!(ctx.apply_overlay_for_top_frame());
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Local), "theInt").value, "5");

    ctx.advance();
    assert!(!ctx.has_active_overlay());
    assert_eq!(ctx.top_frame().map(|frame| frame.line), Some(11));
    assert_eq!(find(&scope(&mut ctx, ScopeKind::Local), "theInt").value, "2");

    // Line 11 carries no checkpoint.
    assert!(ctx.heap_dump_for_top_frame().is_none());
    assert!(!ctx.apply_overlay_for_top_frame());
}

#[test]
fn test_overlay_requires_a_payload() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = context(&[
        "t|METHOD_ENTRY|[1]|01p000000000001|Foo.run()",
        "t|HEAP_DUMP|[10]|07nxx0000000001|Foo|ns|10",
        "t|STATEMENT_EXECUTE|[10]",
    ]);
    assert!(ctx.scan_for_heap_dumps());
    ctx.advance();
    ctx.advance();

    assert!(ctx.heap_dump_for_top_frame().is_some());
    assert!(!ctx.apply_overlay_for_top_frame());
    assert!(!ctx.has_active_overlay());
}

#[test]
fn test_top_frame_lookup_needs_the_marker() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = stopped_at_checkpoint(&[], scalar_root("theInt"));
    assert_eq!(ctx.last_seen_heap_dump(), Some(("Foo", 10)));
    assert!(ctx.heap_dump_for_location("Foo.run()", 10).is_some());

    ctx.reset_last_seen_heap_dump();
    assert!(ctx.heap_dump_for_top_frame().is_none());
    assert!(!ctx.apply_overlay_for_top_frame());
    // The location lookup alone still finds it.
    assert!(ctx.apply_overlay());
}

#[test]
fn test_trigger_context_globals() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let resolver = TyperefResolver::new().with_typeref(
        "__sfdc_trigger/AccountTrigger",
        SourceLocator::from_path("/project/triggers/AccountTrigger.trigger"),
    );
    let mut ctx = context(&[
        "t|CODE_UNIT_STARTED|[EXTERNAL]|01q|AccountTrigger on Account trigger event BeforeInsert|__sfdc_trigger/AccountTrigger",
        "t|HEAP_DUMP|[3]|07nxx0000000002|AccountTrigger|ns|3",
        "t|STATEMENT_EXECUTE|[3]",
    ])
    .with_resolver(Box::new(resolver));
    assert!(ctx.scan_for_heap_dumps());
    let dump = HeapDump::from_json(trigger_context()).expect("payload decodes");
    assert!(ctx.set_heap_dump_payload("07nxx0000000002", dump));
    ctx.advance();
    ctx.advance();
    assert!(ctx.is_running_trigger());
    assert!(scope(&mut ctx, ScopeKind::Global).is_empty());

    assert!(ctx.apply_overlay_for_top_frame());
    let globals = scope(&mut ctx, ScopeKind::Global);
    assert_eq!(globals.len(), 8);
    assert_eq!(find(&globals, "Trigger.isbefore").value, "false");
    assert_eq!(find(&globals, "Trigger.isinsert").value, "true");
    assert_eq!(find(&globals, "Trigger.isinsert").type_name, "Boolean");

    let new = find(&globals, "Trigger.new");
    assert_eq!(new.type_name, "List<Account>");
    assert_eq!(
        new.value,
        "(Account:{Id=001xx000003Dv3YAAS, Name=okToDelete0}, Account:{Id=001xx000003Dv3ZAAS, Name=okToDelete1})"
    );
    assert_eq!(ctx.variables(new.handle).len(), 2);

    let new_map = find(&globals, "Trigger.newmap");
    assert_eq!(new_map.type_name, "Map<Id,Account>");
    let pairs = ctx.variables(new_map.handle);
    assert_eq!(pairs.len(), 2);
    let pair = find(&pairs, "'001xx000003Dv3YAAS'");
    assert_eq!(pair.type_name, "KeyValuePair");
    assert_eq!(pair.value, "Account:{Id=001xx000003Dv3YAAS, Name=okToDelete0}");

    let sides = ctx.variables(pair.handle);
    let key = find(&sides, "key");
    assert_eq!(key.type_name, "Id");
    assert_eq!(key.value, "'001xx000003Dv3YAAS'");
    let value = find(&sides, "value");
    assert_eq!(value.type_name, "Account");
    assert_eq!(ctx.variables(value.handle).len(), 2);
    assert!(ctx.state().refs.contains_key("0x5f163c72"));
}

#[test]
fn test_trigger_globals_need_a_trigger_frame() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut ctx = stopped_at_checkpoint(&[], trigger_context());
    assert!(!ctx.is_running_trigger());
    assert!(ctx.apply_overlay());
    assert!(scope(&mut ctx, ScopeKind::Global).is_empty());
}
