use pretty_assertions::assert_eq;
use vela_backend::{Pointer, RtValue};
use vela_ir::{Node, NodeData, Symbol};

use crate::context::Resolve;
use crate::test_helpers::*;
use crate::CompileError;

// -- Literals --

#[test]
fn integer_literal_takes_target_type() {
    let mut s = session();
    run(&mut s, vec![vec![global("c", id("char"), int(65))]]).unwrap();
    assert_eq!(read(&s, "c"), Some(RtValue::int(8, 65)));
}

#[test]
fn large_literal_defaults_to_long_long() {
    let mut s = session();
    run(
        &mut s,
        vec![vec![
            named("big", int(5_000_000_000)),
            global("g", id("long_long"), id("big")),
        ]],
    )
    .unwrap();
    assert_eq!(read(&s, "g"), Some(RtValue::int(64, 5_000_000_000)));
}

#[test]
fn string_literal_is_char_pointer() {
    let mut s = session();
    run(
        &mut s,
        vec![vec![global(
            "greeting",
            call("v_pointer", vec![id("char")]),
            Node::string("hi"),
        )]],
    )
    .unwrap();
    assert!(matches!(
        read(&s, "greeting"),
        Some(RtValue::Ptr(Pointer::Str { offset: 0, .. }))
    ));
}

#[test]
fn char_literal_is_char32() {
    let mut s = session();
    run(&mut s, vec![vec![global("c", id("char32_t"), Node::char('A'))]]).unwrap();
    assert_eq!(read(&s, "c"), Some(RtValue::int(32, 65)));
}

#[test]
fn zero_converts_to_null_pointer() {
    let mut s = session();
    run(
        &mut s,
        vec![vec![global(
            "p",
            call("v_pointer", vec![id("int")]),
            int(0),
        )]],
    )
    .unwrap();
    assert_eq!(read(&s, "p"), Some(RtValue::Ptr(Pointer::Null)));
}

#[test]
fn char_into_pointer_is_a_mismatch() {
    let mut s = session();
    let err = run(
        &mut s,
        vec![vec![global(
            "p",
            call("v_pointer", vec![id("char")]),
            Node::char('a'),
        )]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err}");
}

// -- Conversions --

#[test]
fn integer_conversion_truncates() {
    let mut s = session();
    run(
        &mut s,
        vec![vec![global(
            "c",
            id("char"),
            call("v_as", vec![int(300), id("int")]),
        )]],
    )
    .unwrap();
    assert_eq!(read(&s, "c"), Some(RtValue::int(8, 44)));
}

#[test]
fn data_symbols_are_loaded_through_their_reference() {
    let mut s = session();
    run(
        &mut s,
        vec![
            vec![global("a", id("int"), int(7))],
            vec![global("b", id("long_long"), id("a"))],
        ],
    )
    .unwrap();
    assert_eq!(read(&s, "b"), Some(RtValue::int(64, 7)));
}

// -- Identifiers and calls --

#[test]
fn unknown_identifier_is_fatal() {
    let mut s = session();
    let err = run(&mut s, vec![vec![global("x", id("int"), id("missing"))]]).unwrap_err();
    assert!(
        matches!(err, CompileError::IdentifierNotFound { name } if name.as_str() == "missing")
    );
}

#[test]
fn type_names_are_not_values() {
    let mut s = session();
    let err = run(&mut s, vec![vec![global("x", id("int"), id("int"))]]).unwrap_err();
    assert!(matches!(err, CompileError::TypeAsValue { .. }));
}

#[test]
fn host_function_call() {
    let mut s = session();
    add_host_add(&mut s);
    run(
        &mut s,
        vec![vec![global("sum", id("int"), call("add", vec![int(2), int(3)]))]],
    )
    .unwrap();
    assert_eq!(read(&s, "sum"), Some(RtValue::int(32, 5)));
}

#[test]
fn call_arity_is_checked() {
    let mut s = session();
    add_host_add(&mut s);
    let err = run(&mut s, vec![vec![stmt(call("add", vec![int(1)]))]]).unwrap_err();
    assert!(matches!(
        err,
        CompileError::ArgumentCount {
            expected: 2,
            found: 1
        }
    ));
}

#[test]
fn calling_data_is_rejected() {
    let mut s = session();
    let err = run(
        &mut s,
        vec![
            vec![global("x", id("int"), int(1))],
            vec![stmt(call("x", vec![]))],
        ],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::NotCallable { .. }));
}

#[test]
fn variables_bind_within_a_unit() {
    let mut s = session();
    add_host_add(&mut s);
    run(
        &mut s,
        vec![vec![
            named("x", call("add", vec![int(1), int(2)])),
            global("y", id("int"), id("x")),
        ]],
    )
    .unwrap();
    assert_eq!(read(&s, "y"), Some(RtValue::int(32, 3)));

    let err = run(&mut s, vec![vec![global("z", id("int"), id("x"))]]).unwrap_err();
    assert!(matches!(err, CompileError::IdentifierNotFound { .. }));
}

// -- Type calculator --

#[test]
fn type_constructors() {
    let mut s = session();
    run(
        &mut s,
        vec![vec![
            stmt(call(
                "v_type",
                vec![id("seven"), call("v_array", vec![call("v_int", vec![int(7)]), int(3)])],
            )),
            stmt(call(
                "v_type",
                vec![
                    id("printf_t"),
                    call("v_function", vec![id("void"), id("int"), id("v_variadic")]),
                ],
            )),
            stmt(call(
                "v_type",
                vec![
                    id("lanes"),
                    call("v_svector", vec![id("f32"), int(4)]),
                ],
            )),
            stmt(call(
                "v_type",
                vec![
                    id("far"),
                    call("v_pointer", vec![call("v_tuple", vec![id("char"), id("long_long")]), int(3)]),
                ],
            )),
        ]],
    )
    .unwrap();

    let types = s.types().clone();
    let shown = |name: &str| {
        s.find_type(Symbol::intern(name))
            .map(|ty| types.display(ty))
            .unwrap_or_default()
    };
    assert_eq!(shown("seven"), "[i7; 3]");
    assert_eq!(shown("printf_t"), "fn(i32, ...) -> void");
    assert_eq!(shown("lanes"), "<vscale x 4 x f32>");
    assert_eq!(shown("far"), "addrspace(3) *{i8, i64}");
}

#[test]
fn unknown_type_constructor() {
    let mut s = session();
    let err = run(
        &mut s,
        vec![vec![stmt(call(
            "v_type",
            vec![id("t"), call("v_matrix", vec![id("int")])],
        ))]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::TypeNotFound { name } if name.as_str() == "v_matrix"));
}

// -- Dispatch --

#[test]
fn unhandled_node_kind_is_a_dispatch_error() {
    let mut s = session();
    let kind = Symbol::intern("ast_expr_unhandled");
    let err = run(&mut s, vec![vec![stmt(Node::extension(kind, Vec::new()))]]).unwrap_err();
    assert!(matches!(err, CompileError::Dispatch(e) if e.kind == kind));
}

#[test]
fn malformed_node_is_reported() {
    let mut s = session();
    let kind = vela_ir::well_known().ast_expr_integer;
    let bogus = Node::new(kind, NodeData::Char('x'));
    let err = run(&mut s, vec![vec![stmt(bogus)]]).unwrap_err();
    assert!(matches!(err, CompileError::MalformedNode { .. }));
}
