use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use vela_backend::{BuilderMethods, RtValue};
use vela_ir::{Node, Symbol};

use crate::context::{CompileContext, Emit, GlobalValue, Resolve};
use crate::decls::{ConstValue, Intrinsic};
use crate::temporaries::Cleaner;
use crate::test_helpers::*;
use crate::{CompileError, CompilerVisitor, ErrorCategory, Result};

#[test]
fn empty_units_produce_nothing() {
    let mut s = session();
    run(&mut s, vec![vec![], vec![global("x", id("int"), int(1))], vec![]]).unwrap();
    assert_eq!(s.stats().units_compiled, 1);
    assert_eq!(s.backend().unit_count(), 1);
}

#[test]
fn forward_reference_fails_until_defining_unit_ran() {
    let mut s = session();
    let err = run(&mut s, vec![vec![global("a", id("int"), id("b"))]]).unwrap_err();
    assert!(matches!(err, CompileError::IdentifierNotFound { name } if name.as_str() == "b"));

    let mut s = session();
    run(
        &mut s,
        vec![
            vec![global("b", id("int"), int(5))],
            vec![global("a", id("int"), id("b"))],
        ],
    )
    .unwrap();
    assert_eq!(read(&s, "a"), Some(RtValue::int(32, 5)));
}

#[test]
fn declarations_wait_for_their_unit_to_run() {
    let mut s = session();
    let err = run(
        &mut s,
        vec![vec![
            stmt(call("v_constant", vec![id("k"), int(3)])),
            global("g", id("int"), id("k")),
        ]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::IdentifierNotFound { .. }));

    let mut s = session();
    run(
        &mut s,
        vec![
            vec![stmt(call("v_constant", vec![id("k"), int(3)]))],
            vec![global("g", id("int"), id("k"))],
        ],
    )
    .unwrap();
    assert_eq!(read(&s, "g"), Some(RtValue::int(32, 3)));
}

#[test]
fn alias_chains_resolve() {
    let mut s = session();
    add_host_add(&mut s);
    run(
        &mut s,
        vec![
            vec![
                stmt(call("v_alias", vec![id("plus"), id("add")])),
                stmt(call("v_alias", vec![id("sum_of"), id("plus")])),
            ],
            vec![global("r", id("int"), call("sum_of", vec![int(1), int(2)]))],
        ],
    )
    .unwrap();
    assert_eq!(read(&s, "r"), Some(RtValue::int(32, 3)));
    assert_eq!(s.check_alias(Symbol::intern("sum_of")), Some(Symbol::intern("add")));
    assert!(s.resolve_symbol_value(Symbol::intern("sum_of")).is_some());
}

#[test]
fn alias_cycle_is_unresolved() {
    let mut s = session();
    run(
        &mut s,
        vec![vec![
            stmt(call("v_alias", vec![id("ping"), id("pong")])),
            stmt(call("v_alias", vec![id("pong"), id("ping")])),
        ]],
    )
    .unwrap();
    assert_eq!(s.check_alias(Symbol::intern("ping")), None);
    let err = run(&mut s, vec![vec![global("x", id("int"), id("ping"))]]).unwrap_err();
    assert!(matches!(err, CompileError::IdentifierNotFound { .. }));
}

#[test]
fn identical_redeclaration_is_a_no_op() {
    let mut s = session();
    let constant = || vec![stmt(call("v_constant", vec![id("k"), int(1)]))];
    run(&mut s, vec![constant(), constant()]).unwrap();
    assert_eq!(
        s.find_constant(Symbol::intern("k")),
        Some((s.types().common().int, ConstValue::Int(1)))
    );

    let err = run(
        &mut s,
        vec![vec![stmt(call("v_constant", vec![id("k"), int(2)]))]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::Redeclaration { .. }));
    assert_eq!(err.category(), ErrorCategory::Redeclaration);
}

#[test]
fn struct_bodies_and_sizes() {
    let mut s = session();
    run(
        &mut s,
        vec![
            vec![stmt(call(
                "v_struct",
                vec![id("pair"), id("int"), id("long_long")],
            ))],
            vec![global("size", id("size_t"), call("v_sizeof", vec![id("pair")]))],
        ],
    )
    .unwrap();
    let size_bits = s.types().widths().ptr_bits();
    assert_eq!(read(&s, "size"), Some(RtValue::int(size_bits, 16)));
}

#[test]
fn opaque_struct_has_no_size() {
    let mut s = session();
    let err = run(
        &mut s,
        vec![
            vec![stmt(call("v_struct", vec![id("handle")]))],
            vec![stmt(call("v_sizeof", vec![id("handle")]))],
        ],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::IntrinsicArgs { .. }), "{err}");
}

#[test]
fn struct_body_fixed_by_later_unit() {
    let mut s = session();
    run(
        &mut s,
        vec![
            vec![stmt(call("v_struct", vec![id("node")]))],
            vec![stmt(call("v_struct", vec![id("node"), id("int")]))],
            vec![global("size", id("size_t"), call("v_sizeof", vec![id("node")]))],
        ],
    )
    .unwrap();
    let size_bits = s.types().widths().ptr_bits();
    assert_eq!(read(&s, "size"), Some(RtValue::int(size_bits, 4)));
}

#[test]
fn compiled_unit_replays_in_a_fresh_session() {
    let mut first = session();
    let bytes = first
        .compile_unit(&unit(vec![
            stmt(call("v_constant", vec![id("answer"), int(42)])),
            global("g", id("int"), int(9)),
        ]))
        .unwrap()
        .unwrap();

    let mut second = session();
    second.run_unit(&bytes).unwrap();
    assert_eq!(read(&second, "g"), Some(RtValue::int(32, 9)));
    assert_eq!(
        second.find_constant(Symbol::intern("answer")),
        Some((second.types().common().int, ConstValue::Int(42)))
    );
}

fn compile_answer(_: &CompilerVisitor<JitSession>, cx: &mut JitSession, _: &Node) -> Result<()> {
    let int = cx.global().types().common().int;
    let native = cx.materialize(int)?;
    let value = cx.global().backend().const_int(&native, 42);
    cx.adopt_result(int, value)
}

#[test]
fn extended_compiler_applies_from_the_next_unit() {
    let answer = Symbol::intern("ast_expr_answer");
    let mut s = session();
    s.global_mut()
        .declare_intrinsic(
            Symbol::intern("v_enable_answer"),
            Intrinsic::new(move |_, cx: &mut JitSession, _| {
                cx.global_mut().extend_compiler(answer, Rc::new(compile_answer));
                Ok(())
            }),
        )
        .unwrap();
    let before = s.global().compiler();

    let err = run(
        &mut s,
        vec![vec![
            stmt(call("v_enable_answer", vec![])),
            global("early", id("int"), Node::extension(answer, Vec::new())),
        ]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::Dispatch(e) if e.kind == answer));
    assert!(!before.handles(answer));
    assert!(s.global().compiler().handles(answer));

    run(
        &mut s,
        vec![vec![global("late", id("int"), Node::extension(answer, Vec::new()))]],
    )
    .unwrap();
    assert_eq!(read(&s, "late"), Some(RtValue::int(32, 42)));
}

#[test]
fn failed_unit_leaves_session_usable() {
    let mut s = session();
    assert!(run(&mut s, vec![vec![global("x", id("int"), id("nope"))]]).is_err());
    assert!(s.local().module().is_none());
    run(&mut s, vec![vec![global("y", id("int"), int(2))]]).unwrap();
    assert_eq!(s.stats().units_compiled, 1);
    assert_eq!(read(&s, "y"), Some(RtValue::int(32, 2)));
}

#[test]
fn host_functions_are_declared_symbols() {
    let mut s = session();
    add_host_add(&mut s);
    let add = Symbol::intern("add");
    assert!(s.find_symbol_type(add).is_some());
    assert!(s.find_symbol_value(add).is_some());
    assert!(s.native_symbols().contains(&"add".to_owned()));
}

#[test]
fn global_resolution_covers_every_kind_of_name() {
    let mut s = session();
    add_host_add(&mut s);
    let sym = Symbol::intern;
    s.global_mut().declare_alias(sym("plus"), sym("add")).unwrap();
    s.global_mut().declare_alias(sym("sum_of"), sym("plus")).unwrap();
    s.global_mut().declare_alias(sym("integer"), sym("int")).unwrap();
    let common = *s.types().common();
    let global = s.global();

    let add_ty = global.decls().symbol(sym("add")).unwrap();
    assert!(matches!(
        global.resolve_symbol(sym("add")),
        Some((ty, GlobalValue::Symbol(name))) if ty == add_ty && name == sym("add")
    ));
    assert!(matches!(
        global.resolve_symbol(sym("sum_of")),
        Some((ty, GlobalValue::Symbol(name))) if ty == add_ty && name == sym("add")
    ));
    assert!(matches!(
        global.resolve_symbol(sym("integer")),
        Some((ty, GlobalValue::Constant(ConstValue::Type(int))))
            if ty == common.static_type && int == common.int
    ));
    assert!(matches!(
        global.resolve_symbol(sym("v_alias")),
        Some((ty, GlobalValue::Intrinsic(_))) if ty == common.void
    ));
    assert!(global.resolve_symbol(sym("nowhere")).is_none());
}

#[test]
fn global_resolution_gives_up_on_alias_cycles() {
    let mut s = session();
    let sym = Symbol::intern;
    s.global_mut().declare_alias(sym("tick"), sym("tock")).unwrap();
    s.global_mut().declare_alias(sym("tock"), sym("tick")).unwrap();
    assert!(s.global().resolve_symbol(sym("tick")).is_none());
    assert_eq!(s.global().check_alias(sym("tock")), None);
}

#[test]
fn import_without_file_is_not_found() {
    let mut s = session();
    let err = run(
        &mut s,
        vec![vec![stmt(call("v_import", vec![Node::string("nowhere.vl")]))]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::ImportNotFound { .. }));
    assert_eq!(err.category(), ErrorCategory::Resource);
}

#[test]
fn main_files_do_not_share_declarations() {
    let mut s = session();
    s.run_nodes(
        "a.vl",
        vec![unit(vec![stmt(call("v_constant", vec![id("secret"), int(7)]))])],
    )
    .unwrap();
    assert_eq!(s.find_constant(Symbol::intern("secret")), None);
    assert_eq!(s.local().filename(), Path::new("<main>"));

    let err = s
        .run_nodes("b.vl", vec![unit(vec![global("leak", id("int"), id("secret"))])])
        .unwrap_err();
    assert!(matches!(err, CompileError::IdentifierNotFound { name } if name.as_str() == "secret"));
    assert_eq!(s.local().filename(), Path::new("<main>"));
}

// ---------------------------------------------------------------------------
// Lexical regions
// ---------------------------------------------------------------------------

type Log = Rc<RefCell<Vec<String>>>;

fn tracker(log: &Log, tag: String) -> Cleaner<JitSession> {
    let log = Rc::clone(log);
    Box::new(move |_| {
        log.borrow_mut().push(tag);
        Ok(())
    })
}

#[test]
fn statement_temporaries_clean_up_in_reverse() {
    let log: Log = Rc::default();
    let mut s = session();
    let in_intrinsic = Rc::clone(&log);
    s.global_mut()
        .declare_intrinsic(
            Symbol::intern("v_track"),
            Intrinsic::new(move |_, cx: &mut JitSession, args| {
                for arg in args {
                    let tag = arg.as_identifier().map_or("?", Symbol::as_str);
                    cx.add_temporary(tracker(&in_intrinsic, tag.to_owned()))?;
                }
                Ok(())
            }),
        )
        .unwrap();

    run(
        &mut s,
        vec![vec![
            stmt(call("v_track", vec![id("a"), id("b")])),
            stmt(call("v_track", vec![id("c")])),
        ]],
    )
    .unwrap();
    assert_eq!(*log.borrow(), ["b", "a", "c"]);
}

#[test]
fn temporaries_need_an_open_region() {
    let log: Log = Rc::default();
    let mut s = session();
    let err = s.add_temporary(tracker(&log, "x".into())).unwrap_err();
    assert!(matches!(err, CompileError::StackUnderflow { what: "temporaries" }));
    assert!(matches!(
        s.pop_temporaries(),
        Err(CompileError::StackUnderflow { .. })
    ));
}

#[test]
fn context_cleaners_run_last_registered_first() {
    let log: Log = Rc::default();
    let mut s = session();
    s.local_mut().add_cleaner(tracker(&log, "first".into()));
    s.local_mut().add_cleaner(tracker(&log, "second".into()));
    s.run_context_cleaners().unwrap();
    s.run_context_cleaners().unwrap();
    assert_eq!(*log.borrow(), ["second", "first"]);
}

/// Intrinsic `v_on_exit(tag)`: log `tag` when the file's context ends.
fn declare_on_exit(s: &mut JitSession, log: &Log) {
    let log = Rc::clone(log);
    s.global_mut()
        .declare_intrinsic(
            Symbol::intern("v_on_exit"),
            Intrinsic::new(move |_, cx: &mut JitSession, args| {
                let tag = args[0].as_identifier().map_or("?", Symbol::as_str);
                cx.local_mut().add_cleaner(tracker(&log, tag.to_owned()));
                Ok(())
            }),
        )
        .unwrap();
}

#[test]
fn main_file_cleaners_run_when_the_file_ends() {
    let log: Log = Rc::default();
    let mut s = session();
    declare_on_exit(&mut s, &log);

    s.run_nodes(
        "a.vl",
        vec![
            unit(vec![stmt(call("v_on_exit", vec![id("first")]))]),
            unit(vec![stmt(call("v_on_exit", vec![id("second")]))]),
        ],
    )
    .unwrap();
    assert_eq!(*log.borrow(), ["second", "first"]);

    let err = s
        .run_nodes(
            "b.vl",
            vec![
                unit(vec![stmt(call("v_on_exit", vec![id("failed")]))]),
                unit(vec![global("x", id("int"), id("missing"))]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::IdentifierNotFound { .. }));
    assert_eq!(*log.borrow(), ["second", "first", "failed"]);
}

#[test]
fn nested_block_restores_scope_and_builder_position() {
    let inner = Symbol::intern("inner_var");
    let mut s = session();
    s.global_mut()
        .declare_intrinsic(
            Symbol::intern("v_block"),
            Intrinsic::new(move |_, cx: &mut JitSession, _| {
                cx.push_builder_ip()?;
                cx.push_variables();
                let int = cx.global().types().common().int;
                let slot = cx.make_temporary(int)?;
                cx.local_mut().bind_variable(inner, int, slot);
                assert!(cx.local().variables().contains(inner));
                cx.pop_variables()?;
                cx.pop_builder_ip()?;
                assert!(!cx.local().variables().contains(inner));
                Ok(())
            }),
        )
        .unwrap();

    run(&mut s, vec![vec![stmt(call("v_block", vec![]))]]).unwrap();
    assert!(matches!(
        s.pop_builder_ip(),
        Err(CompileError::StackUnderflow { what: "builder position" })
    ));
    assert!(matches!(
        s.pop_variables(),
        Err(CompileError::StackUnderflow { what: "variables" })
    ));
}

// ---------------------------------------------------------------------------
// Type calculator
// ---------------------------------------------------------------------------

fn word_type(_: &CompilerVisitor<JitSession>, cx: &mut JitSession, _: &Node) -> Result<()> {
    let word = cx.global().types().uint(16);
    cx.local_mut().set_type_result(word);
    Ok(())
}

#[test]
fn type_calculator_extension_and_restore() {
    let kind = Symbol::intern("ast_type_word");
    let mut s = session();
    let original = s.global().type_calculator();
    s.global_mut().extend_type_calculator(kind, Rc::new(word_type));

    run(
        &mut s,
        vec![vec![global("w", Node::extension(kind, Vec::new()), int(0x12345))]],
    )
    .unwrap();
    assert_eq!(read(&s, "w"), Some(RtValue::int(16, 0x2345)));

    s.global_mut().set_type_calculator(original);
    let err = run(
        &mut s,
        vec![vec![global("v", Node::extension(kind, Vec::new()), int(1))]],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::Dispatch(e) if e.kind == kind));
}

#[test]
fn replaced_compiler_is_used_by_later_units() {
    let mut s = session();
    let level0 = s.global().compiler();
    let integer = vela_ir::well_known().ast_expr_integer;
    s.global_mut().set_compiler(level0.without_handler(integer));

    let err = run(&mut s, vec![vec![global("x", id("int"), int(1))]]).unwrap_err();
    assert!(matches!(err, CompileError::Dispatch(e) if e.kind == integer));

    s.global_mut().set_compiler(level0);
    run(&mut s, vec![vec![global("x", id("int"), int(1))]]).unwrap();
    assert_eq!(read(&s, "x"), Some(RtValue::int(32, 1)));
}
