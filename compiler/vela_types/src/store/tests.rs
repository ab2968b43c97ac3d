use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use vela_ir::Symbol;

use super::*;
use crate::TypeDesc;

/// Hooks for every kind that render the display string and count calls.
fn counting_store(widths: TargetWidths) -> (TypeStore<String>, Arc<AtomicUsize>) {
    let store = TypeStore::new(widths);
    let calls = Arc::new(AtomicUsize::new(0));
    for kind in TypeKind::ALL {
        let calls = Arc::clone(&calls);
        store.set_materialize_hook(
            kind,
            Arc::new(move |store: &TypeStore<String>, id| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Ok(body) = store.struct_body(id) {
                    let inner: Result<Vec<_>, _> =
                        body.elems.iter().map(|&e| store.materialize(e)).collect();
                    return Ok(format!("{}={{{}}}", store.display(id), inner?.join(",")));
                }
                Ok(store.display(id))
            }),
        );
    }
    (store, calls)
}

fn host_store() -> TypeStore<String> {
    TypeStore::new(TargetWidths::host())
}

#[test]
fn structurally_equal_types_share_a_handle() {
    let store = host_store();
    let int = store.common().int;
    let p1 = store.pointer(int, 0);
    let p2 = store.pointer(int, 0);
    let f1 = store.function(store.void(), &[int, p1], true);
    let f2 = store.function(store.void(), &[int, p2], true);

    assert_eq!(p1, p2);
    assert_eq!(f1, f2);
    assert_ne!(store.pointer(int, 1), p1);
    assert_ne!(store.function(store.void(), &[int, p1], false), f1);
}

#[test]
fn common_types_follow_widths() {
    let narrow = TypeStore::<String>::new(TargetWidths::new(2, 4, 4).unwrap());
    let c = *narrow.common();
    assert_eq!(narrow.int_info(c.int).unwrap().bits, 16);
    assert_eq!(narrow.int_info(c.long).unwrap().bits, 32);
    assert_eq!(c.intptr, c.long);
    assert!(!narrow.int_info(c.size).unwrap().signed);
    assert_eq!(c.long_long, narrow.int(64));
    assert_eq!(c.char32, narrow.uint(32));
    assert_eq!(c.bool, narrow.uint(1));
    assert_eq!(narrow.pointer_target(c.char_ptr), Some(c.char));
    assert!(narrow.is_opaque(c.static_type));
}

#[test]
fn named_struct_body_is_set_once() {
    let store = host_store();
    let name = Symbol::intern("store_test_point");
    let point = store.named_struct(name);
    let int = store.common().int;

    assert!(store.is_opaque(point));
    assert_eq!(
        store.struct_body(point),
        Err(TypeStoreError::OpaqueStruct { name })
    );

    store.set_struct_body(point, &[int, int], false).unwrap();
    assert!(!store.is_opaque(point));
    assert_eq!(store.struct_body(point).unwrap().elems.as_ref(), &[int, int]);

    // Identical body: no-op.
    store.set_struct_body(point, &[int, int], false).unwrap();
    // Different body: rejected, original kept.
    assert_eq!(
        store.set_struct_body(point, &[int], false),
        Err(TypeStoreError::BodyRedefined { name })
    );
    assert_eq!(store.struct_body(point).unwrap().elems.len(), 2);

    // Same name, same handle.
    assert_eq!(store.named_struct(name), point);
}

#[test]
fn body_on_non_struct_is_rejected() {
    let store = host_store();
    let int = store.common().int;
    assert!(matches!(
        store.set_struct_body(int, &[int], false),
        Err(TypeStoreError::NotANamedStruct { .. })
    ));
    assert!(matches!(
        store.struct_body(int),
        Err(TypeStoreError::NotAStruct { .. })
    ));
    let pair = store.tuple(&[int, int], true);
    assert!(store.struct_body(pair).unwrap().packed);
}

#[test]
fn materialization_is_cached() {
    let (store, calls) = counting_store(TargetWidths::host());
    let ptr = store.pointer(store.common().int, 0);

    assert_eq!(store.cached(ptr), None);
    assert_eq!(store.materialize(ptr).unwrap(), "*i32");
    assert_eq!(store.materialize(ptr).unwrap(), "*i32");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.cached(ptr).as_deref(), Some("*i32"));
}

#[test]
fn completing_a_struct_refreshes_containers() {
    let (store, _) = counting_store(TargetWidths::host());
    let node = store.named_struct(Symbol::intern("store_test_node"));
    let int = store.common().int;
    let wrapper = store.tuple(&[node, int], false);
    let array = store.array(wrapper, 2);
    let by_pointer = store.pointer(node, 0);

    assert_eq!(store.materialize(node).unwrap(), "store_test_node");
    store.materialize(wrapper).unwrap();
    assert_eq!(
        store.materialize(array).unwrap(),
        "[{store_test_node, i32}; 2]"
    );
    store.materialize(by_pointer).unwrap();
    assert!(store.cached(wrapper).is_some());

    store.set_struct_body(node, &[int], false).unwrap();

    assert_eq!(store.cached(node), None);
    assert_eq!(store.cached(wrapper), None);
    assert_eq!(store.cached(array), None);
    // Pointers do not embed their pointee.
    assert!(store.cached(by_pointer).is_some());
    assert_eq!(store.materialize(node).unwrap(), "store_test_node={i32}");
}

#[test]
fn missing_hook_is_reported() {
    let store = host_store();
    assert_eq!(
        store.materialize(store.common().f32),
        Err(TypeStoreError::NoMaterializeHook {
            kind: TypeKind::F32
        })
    );
}

#[test]
fn self_embedding_struct_is_recursive() {
    let (store, _) = counting_store(TargetWidths::host());
    let name = Symbol::intern("store_test_loop");
    let looped = store.named_struct(name);
    store.set_struct_body(looped, &[looped], false).unwrap();
    assert!(matches!(
        store.materialize(looped),
        Err(TypeStoreError::RecursiveMaterialization { .. })
    ));
    // The guard is released after the failure.
    assert!(store.materialize(looped).is_err());
}

#[test]
fn unknown_handles_are_errors() {
    let store = host_store();
    let bogus = TypeId::from_raw(10_000);
    assert_eq!(
        store.lookup(bogus),
        Err(TypeStoreError::UnknownType { id: 10_000 })
    );
    assert_eq!(store.kind(bogus), None);
}

#[test]
fn descriptions_rebuild_in_a_fresh_store() {
    let store = host_store();
    let int = store.common().int;
    let node = store.named_struct(Symbol::intern("store_test_desc"));
    let vec = store.svector(store.common().f32, 4);
    let generic = store.generic(
        Symbol::intern("span"),
        vec![
            GenericArg::Type(int),
            GenericArg::Number(3),
            GenericArg::Cons {
                cons: Symbol::intern("tag"),
                args: Box::new([GenericArg::String("x".into())]),
            },
        ],
    );
    let func = store.function(
        store.reference(node, 0),
        &[store.pointer(vec, 2), generic],
        true,
    );

    let desc = store.describe(func).unwrap();
    let other = TypeStore::<String>::new(TargetWidths::host());
    let rebuilt = other.from_desc(&desc);
    assert_eq!(other.describe(rebuilt).unwrap(), desc);
    assert_eq!(other.display(rebuilt), store.display(func));
    assert_eq!(other.from_desc(&TypeDesc::Int(32)), other.common().int);
}

#[test]
fn display_renders_every_kind() {
    let store = host_store();
    let c = *store.common();
    let cases = [
        (store.function(c.void, &[c.int], true), "fn(i32, ...) -> void"),
        (store.function(c.int, &[], false), "fn() -> i32"),
        (store.reference(c.long_long, 0), "&i64"),
        (store.pointer(c.char, 3), "addrspace(3) *i8"),
        (store.tuple(&[c.char, c.int], true), "<{i8, i32}>"),
        (store.array(c.int, 4), "[i32; 4]"),
        (store.vector(c.f32, 4), "<4 x f32>"),
        (store.svector(c.f64, 2), "<vscale x 2 x f64>"),
        (store.uint(7), "u7"),
        (c.f128, "f128"),
    ];
    for (id, expected) in cases {
        assert_eq!(store.display(id), expected);
    }
}

#[test]
fn display_marks_unknown_ids() {
    let store = host_store();
    let bogus = TypeId::from_raw(u32::MAX);
    assert_eq!(store.display(bogus), format!("<unknown {}>", u32::MAX));
    let c = *store.common();
    let ptr = store.pointer(c.int, 0);
    assert_eq!(store.display(store.array(ptr, 2)), "[*i32; 2]");
}

proptest! {
    #[test]
    fn canonicalization_is_structural(bits in 1u32..128, depth in 0usize..6, space in 0u32..3) {
        let store = host_store();
        let build = |store: &TypeStore<String>| {
            let mut ty = store.int(bits);
            for level in 0..depth {
                ty = if level % 2 == 0 { store.pointer(ty, space) } else { store.array(ty, 3) };
            }
            ty
        };
        let a = build(&store);
        let before = store.len();
        let b = build(&store);
        prop_assert_eq!(a, b);
        prop_assert_eq!(store.len(), before);
    }
}
