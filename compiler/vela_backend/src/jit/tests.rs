use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::traits::BuilderMethods;
use crate::value::{HostMemory, NativeAddress};
use crate::NativeType;

const I64: NativeType = NativeType::Int { bits: 64 };

fn unit(jit: &Jit, name: &str) -> Module {
    let mut module = jit.create_module(name);
    jit.begin_function(&mut module, "__unit");
    module
}

fn finish(jit: &mut Jit, mut module: Module) -> Result<UnitHandle, BackendError> {
    jit.build_ret_void(&mut module);
    jit.verify_module(&module)?;
    let handle = jit.link_module(module)?;
    jit.run_unit(handle)?;
    jit.flush_unit_symbols(handle)?;
    Ok(handle)
}

/// Host function appending its integer arguments to a shared log.
fn recorder(jit: &mut Jit) -> Rc<RefCell<Vec<i64>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    jit.add_host_function(
        "record",
        Rc::new(move |_: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
            sink.borrow_mut()
                .extend(args.iter().filter_map(RtValue::as_i64));
            Ok(RtValue::Void)
        }),
    )
    .unwrap();
    log
}

fn record_fn_type() -> NativeType {
    NativeType::Function {
        ret: Box::new(NativeType::Void),
        params: vec![I64],
        variadic: true,
    }
}

#[test]
fn globals_defined_by_one_unit_are_visible_to_the_next() {
    let mut jit = Jit::new();
    let log = recorder(&mut jit);

    let mut first = unit(&jit, "first");
    let counter = jit.define_global(&mut first, "counter", &I64);
    let five = jit.const_int(&I64, 5);
    jit.build_store(&mut first, &five, &counter);
    finish(&mut jit, first).unwrap();

    assert_eq!(jit.read_global("counter"), Some(&RtValue::int(64, 5)));

    let mut second = unit(&jit, "second");
    let counter = jit.declare_global(&mut second, "counter", &I64);
    let value = jit.build_load(&mut second, &I64, &counter);
    let record = jit.declare_function(&mut second, "record", &record_fn_type());
    jit.build_call(&mut second, &record_fn_type(), &record, &[value]);
    finish(&mut jit, second).unwrap();

    assert_eq!(*log.borrow(), vec![5]);
    assert_eq!(jit.native_symbols(), vec!["counter", "record"]);
}

#[test]
fn unresolved_reference_fails_to_link() {
    let mut jit = Jit::new();
    let mut module = unit(&jit, "dangling");
    let missing = jit.declare_global(&mut module, "missing", &I64);
    jit.build_load(&mut module, &I64, &missing);
    let err = finish(&mut jit, module).unwrap_err();
    assert_eq!(
        err,
        BackendError::UnresolvedSymbol {
            name: "missing".to_owned(),
            unit: "dangling".to_owned()
        }
    );
}

#[test]
fn failed_link_allocates_no_storage() {
    let mut jit = Jit::new();
    let mut module = unit(&jit, "dangling");
    jit.define_global(&mut module, "lost", &I64);
    let missing = jit.declare_global(&mut module, "missing", &I64);
    jit.build_load(&mut module, &I64, &missing);
    assert!(finish(&mut jit, module).is_err());
    assert_eq!(jit.unit_count(), 0);

    let mut module = unit(&jit, "clean");
    jit.define_global(&mut module, "kept", &I64);
    let handle = finish(&mut jit, module).unwrap();
    assert_eq!(handle, UnitHandle(0));
    assert_eq!(jit.lookup_native_symbol("kept"), Some(NativeAddress::Data(0)));
    assert_eq!(jit.read_global("kept"), Some(&RtValue::int(64, 0)));
}

#[test]
fn link_order_resolves_before_flush() {
    let mut jit = Jit::new();

    let mut first = unit(&jit, "first");
    jit.define_global(&mut first, "early", &I64);
    jit.build_ret_void(&mut first);
    let first = jit.link_module(first).unwrap();

    // Not flushed yet: only the link-order queue knows the symbol.
    assert_eq!(jit.native_symbols(), Vec::<String>::new());
    assert_eq!(jit.lookup_native_symbol("early"), Some(NativeAddress::Data(0)));

    let mut second = unit(&jit, "second");
    jit.declare_global(&mut second, "early", &I64);
    jit.build_ret_void(&mut second);
    assert!(jit.link_module(second).is_ok());

    assert_eq!(jit.flush_unit_symbols(first).unwrap(), vec!["early"]);
    assert_eq!(jit.flush_unit_symbols(first).unwrap(), Vec::<String>::new());
}

#[test]
fn function_and_data_symbols_are_not_interchangeable() {
    let mut jit = Jit::new();
    recorder(&mut jit);
    let mut module = unit(&jit, "confused");
    jit.declare_global(&mut module, "record", &I64);
    assert!(matches!(
        finish(&mut jit, module),
        Err(BackendError::SymbolKind { .. })
    ));
}

#[test]
fn string_literals_reach_host_functions() {
    let mut jit = Jit::new();
    let seen = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&seen);
    jit.add_host_function(
        "show",
        Rc::new(move |mem: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
            let text = args
                .first()
                .and_then(RtValue::as_pointer)
                .and_then(|p| mem.read_str(p))
                .ok_or_else(|| "expected a string".to_owned())?;
            sink.borrow_mut().push_str(text);
            Ok(RtValue::Void)
        }),
    )
    .unwrap();

    let fn_ty = NativeType::Function {
        ret: Box::new(NativeType::Void),
        params: vec![NativeType::Ptr {
            addr_space: 0,
            bits: 64,
        }],
        variadic: false,
    };
    let mut module = unit(&jit, "greeter");
    let text = jit.const_string(&mut module, "hello");
    let show = jit.declare_function(&mut module, "show", &fn_ty);
    jit.build_call(&mut module, &fn_ty, &show, &[text]);
    finish(&mut jit, module).unwrap();

    assert_eq!(*seen.borrow(), "hello");
}

#[test]
fn host_errors_become_execution_errors() {
    let mut jit = Jit::new();
    jit.add_host_function(
        "fail",
        Rc::new(|_: &HostMemory<'_>, _: &[RtValue]| -> Result<RtValue, String> {
            Err("nope".to_owned())
        }),
    )
    .unwrap();
    let mut module = unit(&jit, "failing");
    let fail = jit.declare_function(&mut module, "fail", &record_fn_type());
    jit.build_call(&mut module, &record_fn_type(), &fail, &[]);
    let err = finish(&mut jit, module).unwrap_err();
    assert_eq!(
        err.to_string(),
        "execution of `failing` failed: `fail`: nope"
    );
}

#[test]
fn stack_slots_and_casts() {
    let mut jit = Jit::new();
    let log = recorder(&mut jit);
    let i8_ty = NativeType::Int { bits: 8 };

    let mut module = unit(&jit, "slots");
    let slot = jit.build_alloca(&mut module, &i8_ty);
    let minus_one = jit.const_int(&i8_ty, -1);
    jit.build_store(&mut module, &minus_one, &slot);
    let byte = jit.build_load(&mut module, &i8_ty, &slot);
    let signed = jit.build_int_cast(&mut module, &byte, &I64, true);
    let unsigned = jit.build_int_cast(&mut module, &byte, &I64, false);
    let record = jit.declare_function(&mut module, "record", &record_fn_type());
    jit.build_call(&mut module, &record_fn_type(), &record, &[signed, unsigned]);
    finish(&mut jit, module).unwrap();

    assert_eq!(*log.borrow(), vec![-1, 255]);
}

#[test]
fn modules_survive_serialization() {
    let jit = Jit::new();
    let mut module = unit(&jit, "roundtrip");
    jit.attach_metadata(&mut module, "key", vec![1, 2, 3]);
    jit.const_string(&mut module, "text");
    jit.build_ret_void(&mut module);

    let bytes = jit.serialize_module(&module).unwrap();
    let restored = jit.deserialize_module(&bytes).unwrap();
    assert_eq!(jit.module_metadata(&restored, "key"), Some(&[1u8, 2, 3][..]));
    assert_eq!(restored.strings, vec!["text"]);
    assert_eq!(restored.entry, Some(0));
    assert!(jit.deserialize_module(&bytes[..3]).is_err());
}

#[test]
fn verification_catches_builder_misuse() {
    let jit = Jit::new();
    let mut orphan = jit.create_module("orphan");
    jit.build_alloca(&mut orphan, &I64);
    assert!(jit.verify_module(&orphan).is_err());

    let mut open = unit(&jit, "open");
    jit.build_alloca(&mut open, &I64);
    assert!(jit.verify_module(&open).is_err());
    jit.build_ret_void(&mut open);
    assert!(jit.verify_module(&open).is_ok());
}

#[test]
fn duplicate_host_function_is_rejected() {
    let mut jit = Jit::new();
    recorder(&mut jit);
    let again = jit.add_host_function(
        "record",
        Rc::new(|_: &HostMemory<'_>, _: &[RtValue]| -> Result<RtValue, String> {
            Ok(RtValue::Void)
        }),
    );
    assert_eq!(
        again,
        Err(BackendError::DuplicateSymbol {
            name: "record".to_owned()
        })
    );
}
