//! Level-0 intrinsics.
//!
//! Compile-time call forms, registered as global intrinsics. The
//! declarative ones (`v_import`, `v_alias`, `v_constant`, `v_type`,
//! `v_struct`, `v_global` and their `v_export_*` forms) do not change any
//! declarations themselves: they record what to declare in the unit's
//! manifest, and the declarations take effect once the unit has run.

use std::rc::Rc;

use vela_backend::{BuilderMethods, TypeMethods};
use vela_ir::{NodeData, NodeRef, Symbol};
use vela_types::TypeId;

use crate::context::{CompileContext, Emit, Expected, Resolve};
use crate::decls::{ConstValue, Declarations, Intrinsic};
use crate::manifest::{ConstDesc, DeclRecord};
use crate::{CompileError, CompilerVisitor, Result};

/// Register every level-0 intrinsic in `decls`.
pub fn register<C: CompileContext>(decls: &mut Declarations<C>) -> Result<()> {
    let table: [(&str, Intrinsic<C>); 15] = [
        ("v_import", Intrinsic::<C>::new(import::<C>)),
        ("v_alias", Intrinsic::<C>::new(|_, cx, args| alias(cx, args, false))),
        ("v_export_alias", Intrinsic::<C>::new(|_, cx, args| alias(cx, args, true))),
        ("v_constant", Intrinsic::<C>::new(|_, cx, args| constant(cx, args, false))),
        ("v_export_constant", Intrinsic::<C>::new(|_, cx, args| constant(cx, args, true))),
        ("v_type", Intrinsic::<C>::new(|_, cx, args| type_decl(cx, args, false))),
        ("v_export_type", Intrinsic::<C>::new(|_, cx, args| type_decl(cx, args, true))),
        ("v_struct", Intrinsic::<C>::new(|_, cx, args| struct_decl(cx, args, false))),
        ("v_export_struct", Intrinsic::<C>::new(|_, cx, args| struct_decl(cx, args, true))),
        ("v_global", Intrinsic::<C>::new(|vis, cx, args| global(vis, cx, args, false))),
        ("v_export_global", Intrinsic::<C>::new(|vis, cx, args| global(vis, cx, args, true))),
        ("v_as", Intrinsic::<C>::new(cast::<C>)),
        ("v_sizeof", Intrinsic::<C>::new(sizeof::<C>)),
        ("v_add_symbol", Intrinsic::<C>::new(|_, cx, args| symbol(cx, args, false))),
        ("v_export_symbol", Intrinsic::<C>::new(|_, cx, args| symbol(cx, args, true))),
    ];
    for (name, intrinsic) in table {
        decls.insert_intrinsic(Symbol::intern(name), intrinsic)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn expect_args(name: &str, args: &[NodeRef], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else if min == max {
        Err(CompileError::intrinsic(
            name,
            format!("expects {min} argument(s), {} given", args.len()),
        ))
    } else {
        Err(CompileError::intrinsic(
            name,
            format!("expects {min} to {max} arguments, {} given", args.len()),
        ))
    }
}

/// An identifier argument naming something.
fn name_arg(name: &str, node: &NodeRef) -> Result<Symbol> {
    node.as_identifier()
        .ok_or_else(|| CompileError::intrinsic(name, "expects an identifier"))
}

fn describe<C: CompileContext>(cx: &C, ty: TypeId) -> Result<vela_types::TypeDesc> {
    Ok(cx.global().types().describe(ty)?)
}

// ---------------------------------------------------------------------------
// Declarative intrinsics
// ---------------------------------------------------------------------------

/// `v_import(path)`
fn import<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    args: &[NodeRef],
) -> Result<()> {
    expect_args("v_import", args, 1, 1)?;
    let path = match args[0].data() {
        NodeData::String(path) => path.to_string(),
        NodeData::Identifier(name) => name.as_str().to_owned(),
        _ => return Err(CompileError::intrinsic("v_import", "expects a file name")),
    };
    cx.record_declaration(DeclRecord::Import { path })
}

/// `v_alias(name, target)`
fn alias<C: CompileContext>(cx: &mut C, args: &[NodeRef], export: bool) -> Result<()> {
    expect_args("v_alias", args, 2, 2)?;
    let name = name_arg("v_alias", &args[0])?;
    let target = name_arg("v_alias", &args[1])?;
    cx.record_declaration(DeclRecord::Alias {
        name: name.as_str().to_owned(),
        target: target.as_str().to_owned(),
        export,
    })
}

/// `v_constant(name, [type,] value)`
///
/// The value is a literal, `null` (with an explicit pointer type), or the
/// name of another constant.
fn constant<C: CompileContext>(cx: &mut C, args: &[NodeRef], export: bool) -> Result<()> {
    expect_args("v_constant", args, 2, 3)?;
    let name = name_arg("v_constant", &args[0])?;
    let explicit = if args.len() == 3 {
        Some(cx.lookup_type(&args[1])?)
    } else {
        None
    };
    let value_node = &args[args.len() - 1];
    let common = *cx.global().types().common();

    let (default_ty, value) = match value_node.data() {
        NodeData::Integer(v) => (common.int, ConstValue::Int(*v)),
        NodeData::Char(c) => (common.char32, ConstValue::Char(*c)),
        NodeData::String(s) => (common.char_ptr, ConstValue::Str(Rc::from(&**s))),
        NodeData::Identifier(id) if id.as_str() == "null" => (common.void_ptr, ConstValue::Null),
        NodeData::Identifier(id) => cx
            .check_alias(*id)
            .and_then(|n| cx.find_constant(n))
            .ok_or(CompileError::IdentifierNotFound { name: *id })?,
        _ => {
            return Err(CompileError::intrinsic(
                "v_constant",
                "expects a literal or constant value",
            ))
        }
    };
    let ty = explicit.unwrap_or(default_ty);
    if value == ConstValue::Null && !cx.global().types().is_pointer(ty) {
        return Err(CompileError::intrinsic(
            "v_constant",
            "null needs a pointer type",
        ));
    }

    let value = match value {
        ConstValue::Int(v) => ConstDesc::Int(v),
        ConstValue::Char(c) => ConstDesc::Char(c),
        ConstValue::Str(s) => ConstDesc::Str(s.to_string()),
        ConstValue::Null => ConstDesc::Null,
        ConstValue::Type(t) => ConstDesc::Type(describe(cx, t)?),
    };
    cx.record_declaration(DeclRecord::Constant {
        name: name.as_str().to_owned(),
        ty: describe(cx, ty)?,
        value,
        export,
    })
}

fn record_type<C: CompileContext>(cx: &mut C, name: Symbol, ty: TypeId, export: bool) -> Result<()> {
    let static_type = cx.global().types().common().static_type;
    cx.record_declaration(DeclRecord::Constant {
        name: name.as_str().to_owned(),
        ty: describe(cx, static_type)?,
        value: ConstDesc::Type(describe(cx, ty)?),
        export,
    })
}

/// `v_type(name, T)`
fn type_decl<C: CompileContext>(cx: &mut C, args: &[NodeRef], export: bool) -> Result<()> {
    expect_args("v_type", args, 2, 2)?;
    let name = name_arg("v_type", &args[0])?;
    let ty = cx.lookup_type(&args[1])?;
    record_type(cx, name, ty, export)
}

/// `v_struct(name, elems...)`; without elements the struct stays opaque.
fn struct_decl<C: CompileContext>(cx: &mut C, args: &[NodeRef], export: bool) -> Result<()> {
    expect_args("v_struct", args, 1, usize::MAX)?;
    let name = name_arg("v_struct", &args[0])?;
    let id = cx.global().types().named_struct(name);
    record_type(cx, name, id, export)?;

    if args.len() > 1 {
        let elems = args[1..]
            .iter()
            .map(|e| {
                let ty = cx.lookup_type(e)?;
                describe(cx, ty)
            })
            .collect::<Result<Vec<_>>>()?;
        cx.record_declaration(DeclRecord::StructBody {
            name: name.as_str().to_owned(),
            elems,
            packed: false,
        })?;
    }
    Ok(())
}

/// `v_add_symbol(name, T)`: a native symbol defined outside Vela.
fn symbol<C: CompileContext>(cx: &mut C, args: &[NodeRef], export: bool) -> Result<()> {
    expect_args("v_add_symbol", args, 2, 2)?;
    let name = name_arg("v_add_symbol", &args[0])?;
    let ty = cx.lookup_type(&args[1])?;
    cx.record_declaration(DeclRecord::Symbol {
        name: name.as_str().to_owned(),
        ty: describe(cx, ty)?,
        export,
    })
}

/// `v_global(name, T[, init])`: defines the global in the current unit and
/// yields a reference to it.
fn global<C: CompileContext>(
    vis: &CompilerVisitor<C>,
    cx: &mut C,
    args: &[NodeRef],
    export: bool,
) -> Result<()> {
    expect_args("v_global", args, 2, 3)?;
    let name = name_arg("v_global", &args[0])?;
    let ty = cx.lookup_type(&args[1])?;
    let native = cx.materialize(ty)?;
    let address =
        cx.with_module(|backend, module| backend.define_global(module, name.as_str(), &native))?;

    if let Some(init) = args.get(2) {
        let (_, value) = cx.compile_expression(vis, init, Expected::Type(ty))?;
        cx.with_module(|backend, module| backend.build_store(module, &value, &address))?;
    }

    cx.record_declaration(DeclRecord::Symbol {
        name: name.as_str().to_owned(),
        ty: describe(cx, ty)?,
        export,
    })?;
    let reference = cx.global().types().reference(ty, 0);
    cx.adopt_result(reference, address)
}

// ---------------------------------------------------------------------------
// Expression intrinsics
// ---------------------------------------------------------------------------

/// `v_as(expr, T)`
fn cast<C: CompileContext>(vis: &CompilerVisitor<C>, cx: &mut C, args: &[NodeRef]) -> Result<()> {
    expect_args("v_as", args, 2, 2)?;
    let ty = cx.lookup_type(&args[1])?;
    let (_, value) = cx.compile_expression(vis, &args[0], Expected::Type(ty))?;
    cx.adopt_result(ty, value)
}

/// `v_sizeof(T)`: allocation size in bytes, as a `size_t`.
fn sizeof<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    args: &[NodeRef],
) -> Result<()> {
    expect_args("v_sizeof", args, 1, 1)?;
    let ty = cx.lookup_type(&args[0])?;
    let native = cx.materialize(ty)?;
    let size = cx
        .global()
        .backend()
        .size_of(&native)
        .ok_or_else(|| {
            CompileError::intrinsic(
                "v_sizeof",
                format!("`{}` has no size", cx.global().types().display(ty)),
            )
        })?;
    let size = i64::try_from(size)
        .map_err(|_| CompileError::intrinsic("v_sizeof", "size out of range"))?;

    let size_t = cx.global().types().common().size;
    let size_native = cx.materialize(size_t)?;
    let value = cx.global().backend().const_int(&size_native, size);
    cx.adopt_result(size_t, value)
}
