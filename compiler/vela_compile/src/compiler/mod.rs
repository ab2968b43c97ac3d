//! Level-0 compiler.
//!
//! Handlers for the eight built-in node kinds. A language extension
//! replaces or adds handlers by installing a new visitor value in the
//! global context; the level-0 handlers here only see the context through
//! [`CompileContext`] and its extension traits.

pub mod intrinsics;
pub mod typecalc;

use vela_backend::BuilderMethods;
use vela_ir::{well_known, Node, NodeData, Visitor};
use vela_types::TypeId;

use crate::context::{CompileContext, Emit, Expected, Resolve};
use crate::{CompileError, CompilerVisitor, Result};

/// The level-0 compiler visitor.
pub fn level0<C: CompileContext>() -> CompilerVisitor<C> {
    let kinds = well_known();
    Visitor::new()
        .with_fn(kinds.ast_unit, compile_unit::<C>)
        .with_fn(kinds.ast_stmt_list, compile_stmt_list::<C>)
        .with_fn(kinds.ast_stmt, compile_stmt::<C>)
        .with_fn(kinds.ast_expr_call, compile_call::<C>)
        .with_fn(kinds.ast_expr_identifier, compile_identifier::<C>)
        .with_fn(kinds.ast_expr_integer, compile_integer::<C>)
        .with_fn(kinds.ast_expr_string, compile_string::<C>)
        .with_fn(kinds.ast_expr_char, compile_char::<C>)
}

fn compile_unit<C: CompileContext>(
    vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let NodeData::Unit {
        stmts,
        line,
        column,
    } = node.data()
    else {
        return Err(CompileError::malformed(node.kind()));
    };
    if matches!(stmts.data(), NodeData::StmtList(list) if list.is_empty()) {
        return Ok(());
    }

    tracing::debug!(line, column, file = %cx.local().filename().display(), "compiling unit");
    cx.begin_unit(*line, *column)?;
    match vis.visit(cx, stmts) {
        Ok(()) => cx.end_unit(),
        Err(err) => {
            cx.abandon_unit();
            Err(err)
        }
    }
}

fn compile_stmt_list<C: CompileContext>(
    vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let NodeData::StmtList(stmts) = node.data() else {
        return Err(CompileError::malformed(node.kind()));
    };
    vis.visit_all(cx, stmts)
}

/// A statement evaluates its expression for effect and, when named, binds
/// the result as a variable for the rest of the unit.
fn compile_stmt<C: CompileContext>(
    vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let NodeData::Stmt { name, expr } = node.data() else {
        return Err(CompileError::malformed(node.kind()));
    };
    let Some(expr) = expr else {
        return Ok(());
    };

    cx.push_temporaries();
    let produced = if name.is_some() {
        cx.compile_expression(vis, expr, Expected::Inviolable)
            .map(Some)
    } else {
        cx.compile_expression_opt(vis, expr, Expected::Inviolable)
    };
    let cleaned = cx.pop_temporaries();
    let produced = produced?;
    cleaned?;

    if let Some((ty, value)) = produced {
        if name.is_some() {
            cx.local_mut().bind_variable(*name, ty, value);
        }
    }
    Ok(())
}

fn compile_call<C: CompileContext>(
    vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let NodeData::Call { callee, args } = node.data() else {
        return Err(CompileError::malformed(node.kind()));
    };

    if let Some(name) = callee.as_identifier() {
        if let Some(intrinsic) = cx.check_alias(name).and_then(|n| cx.find_intrinsic(n)) {
            tracing::trace!(intrinsic = name.as_str(), "expanding intrinsic");
            return intrinsic.call(vis, cx, args);
        }
    }

    let (callee_ty, callee_value) = cx.compile_expression(vis, callee, Expected::Unreference)?;
    let types = cx.global().types().clone();
    let fn_ty = if types.function_signature(callee_ty).is_some() {
        callee_ty
    } else {
        types
            .pointer_target(callee_ty)
            .filter(|&target| types.function_signature(target).is_some())
            .ok_or_else(|| CompileError::NotCallable {
                ty: types.display(callee_ty),
            })?
    };
    let sig = types
        .function_signature(fn_ty)
        .ok_or_else(|| CompileError::NotCallable {
            ty: types.display(fn_ty),
        })?;

    if args.len() < sig.params.len() || (!sig.variadic && args.len() > sig.params.len()) {
        return Err(CompileError::ArgumentCount {
            expected: sig.params.len(),
            found: args.len(),
        });
    }

    let mut values = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let expected = sig
            .params
            .get(i)
            .map_or(Expected::Unreference, |&param| Expected::Type(param));
        let (_, value) = cx.compile_expression(vis, arg, expected)?;
        values.push(value);
    }

    let native = cx.materialize(fn_ty)?;
    let returned = cx.with_module(|backend, module| {
        backend.build_call(module, &native, &callee_value, &values)
    })?;
    cx.adopt_result(sig.ret, returned)
}

fn compile_identifier<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let name = node
        .as_identifier()
        .ok_or_else(|| CompileError::malformed(node.kind()))?;
    match cx.obtain_identifier(name)? {
        Some((ty, value)) => cx.adopt_result(ty, value),
        None => Err(CompileError::IdentifierNotFound { name }),
    }
}

/// Type an integer literal by its target: the target type itself for
/// numeric targets, null for a pointer target and `0`, the referenced type
/// for reference targets, otherwise `int` (or `long_long` when it does not
/// fit).
fn compile_integer<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let value = node
        .as_integer()
        .ok_or_else(|| CompileError::malformed(node.kind()))?;
    let types = cx.global().types().clone();
    let common = *types.common();

    let default_ty = || {
        let int_bits = types.widths().int_bits();
        let fits = int_bits >= 64 || {
            let limit = 1i64 << (int_bits - 1);
            (-limit..limit).contains(&value)
        };
        if fits {
            common.int
        } else {
            common.long_long
        }
    };
    let numeric = |ty: TypeId| {
        types.int_info(ty).is_some() || types.kind(ty).is_some_and(|k| k.is_float())
    };

    let ty = match cx.local().expected() {
        Expected::Type(target) if numeric(target) => target,
        Expected::Type(target) if value == 0 && types.is_pointer(target) => {
            let native = cx.materialize(target)?;
            let null = cx.global().backend().const_null(&native);
            return cx.adopt_result(target, null);
        }
        Expected::Type(target) => match types.reference_target(target) {
            Some(inner) if numeric(inner) => inner,
            _ => default_ty(),
        },
        Expected::Inviolable | Expected::Unreference => default_ty(),
    };

    let native = cx.materialize(ty)?;
    let constant = if types.kind(ty).is_some_and(|k| k.is_float()) {
        #[expect(clippy::cast_precision_loss, reason = "literal converted to a float target")]
        let float = value as f64;
        cx.global().backend().const_float(&native, float)
    } else {
        cx.global().backend().const_int(&native, value)
    };
    cx.adopt_result(ty, constant)
}

fn compile_string<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let text = node
        .as_str()
        .ok_or_else(|| CompileError::malformed(node.kind()))?;
    let value = cx.with_module(|backend, module| backend.const_string(module, text))?;
    let char_ptr = cx.global().types().common().char_ptr;
    cx.adopt_result(char_ptr, value)
}

fn compile_char<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let NodeData::Char(ch) = node.data() else {
        return Err(CompileError::malformed(node.kind()));
    };
    let char32 = cx.global().types().common().char32;
    let native = cx.materialize(char32)?;
    let value = cx
        .global()
        .backend()
        .const_int(&native, i64::from(u32::from(*ch)));
    cx.adopt_result(char32, value)
}

#[cfg(test)]
mod tests;
