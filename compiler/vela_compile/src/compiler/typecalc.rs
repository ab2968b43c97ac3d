//! Level-0 type calculator.
//!
//! Computes the type a type expression denotes: a type name, or a call to
//! one of the type constructors. The result goes to the local context's
//! type slot (see [`Resolve::lookup_type`]).

use vela_ir::{well_known, Node, NodeData, NodeRef, Symbol, Visitor};
use vela_types::TypeId;

use crate::context::{CompileContext, Resolve};
use crate::{CompileError, CompilerVisitor, Result};

/// Marks a `v_function` type as variadic when given as its last argument.
const VARIADIC_MARKER: &str = "v_variadic";

pub fn level0<C: CompileContext>() -> CompilerVisitor<C> {
    let kinds = well_known();
    Visitor::new()
        .with_fn(kinds.ast_expr_identifier, type_of_identifier::<C>)
        .with_fn(kinds.ast_expr_call, type_of_constructor::<C>)
}

fn type_of_identifier<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let name = node
        .as_identifier()
        .ok_or_else(|| CompileError::malformed(node.kind()))?;
    let ty = cx
        .find_type(name)
        .ok_or(CompileError::TypeNotFound { name })?;
    cx.local_mut().set_type_result(ty);
    Ok(())
}

fn arity(ctor: Symbol, args: &[NodeRef], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let wanted = if min == max {
        format!("{min} argument(s)")
    } else {
        format!("{min} to {max} arguments")
    };
    Err(CompileError::IntrinsicArgs {
        name: ctor,
        message: format!("expects {wanted}, {} given", args.len()),
    })
}

/// A non-negative integer literal argument.
fn count(ctor: Symbol, node: &Node) -> Result<u64> {
    node.as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| CompileError::IntrinsicArgs {
            name: ctor,
            message: "expects a non-negative integer literal".into(),
        })
}

fn count_u32(ctor: Symbol, node: &Node) -> Result<u32> {
    u32::try_from(count(ctor, node)?).map_err(|_| CompileError::IntrinsicArgs {
        name: ctor,
        message: "count out of range".into(),
    })
}

fn type_of_constructor<C: CompileContext>(
    _vis: &CompilerVisitor<C>,
    cx: &mut C,
    node: &Node,
) -> Result<()> {
    let NodeData::Call { callee, args } = node.data() else {
        return Err(CompileError::malformed(node.kind()));
    };
    let ctor = callee
        .as_identifier()
        .ok_or_else(|| CompileError::malformed(node.kind()))?;
    let types = cx.global().types().clone();

    let ty: TypeId = match ctor.as_str() {
        "v_pointer" | "v_reference" => {
            arity(ctor, args, 1, 2)?;
            let elem = cx.lookup_type(&args[0])?;
            let addr_space = args.get(1).map(|n| count_u32(ctor, n)).transpose()?;
            let addr_space = addr_space.unwrap_or(0);
            if ctor.as_str() == "v_pointer" {
                types.pointer(elem, addr_space)
            } else {
                types.reference(elem, addr_space)
            }
        }
        "v_array" => {
            arity(ctor, args, 2, 2)?;
            let elem = cx.lookup_type(&args[0])?;
            types.array(elem, count(ctor, &args[1])?)
        }
        "v_vector" | "v_svector" => {
            arity(ctor, args, 2, 2)?;
            let elem = cx.lookup_type(&args[0])?;
            let lanes = count_u32(ctor, &args[1])?;
            if ctor.as_str() == "v_vector" {
                types.vector(elem, lanes)
            } else {
                types.svector(elem, lanes)
            }
        }
        "v_int" | "v_uint" => {
            arity(ctor, args, 1, 1)?;
            let bits = count_u32(ctor, &args[0])?;
            if bits == 0 {
                return Err(CompileError::IntrinsicArgs {
                    name: ctor,
                    message: "integer width must be positive".into(),
                });
            }
            if ctor.as_str() == "v_int" {
                types.int(bits)
            } else {
                types.uint(bits)
            }
        }
        "v_function" => {
            arity(ctor, args, 1, usize::MAX)?;
            let ret = cx.lookup_type(&args[0])?;
            let mut params = &args[1..];
            let variadic = params
                .last()
                .and_then(|n| n.as_identifier())
                .is_some_and(|name| name.as_str() == VARIADIC_MARKER);
            if variadic {
                params = &params[..params.len() - 1];
            }
            let params = params
                .iter()
                .map(|p| cx.lookup_type(p))
                .collect::<Result<Vec<_>>>()?;
            types.function(ret, &params, variadic)
        }
        "v_tuple" => {
            let elems = args
                .iter()
                .map(|e| cx.lookup_type(e))
                .collect::<Result<Vec<_>>>()?;
            types.tuple(&elems, false)
        }
        _ => return Err(CompileError::TypeNotFound { name: ctor }),
    };

    cx.local_mut().set_type_result(ty);
    Ok(())
}
