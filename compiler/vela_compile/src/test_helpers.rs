//! AST builders and a JIT session for unit tests.

use std::path::Path;
use std::rc::Rc;

use vela_backend::{HostMemory, Jit, RtValue};
use vela_ir::{Node, NodeRef, Symbol};

use crate::{Frontend, NodeSource, Session, SessionConfig, UnitSource};

pub(crate) type JitSession = Session<Jit>;

/// Frontend for sessions fed with nodes directly.
struct NoSource;

impl Frontend for NoSource {
    fn open(&self, _path: &Path, _text: String) -> Box<dyn UnitSource> {
        Box::new(NodeSource::new(Vec::new()))
    }
}

pub(crate) fn session() -> JitSession {
    Session::new(Jit::new(), SessionConfig::default(), Rc::new(NoSource)).unwrap()
}

pub(crate) fn id(name: &str) -> NodeRef {
    Node::identifier(Symbol::intern(name))
}

pub(crate) fn int(value: i64) -> NodeRef {
    Node::integer(value)
}

pub(crate) fn call(callee: &str, args: Vec<NodeRef>) -> NodeRef {
    Node::call_named(callee, args)
}

pub(crate) fn stmt(expr: NodeRef) -> NodeRef {
    Node::stmt(Symbol::NONE, Some(expr))
}

pub(crate) fn named(name: &str, expr: NodeRef) -> NodeRef {
    Node::stmt(Symbol::intern(name), Some(expr))
}

pub(crate) fn unit(stmts: Vec<NodeRef>) -> NodeRef {
    Node::unit(stmts, 1, 1)
}

/// `v_global(name, ty, init)` as a statement.
pub(crate) fn global(name: &str, ty: NodeRef, init: NodeRef) -> NodeRef {
    stmt(call("v_global", vec![id(name), ty, init]))
}

/// Run each statement list as its own unit, all in the session's current
/// local context.
pub(crate) fn run(session: &mut JitSession, units: Vec<Vec<NodeRef>>) -> crate::Result<()> {
    for stmts in units {
        if let Some(bytes) = session.compile_unit(&unit(stmts))? {
            session.run_unit(&bytes)?;
        }
    }
    Ok(())
}

pub(crate) fn read(session: &JitSession, name: &str) -> Option<RtValue> {
    session.backend().read_global(name).cloned()
}

/// Host `add(int, int) -> int`.
pub(crate) fn add_host_add(session: &mut JitSession) {
    let types = session.types().clone();
    let int = types.common().int;
    let ty = types.function(int, &[int, int], false);
    session
        .add_host_function(
            "add",
            ty,
            Rc::new(
                |_: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
                    let sum: i64 = args.iter().filter_map(RtValue::as_i64).sum();
                    Ok(RtValue::int(32, sum))
                },
            ),
        )
        .unwrap();
}
