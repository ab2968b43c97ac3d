//! Extensible visitor: a persistent map from node kind to handler.
//!
//! A [`Visitor`] value never changes. Adding a handler produces a new
//! visitor that shares structure with the old one, so code holding the old
//! value keeps dispatching exactly as before while newly started work picks
//! up the extension.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Node, NodeRef};
use crate::Symbol;

/// Handler for one node kind.
///
/// Receives the visitor that dispatched it, so nested nodes are visited
/// with the same visitor value.
pub type Handler<Cx, E> = Rc<dyn Fn(&Visitor<Cx, E>, &mut Cx, &Node) -> Result<(), E>>;

/// Dispatch to a node kind with no registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchError {
    pub kind: Symbol,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no handler registered for node kind `{}`", self.kind)
    }
}

impl std::error::Error for DispatchError {}

/// Immutable kind-to-handler map.
pub struct Visitor<Cx, E> {
    handlers: im::HashMap<Symbol, Handler<Cx, E>>,
}

impl<Cx, E> Clone for Visitor<Cx, E> {
    fn clone(&self) -> Self {
        Visitor {
            handlers: self.handlers.clone(),
        }
    }
}

impl<Cx, E> Default for Visitor<Cx, E> {
    fn default() -> Self {
        Visitor {
            handlers: im::HashMap::new(),
        }
    }
}

impl<Cx, E> fmt::Debug for Visitor<Cx, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("Visitor").field("kinds", &kinds).finish()
    }
}

impl<Cx, E> Visitor<Cx, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new visitor with `handler` registered for `kind`, replacing any
    /// previous handler for that kind.
    #[must_use]
    pub fn with_handler(&self, kind: Symbol, handler: Handler<Cx, E>) -> Self {
        Visitor {
            handlers: self.handlers.update(kind, handler),
        }
    }

    /// Like [`Visitor::with_handler`], boxing a closure.
    #[must_use]
    pub fn with_fn<F>(&self, kind: Symbol, handler: F) -> Self
    where
        F: Fn(&Visitor<Cx, E>, &mut Cx, &Node) -> Result<(), E> + 'static,
    {
        self.with_handler(kind, Rc::new(handler))
    }

    /// A new visitor without a handler for `kind`.
    #[must_use]
    pub fn without_handler(&self, kind: Symbol) -> Self {
        Visitor {
            handlers: self.handlers.without(&kind),
        }
    }

    pub fn handler(&self, kind: Symbol) -> Option<&Handler<Cx, E>> {
        self.handlers.get(&kind)
    }

    pub fn handles(&self, kind: Symbol) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<Cx, E: From<DispatchError>> Visitor<Cx, E> {
    /// Dispatch `node` to the handler registered for its kind.
    pub fn visit(&self, cx: &mut Cx, node: &Node) -> Result<(), E> {
        let kind = node.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            return Err(DispatchError { kind }.into());
        };
        let handler = Rc::clone(handler);
        tracing::trace!(kind = kind.as_str(), "dispatch");
        vela_stack::ensure_sufficient_stack(|| handler(self, cx, node))
    }

    /// Visit each node in order, stopping at the first error.
    pub fn visit_all(&self, cx: &mut Cx, nodes: &[NodeRef]) -> Result<(), E> {
        nodes.iter().try_for_each(|node| self.visit(cx, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeData;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Dispatch(Symbol),
    }

    impl From<DispatchError> for TestError {
        fn from(err: DispatchError) -> Self {
            TestError::Dispatch(err.kind)
        }
    }

    type Log = Vec<String>;

    fn logging_visitor() -> Visitor<Log, TestError> {
        Visitor::new()
            .with_fn(Symbol::intern("ast_expr_integer"), |_, log: &mut Log, node| {
                log.push(format!("int {}", node.as_integer().unwrap_or_default()));
                Ok(())
            })
            .with_fn(Symbol::intern("ast_expr_call"), |vis, log: &mut Log, node| {
                log.push("call".to_owned());
                if let NodeData::Call { args, .. } = node.data() {
                    vis.visit_all(log, args)?;
                }
                Ok(())
            })
    }

    #[test]
    fn dispatches_by_kind_and_recurses() {
        let vis = logging_visitor();
        let mut log = Log::new();
        let node = Node::call_named("f", vec![Node::integer(1), Node::integer(2)]);
        vis.visit(&mut log, &node).unwrap();
        assert_eq!(log, vec!["call", "int 1", "int 2"]);
    }

    #[test]
    fn unregistered_kind_is_dispatch_error() {
        let vis = logging_visitor();
        let mut log = Log::new();
        let err = vis.visit(&mut log, &Node::string("x")).unwrap_err();
        assert_eq!(err, TestError::Dispatch(Symbol::intern("ast_expr_string")));
    }

    #[test]
    fn extension_leaves_original_untouched() {
        let base = logging_visitor();
        let kind = Symbol::intern("ast_expr_string");
        let extended = base.with_fn(kind, |_, log: &mut Log, _| {
            log.push("string".to_owned());
            Ok(())
        });

        assert!(!base.handles(kind));
        assert!(extended.handles(kind));
        assert_eq!(base.len() + 1, extended.len());

        let mut log = Log::new();
        extended.visit(&mut log, &Node::string("s")).unwrap();
        assert_eq!(log, vec!["string"]);
        assert!(base.visit(&mut log, &Node::string("s")).is_err());

        let shrunk = extended.without_handler(kind);
        assert!(!shrunk.handles(kind));
        assert!(extended.handles(kind));
    }

    #[test]
    fn replacing_a_handler_keeps_kind_count() {
        let base = logging_visitor();
        let kind = Symbol::intern("ast_expr_integer");
        let replaced = base.with_fn(kind, |_, log: &mut Log, _| {
            log.push("replaced".to_owned());
            Ok(())
        });
        assert_eq!(base.len(), replaced.len());

        let mut log = Log::new();
        base.visit(&mut log, &Node::integer(7)).unwrap();
        replaced.visit(&mut log, &Node::integer(7)).unwrap();
        assert_eq!(log, vec!["int 7", "replaced"]);
    }
}
