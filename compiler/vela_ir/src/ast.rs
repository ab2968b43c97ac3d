//! AST nodes handed to the compiler by a frontend.
//!
//! Nodes are tagged with a kind [`Symbol`]; the visitor dispatches on that
//! tag alone, so extensions can introduce new node kinds at run time by
//! building [`NodeData::Extension`] nodes under a fresh kind.

use std::rc::Rc;

use crate::well_known::well_known;
use crate::Symbol;

/// Shared node handle.
pub type NodeRef = Rc<Node>;

/// A tagged AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: Symbol,
    data: NodeData,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// One top-level compilation unit with its source position.
    Unit {
        stmts: NodeRef,
        line: u32,
        column: u32,
    },
    StmtList(Vec<NodeRef>),
    /// `name = expr;`, `expr;`, or the empty statement `;`.
    Stmt {
        name: Symbol,
        expr: Option<NodeRef>,
    },
    Call {
        callee: NodeRef,
        args: Vec<NodeRef>,
    },
    Identifier(Symbol),
    Integer(i64),
    String(Box<str>),
    Char(char),
    /// Children of a node kind introduced by a language extension.
    Extension(Vec<NodeRef>),
}

impl Node {
    pub fn new(kind: Symbol, data: NodeData) -> NodeRef {
        Rc::new(Node { kind, data })
    }

    pub fn unit(stmts: Vec<NodeRef>, line: u32, column: u32) -> NodeRef {
        Node::new(
            well_known().ast_unit,
            NodeData::Unit {
                stmts: Node::stmt_list(stmts),
                line,
                column,
            },
        )
    }

    pub fn stmt_list(stmts: Vec<NodeRef>) -> NodeRef {
        Node::new(well_known().ast_stmt_list, NodeData::StmtList(stmts))
    }

    pub fn stmt(name: Symbol, expr: Option<NodeRef>) -> NodeRef {
        Node::new(well_known().ast_stmt, NodeData::Stmt { name, expr })
    }

    pub fn call(callee: NodeRef, args: Vec<NodeRef>) -> NodeRef {
        Node::new(well_known().ast_expr_call, NodeData::Call { callee, args })
    }

    pub fn identifier(name: Symbol) -> NodeRef {
        Node::new(well_known().ast_expr_identifier, NodeData::Identifier(name))
    }

    pub fn integer(value: i64) -> NodeRef {
        Node::new(well_known().ast_expr_integer, NodeData::Integer(value))
    }

    pub fn string(value: impl Into<Box<str>>) -> NodeRef {
        Node::new(well_known().ast_expr_string, NodeData::String(value.into()))
    }

    pub fn char(value: char) -> NodeRef {
        Node::new(well_known().ast_expr_char, NodeData::Char(value))
    }

    pub fn extension(kind: Symbol, children: Vec<NodeRef>) -> NodeRef {
        Node::new(kind, NodeData::Extension(children))
    }

    /// Shorthand for `callee(args...)` with an identifier callee.
    pub fn call_named(callee: &str, args: Vec<NodeRef>) -> NodeRef {
        Node::call(Node::identifier(Symbol::intern(callee)), args)
    }

    #[inline]
    pub fn kind(&self) -> Symbol {
        self.kind
    }

    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn as_identifier(&self) -> Option<Symbol> {
        match self.data {
            NodeData::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.data {
            NodeData::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            NodeData::String(value) => Some(value),
            _ => None,
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<NodeRef> {
        match &self.data {
            NodeData::Unit { stmts, .. } => vec![Rc::clone(stmts)],
            NodeData::StmtList(items) | NodeData::Extension(items) => items.clone(),
            NodeData::Stmt { expr, .. } => expr.iter().cloned().collect(),
            NodeData::Call { callee, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(Rc::clone(callee));
                out.extend(args.iter().cloned());
                out
            }
            NodeData::Identifier(_)
            | NodeData::Integer(_)
            | NodeData::String(_)
            | NodeData::Char(_) => Vec::new(),
        }
    }
}
