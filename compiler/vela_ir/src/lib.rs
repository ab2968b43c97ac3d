//! Core IR vocabulary for the Vela compiler.
//!
//! - [`Symbol`]: interned string handle, `0` meaning "no symbol"
//! - [`SymbolInterner`]: sharded, append-only string interner
//! - [`ast`]: tagged AST nodes produced by a frontend
//! - [`Visitor`]: persistent kind-to-handler map used for every AST walk

pub mod ast;
mod interner;
mod symbol;
pub mod visitor;
mod well_known;

pub use ast::{Node, NodeData, NodeRef};
pub use interner::{interner, InternError, SharedInterner, SymbolInterner, SymbolLookup};
pub use symbol::Symbol;
pub use visitor::{DispatchError, Handler, Visitor};
pub use well_known::{well_known, WellKnown};
