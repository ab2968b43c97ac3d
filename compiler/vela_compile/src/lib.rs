//! Compilation core of Vela.
//!
//! Source is compiled one top-level unit at a time. Each unit is compiled
//! by the visitor currently installed in the [`GlobalContext`], turned into
//! a backend module, and (in a [`Session`]) linked and run before the next
//! unit is compiled, so a unit can extend the language for the units that
//! follow it.
//!
//! # Modules
//!
//! - [`context`]: global and local contexts, resolution, emission,
//!   declarations
//! - [`compiler`]: level-0 compiler, type calculator and intrinsics
//! - [`manifest`]: declarations recorded by units
//! - `session` / `target`: the two concrete contexts
//! - `cache` / `import`: binary unit cache and import resolution

mod cache;
pub mod compiler;
mod config;
pub mod context;
mod decls;
mod error;
mod frontend;
mod import;
pub mod manifest;
mod scope;
mod session;
mod target;
mod temporaries;

#[cfg(test)]
mod test_helpers;

use vela_ir::Visitor;

pub use cache::{cache_path_for, is_cache_fresh, CacheError, CacheReader, CacheWriter, MAGIC};
pub use config::{SessionConfig, USE_CACHE_VAR};
pub use context::{
    CompileContext, Declare, Emit, Expected, GlobalContext, GlobalValue, LocalContext, Resolve,
};
pub use decls::{ConstValue, DeclKind, Declarations, Intrinsic, IntrinsicFn};
pub use error::{CompileError, ErrorCategory, Result};
pub use frontend::{Frontend, NodeSource, ParseError, UnitSource};
pub use import::{ImportPaths, IMPORT_PATH_VAR, SOURCE_EXTENSION};
pub use scope::{Binding, Scope};
pub use session::{Session, SessionStats};
pub use target::TargetContext;
pub use temporaries::{Cleaner, TemporaryStack};

/// Visitor type of the compiler and the type calculator.
pub type CompilerVisitor<C> = Visitor<C, CompileError>;
