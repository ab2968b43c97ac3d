//! Compilation contexts.
//!
//! A context is the pair of a [`GlobalContext`] (types, backend,
//! process-wide declarations, current visitors) and the [`LocalContext`] of
//! the file being compiled. Concrete contexts implement [`CompileContext`];
//! everything else is written once against that trait as the extension
//! traits [`Resolve`], [`Emit`] and [`Declare`].
//!
//! # Contexts
//!
//! - [`Session`](crate::Session): compiles, links and runs units in a JIT,
//!   with imports and the binary cache
//! - [`TargetContext`](crate::TargetContext): compiles units into one
//!   persistent module for another target, without running them

mod declare;
mod emit;
mod global;
mod local;
mod resolve;

use vela_backend::{Backend, BackendTypes, NativeAddress};
use vela_ir::Symbol;

pub use declare::Declare;
pub use emit::Emit;
pub use global::{GlobalContext, GlobalValue};
pub use local::{Expected, LocalContext};
pub use resolve::{Resolve, MAX_ALIAS_DEPTH};

use crate::manifest::DeclRecord;
use crate::Result;

/// Native type handle of a context's backend.
pub type NativeTypeOf<C> = <<C as CompileContext>::Backend as BackendTypes>::Type;

/// Native value handle of a context's backend.
pub type ValueOf<C> = <<C as CompileContext>::Backend as BackendTypes>::Value;

/// Module type of a context's backend.
pub type ModuleOf<C> = <<C as CompileContext>::Backend as BackendTypes>::Module;

/// What the level-0 compiler needs from a concrete context.
pub trait CompileContext: Sized + 'static {
    type Backend: Backend;

    fn global(&self) -> &GlobalContext<Self>;

    fn global_mut(&mut self) -> &mut GlobalContext<Self>;

    /// The local context of the file currently being compiled.
    fn local(&self) -> &LocalContext<Self>;

    fn local_mut(&mut self) -> &mut LocalContext<Self>;

    /// Both halves at once, for operations that build into the current
    /// module with the backend.
    fn split_mut(&mut self) -> (&mut GlobalContext<Self>, &mut LocalContext<Self>);

    // -- Symbol table (names are taken literally, no alias check) --

    fn find_symbol_value(&self, name: Symbol) -> Option<NativeAddress>;

    fn add_symbol_value(&mut self, name: Symbol, address: NativeAddress) -> Result<()>;

    // -- Unit lifecycle --

    /// Start compiling the unit at `line`:`column`.
    fn begin_unit(&mut self, line: u32, column: u32) -> Result<()>;

    /// Finish the current unit.
    fn end_unit(&mut self) -> Result<()>;

    /// Drop the current unit after a compile error.
    fn abandon_unit(&mut self);

    /// Note a declaration made by the current unit.
    fn record_declaration(&mut self, record: DeclRecord) -> Result<()>;

    /// Import the file `name`, merging its exports into the local context.
    fn import(&mut self, name: &str) -> Result<()>;
}
