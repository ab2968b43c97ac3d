//! Backend contract.
//!
//! The compiler core talks to code generation only through these traits.
//!
//! Trait hierarchy:
//! - `BackendTypes`: associated types for native types, values and modules
//! - `TypeMethods`: materialization hooks and layout queries
//! - `BuilderMethods`: module creation and instruction generation
//! - `JitMethods`: serialization, linking, execution and the symbol table
//!
//! `Backend` and `JitBackend` bundle them for generic code.

use std::fmt;

use vela_types::TypeStore;

use crate::{BackendError, NativeAddress};

/// Associated types for a code generation backend.
pub trait BackendTypes {
    type Type: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;
    type Value: Clone + fmt::Debug + PartialEq + 'static;
    type Module: fmt::Debug + 'static;
}

/// Type materialization and layout.
pub trait TypeMethods: BackendTypes {
    /// Install one materialization hook per type kind in `store`.
    ///
    /// Hooks must read target parameters from the store they are given so
    /// that stores with different widths materialize differently.
    fn install_type_hooks(&self, store: &TypeStore<Self::Type>);

    /// Allocation size in bytes; `None` for unsized types.
    fn size_of(&self, ty: &Self::Type) -> Option<u64>;

    fn align_of(&self, ty: &Self::Type) -> Option<u64>;
}

/// Builder insertion point within a module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct InsertPoint(pub(crate) Option<u32>);

/// Module creation and instruction generation.
pub trait BuilderMethods: BackendTypes {
    fn create_module(&self, name: &str) -> Self::Module;

    /// Add a `void()` function to `module` and position the builder at it.
    /// The first function begun is the module's entry.
    fn begin_function(&self, module: &mut Self::Module, name: &str);

    fn insert_point(&self, module: &Self::Module) -> InsertPoint;

    fn set_insert_point(&self, module: &mut Self::Module, ip: InsertPoint);

    // -- Constants --

    fn const_int(&self, ty: &Self::Type, value: i64) -> Self::Value;

    fn const_float(&self, ty: &Self::Type, value: f64) -> Self::Value;

    fn const_null(&self, ty: &Self::Type) -> Self::Value;

    /// Pointer to a NUL-terminated global copy of `value`.
    fn const_string(&self, module: &mut Self::Module, value: &str) -> Self::Value;

    /// The integer held by a constant, if it is one.
    fn const_int_value(&self, value: &Self::Value) -> Option<i64>;

    // -- Globals --

    /// Reference a global defined elsewhere; yields its address.
    fn declare_global(&self, module: &mut Self::Module, name: &str, ty: &Self::Type)
        -> Self::Value;

    /// Define a zero-initialized global; yields its address.
    fn define_global(&self, module: &mut Self::Module, name: &str, ty: &Self::Type) -> Self::Value;

    /// Reference a function defined elsewhere.
    fn declare_function(
        &self,
        module: &mut Self::Module,
        name: &str,
        fn_ty: &Self::Type,
    ) -> Self::Value;

    // -- Instructions --

    fn build_alloca(&self, module: &mut Self::Module, ty: &Self::Type) -> Self::Value;

    fn build_load(&self, module: &mut Self::Module, ty: &Self::Type, ptr: &Self::Value)
        -> Self::Value;

    fn build_store(&self, module: &mut Self::Module, value: &Self::Value, ptr: &Self::Value);

    fn build_call(
        &self,
        module: &mut Self::Module,
        fn_ty: &Self::Type,
        callee: &Self::Value,
        args: &[Self::Value],
    ) -> Self::Value;

    /// Resize an integer; `signed` selects sign extension of the source.
    fn build_int_cast(
        &self,
        module: &mut Self::Module,
        value: &Self::Value,
        to: &Self::Type,
        signed: bool,
    ) -> Self::Value;

    fn build_pointer_cast(
        &self,
        module: &mut Self::Module,
        value: &Self::Value,
        to: &Self::Type,
    ) -> Self::Value;

    fn build_ret_void(&self, module: &mut Self::Module);

    fn verify_module(&self, module: &Self::Module) -> Result<(), BackendError>;
}

/// Handle of a unit linked into a JIT.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitHandle(pub(crate) u32);

impl UnitHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Serialization, linking and execution.
pub trait JitMethods: BuilderMethods {
    type HostFunction;

    fn attach_metadata(&self, module: &mut Self::Module, key: &str, bytes: Vec<u8>);

    fn module_metadata<'m>(&self, module: &'m Self::Module, key: &str) -> Option<&'m [u8]>;

    fn serialize_module(&self, module: &Self::Module) -> Result<Vec<u8>, BackendError>;

    fn deserialize_module(&self, bytes: &[u8]) -> Result<Self::Module, BackendError>;

    /// Add `module` as a new unit library, resolving its undefined
    /// references against itself, then the link-order queue (most recent
    /// unit first), then the process-wide symbol table.
    fn link_module(&mut self, module: Self::Module) -> Result<UnitHandle, BackendError>;

    /// Execute the unit's entry function.
    fn run_unit(&mut self, unit: UnitHandle) -> Result<(), BackendError>;

    /// Publish the unit's definitions in the process-wide symbol table;
    /// returns the names published.
    fn flush_unit_symbols(&mut self, unit: UnitHandle) -> Result<Vec<String>, BackendError>;

    fn lookup_native_symbol(&self, name: &str) -> Option<NativeAddress>;

    fn add_host_function(
        &mut self,
        name: &str,
        function: Self::HostFunction,
    ) -> Result<NativeAddress, BackendError>;

    /// Names in the process-wide symbol table, sorted.
    fn native_symbols(&self) -> Vec<String>;
}

/// Everything the compiler core needs from a backend.
pub trait Backend: TypeMethods + BuilderMethods {}

impl<T: TypeMethods + BuilderMethods> Backend for T {}

/// A backend that can also link and run units in process.
pub trait JitBackend: Backend + JitMethods {}

impl<T: Backend + JitMethods> JitBackend for T {}
