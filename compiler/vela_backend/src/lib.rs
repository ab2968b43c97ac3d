//! Backend contract and reference JIT for the Vela compiler.
//!
//! [`traits`] is the contract the compiler core is written against. [`Jit`]
//! implements it with a small serializable IR ([`ir`]), a linker that binds
//! unit libraries in link order, and an interpreter for unit entry points
//! that can call host functions.

mod builder;
mod error;
pub mod ir;
mod jit;
mod native;
pub mod traits;
mod value;

pub use error::BackendError;
pub use ir::{Module, Operand};
pub use jit::Jit;
pub use native::{install_native_hooks, NativeType};
pub use traits::{
    Backend, BackendTypes, BuilderMethods, InsertPoint, JitBackend, JitMethods, TypeMethods,
    UnitHandle,
};
pub use value::{HostFn, HostMemory, NativeAddress, Pointer, RtValue};
