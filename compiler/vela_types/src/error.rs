use vela_ir::Symbol;

use crate::TypeKind;

/// Errors raised by [`TypeStore`](crate::TypeStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeStoreError {
    #[error("unknown type handle {id}")]
    UnknownType { id: u32 },

    #[error("struct `{name}` is opaque")]
    OpaqueStruct { name: Symbol },

    #[error("struct `{name}` already has a different body")]
    BodyRedefined { name: Symbol },

    #[error("`{ty}` is not a named struct")]
    NotANamedStruct { ty: String },

    #[error("`{ty}` is not a struct")]
    NotAStruct { ty: String },

    #[error("no materialization hook for {kind} types")]
    NoMaterializeHook { kind: TypeKind },

    #[error("`{ty}` is materialized in terms of itself")]
    RecursiveMaterialization { ty: String },

    #[error("cannot materialize `{ty}`: {message}")]
    Materialize { ty: String, message: String },

    #[error("invalid target widths: int {int_size}, long {long_size}, pointer {ptr_size}")]
    InvalidWidths {
        int_size: u32,
        long_size: u32,
        ptr_size: u32,
    },
}
