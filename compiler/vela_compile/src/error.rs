//! Compilation errors.
//!
//! Every error aborts the run. [`CompileError::category`] groups them the
//! way diagnostics report them.

use std::fmt;
use std::path::PathBuf;

use vela_backend::BackendError;
use vela_ir::{DispatchError, Symbol};
use vela_types::TypeStoreError;

use crate::cache::CacheError;
use crate::decls::DeclKind;

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// Error taxonomy for reporting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A name did not resolve.
    Lookup,
    /// A name was declared twice with different values.
    Redeclaration,
    /// The compiler or a language extension broke an internal rule.
    Contract,
    /// A file, cache or backend operation failed.
    Resource,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Lookup => "lookup error",
            ErrorCategory::Redeclaration => "redeclaration",
            ErrorCategory::Contract => "internal error",
            ErrorCategory::Resource => "resource error",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("identifier not found: {name}")]
    IdentifierNotFound { name: Symbol },

    #[error("type not found: {name}")]
    TypeNotFound { name: Symbol },

    #[error("{kind} `{name}` redeclared with a different value")]
    Redeclaration { kind: DeclKind, name: Symbol },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Types(#[from] TypeStoreError),

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error("`{ty}` is not callable")]
    NotCallable { ty: String },

    #[error("call expects {expected} argument(s), {found} given")]
    ArgumentCount { expected: usize, found: usize },

    #[error("{name}: {message}")]
    IntrinsicArgs { name: Symbol, message: String },

    #[error("`{kind}` expression produces no value")]
    NoValue { kind: Symbol },

    #[error("type `{name}` cannot be used as a value")]
    TypeAsValue { name: Symbol },

    #[error("malformed `{kind}` node")]
    MalformedNode { kind: Symbol },

    #[error("{what} stack underflow")]
    StackUnderflow { what: &'static str },

    #[error("no module is being built")]
    NoActiveModule,

    #[error("{operation} is not available in a target context")]
    Unsupported { operation: &'static str },

    #[error("corrupt unit manifest: {message}")]
    Manifest { message: String },

    #[error("import not found: {name}")]
    ImportNotFound { name: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CompileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompileError::IdentifierNotFound { .. } | CompileError::TypeNotFound { .. } => {
                ErrorCategory::Lookup
            }
            CompileError::Redeclaration { .. } => ErrorCategory::Redeclaration,
            CompileError::Types(TypeStoreError::BodyRedefined { .. }) => {
                ErrorCategory::Redeclaration
            }
            CompileError::Dispatch(_)
            | CompileError::Types(_)
            | CompileError::TypeMismatch { .. }
            | CompileError::NotCallable { .. }
            | CompileError::ArgumentCount { .. }
            | CompileError::IntrinsicArgs { .. }
            | CompileError::NoValue { .. }
            | CompileError::TypeAsValue { .. }
            | CompileError::MalformedNode { .. }
            | CompileError::StackUnderflow { .. }
            | CompileError::NoActiveModule
            | CompileError::Unsupported { .. }
            | CompileError::Manifest { .. } => ErrorCategory::Contract,
            CompileError::ImportNotFound { .. }
            | CompileError::Io { .. }
            | CompileError::Parse { .. }
            | CompileError::Cache(_)
            | CompileError::Backend(_) => ErrorCategory::Resource,
        }
    }

    pub(crate) fn malformed(kind: Symbol) -> Self {
        CompileError::MalformedNode { kind }
    }

    pub(crate) fn intrinsic(name: &str, message: impl Into<String>) -> Self {
        CompileError::IntrinsicArgs {
            name: Symbol::intern(name),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }
}
