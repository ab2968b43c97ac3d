/// Errors raised while building, linking or running modules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("unresolved symbol `{name}` in unit `{unit}`")]
    UnresolvedSymbol { name: String, unit: String },

    #[error("symbol `{name}` is already defined")]
    DuplicateSymbol { name: String },

    #[error("symbol `{name}` is not {expected}")]
    SymbolKind { name: String, expected: &'static str },

    #[error("invalid module `{module}`: {message}")]
    InvalidModule { module: String, message: String },

    #[error("cannot encode module: {0}")]
    Encode(String),

    #[error("cannot decode module: {0}")]
    Decode(String),

    #[error("unknown unit handle {0}")]
    UnknownUnit(u32),

    #[error("execution of `{unit}` failed: {message}")]
    Execution { unit: String, message: String },
}
