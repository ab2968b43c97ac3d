//! Pre-interned names the compiler dispatches on.

use std::sync::OnceLock;

use crate::Symbol;

/// Every name interned when an interner is created.
pub(crate) const WELL_KNOWN_NAMES: &[&str] = &[
    // AST node kinds
    "ast_unit",
    "ast_stmt_list",
    "ast_stmt",
    "ast_expr_call",
    "ast_expr_identifier",
    "ast_expr_integer",
    "ast_expr_string",
    "ast_expr_char",
    // Builtin type names
    "void",
    "bool",
    "char",
    "short",
    "int",
    "unsigned",
    "long",
    "long_long",
    "intptr_t",
    "size_t",
    "char32_t",
    "uint64_t",
    "f16",
    "f32",
    "f64",
    "f128",
    "v_static_type_t",
    "v_static_type",
    // Type constructors
    "v_pointer",
    "v_reference",
    "v_array",
    "v_vector",
    "v_svector",
    "v_int",
    "v_uint",
    "v_function",
    "v_tuple",
    "v_variadic",
    // Level-0 intrinsics
    "v_import",
    "v_alias",
    "v_export_alias",
    "v_constant",
    "v_export_constant",
    "v_type",
    "v_export_type",
    "v_struct",
    "v_export_struct",
    "v_global",
    "v_export_global",
    "v_as",
    "v_sizeof",
    "v_add_symbol",
    "v_export_symbol",
];

/// Symbols for the node kinds built into the level-0 language.
#[derive(Debug, Clone, Copy)]
pub struct WellKnown {
    pub ast_unit: Symbol,
    pub ast_stmt_list: Symbol,
    pub ast_stmt: Symbol,
    pub ast_expr_call: Symbol,
    pub ast_expr_identifier: Symbol,
    pub ast_expr_integer: Symbol,
    pub ast_expr_string: Symbol,
    pub ast_expr_char: Symbol,
}

/// Node-kind symbols in the process-wide interner.
pub fn well_known() -> &'static WellKnown {
    static KINDS: OnceLock<WellKnown> = OnceLock::new();
    KINDS.get_or_init(|| WellKnown {
        ast_unit: Symbol::intern("ast_unit"),
        ast_stmt_list: Symbol::intern("ast_stmt_list"),
        ast_stmt: Symbol::intern("ast_stmt"),
        ast_expr_call: Symbol::intern("ast_expr_call"),
        ast_expr_identifier: Symbol::intern("ast_expr_identifier"),
        ast_expr_integer: Symbol::intern("ast_expr_integer"),
        ast_expr_string: Symbol::intern("ast_expr_string"),
        ast_expr_char: Symbol::intern("ast_expr_char"),
    })
}
