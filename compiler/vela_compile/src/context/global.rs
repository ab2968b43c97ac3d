//! Process-wide compilation state.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use vela_backend::TypeMethods;
use vela_ir::{Handler, Symbol};
use vela_types::{CommonTypes, SharedTypeStore, TargetWidths, TypeId, TypeStore};

use crate::compiler::{intrinsics, level0, typecalc};
use crate::context::resolve::follow_aliases;
use crate::context::{CompileContext, NativeTypeOf};
use crate::decls::{ConstValue, Declarations, Intrinsic};
use crate::{CompileError, CompilerVisitor, Result};

/// Names of the builtin types, declared as type-valued constants.
fn builtin_types(common: &CommonTypes) -> [(&'static str, TypeId); 17] {
    [
        ("void", common.void),
        ("bool", common.bool),
        ("char", common.char),
        ("short", common.short),
        ("int", common.int),
        ("unsigned", common.unsigned),
        ("long", common.long),
        ("long_long", common.long_long),
        ("intptr_t", common.intptr),
        ("size_t", common.size),
        ("char32_t", common.char32),
        ("uint64_t", common.uint64),
        ("f16", common.f16),
        ("f32", common.f32),
        ("f64", common.f64),
        ("f128", common.f128),
        ("v_static_type_t", common.static_type),
    ]
}

/// What a global name resolved to.
pub enum GlobalValue<C> {
    /// A native symbol, addressed by this name once linked.
    Symbol(Symbol),
    Constant(ConstValue),
    Intrinsic(Intrinsic<C>),
}

/// State shared by every file compiled in one context: the Type Store, the
/// backend, declarations visible everywhere, the files already imported,
/// and the visitors currently in force.
pub struct GlobalContext<C: CompileContext> {
    types: SharedTypeStore<NativeTypeOf<C>>,
    backend: C::Backend,
    decls: Declarations<C>,
    /// Canonical path -> declarations the file exported.
    imported: FxHashMap<PathBuf, Declarations<C>>,
    compiler: CompilerVisitor<C>,
    type_calc: CompilerVisitor<C>,
}

impl<C: CompileContext> GlobalContext<C> {
    /// A context for `widths` with builtin types, level-0 intrinsics and
    /// level-0 visitors installed.
    pub fn new(backend: C::Backend, widths: TargetWidths) -> Result<Self> {
        let store = TypeStore::new(widths);
        backend.install_type_hooks(&store);
        let types = SharedTypeStore::new(store);

        let mut decls = Declarations::new();
        let static_type = types.common().static_type;
        for (name, ty) in builtin_types(types.common()) {
            decls.insert_constant(Symbol::intern(name), static_type, ConstValue::Type(ty))?;
        }
        intrinsics::register(&mut decls)?;

        tracing::debug!(
            int = widths.int_size,
            long = widths.long_size,
            ptr = widths.ptr_size,
            declarations = decls.len(),
            "global context ready"
        );
        Ok(GlobalContext {
            types,
            backend,
            decls,
            imported: FxHashMap::default(),
            compiler: level0(),
            type_calc: typecalc::level0(),
        })
    }

    pub fn types(&self) -> &SharedTypeStore<NativeTypeOf<C>> {
        &self.types
    }

    pub fn backend(&self) -> &C::Backend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut C::Backend {
        &mut self.backend
    }

    pub fn decls(&self) -> &Declarations<C> {
        &self.decls
    }

    // -- Declarations --

    pub fn declare_alias(&mut self, name: Symbol, target: Symbol) -> Result<()> {
        self.decls.insert_alias(name, target)
    }

    pub fn declare_constant(&mut self, name: Symbol, ty: TypeId, value: ConstValue) -> Result<()> {
        self.decls.insert_constant(name, ty, value)
    }

    pub fn declare_symbol(&mut self, name: Symbol, ty: TypeId) -> Result<()> {
        self.decls.insert_symbol(name, ty)
    }

    pub fn declare_intrinsic(&mut self, name: Symbol, intrinsic: Intrinsic<C>) -> Result<()> {
        self.decls.insert_intrinsic(name, intrinsic)
    }

    /// Follow aliases among global declarations.
    pub fn check_alias(&self, name: Symbol) -> Option<Symbol> {
        follow_aliases(name, |n| self.decls.alias(n))
    }

    /// Type and value of a global name, looking through aliases. Symbols
    /// are checked first, then constants, then intrinsics; intrinsics have
    /// type `void`.
    pub fn resolve_symbol(&self, name: Symbol) -> Option<(TypeId, GlobalValue<C>)> {
        let name = self.check_alias(name)?;
        if let Some(ty) = self.decls.symbol(name) {
            return Some((ty, GlobalValue::Symbol(name)));
        }
        if let Some((ty, value)) = self.decls.constant(name) {
            return Some((*ty, GlobalValue::Constant(value.clone())));
        }
        self.decls.intrinsic(name).map(|intrinsic| {
            let void = self.types.common().void;
            (void, GlobalValue::Intrinsic(intrinsic.clone()))
        })
    }

    // -- Visitors --

    /// The compiler visitor in force.
    pub fn compiler(&self) -> CompilerVisitor<C> {
        self.compiler.clone()
    }

    /// Replace the compiler visitor; units that start afterwards use it.
    pub fn set_compiler(&mut self, compiler: CompilerVisitor<C>) {
        self.compiler = compiler;
    }

    pub fn extend_compiler(&mut self, kind: Symbol, handler: Handler<C, CompileError>) {
        self.compiler = self.compiler.with_handler(kind, handler);
    }

    pub fn type_calculator(&self) -> CompilerVisitor<C> {
        self.type_calc.clone()
    }

    pub fn set_type_calculator(&mut self, type_calc: CompilerVisitor<C>) {
        self.type_calc = type_calc;
    }

    pub fn extend_type_calculator(&mut self, kind: Symbol, handler: Handler<C, CompileError>) {
        self.type_calc = self.type_calc.with_handler(kind, handler);
    }

    // -- Imports --

    pub fn is_imported(&self, path: &Path) -> bool {
        self.imported.contains_key(path)
    }

    /// Mark `path` imported with no exports yet. Done before the file is
    /// compiled, so an import cycle sees the file as already imported.
    pub fn mark_imported(&mut self, path: PathBuf) {
        self.imported.entry(path).or_default();
    }

    pub fn record_exports(&mut self, path: PathBuf, exports: Declarations<C>) {
        self.imported.insert(path, exports);
    }

    pub fn imported_exports(&self, path: &Path) -> Option<&Declarations<C>> {
        self.imported.get(path)
    }

    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }
}
