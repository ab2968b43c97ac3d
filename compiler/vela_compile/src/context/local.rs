//! Per-file compilation state.

use std::path::{Path, PathBuf};

use vela_backend::InsertPoint;
use vela_ir::Symbol;
use vela_types::TypeId;

use crate::context::{CompileContext, ModuleOf, ValueOf};
use crate::decls::Declarations;
use crate::manifest::{DeclRecord, UnitManifest};
use crate::scope::Scope;
use crate::temporaries::{Cleaner, TemporaryStack};
use crate::{CompileError, Result};

/// What the consumer of an expression wants from it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    /// Keep the expression's own type.
    Inviolable,
    /// Keep its type, but load through a reference.
    Unreference,
    /// Convert to this type.
    Type(TypeId),
}

/// Where an expression handler leaves its result.
pub(crate) struct ResultSlot<V> {
    pub(crate) expected: Expected,
    pub(crate) produced: Option<(TypeId, V)>,
}

impl<V> ResultSlot<V> {
    pub(crate) fn new(expected: Expected) -> Self {
        ResultSlot {
            expected,
            produced: None,
        }
    }
}

/// State of one file being compiled.
pub struct LocalContext<C: CompileContext> {
    filename: PathBuf,
    pub(crate) decls: Declarations<C>,
    pub(crate) export_decls: Declarations<C>,
    pub(crate) vars: Scope<ValueOf<C>>,
    pub(crate) saved: Vec<(Declarations<C>, Scope<ValueOf<C>>)>,
    pub(crate) temporaries: TemporaryStack<C>,
    pub(crate) cleaners: Vec<Cleaner<C>>,
    pub(crate) result: ResultSlot<ValueOf<C>>,
    pub(crate) type_result: Option<TypeId>,
    modules: Vec<ModuleOf<C>>,
    pub(crate) builder_ips: Vec<InsertPoint>,
    manifest: UnitManifest,
}

impl<C: CompileContext> LocalContext<C> {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        LocalContext {
            filename: filename.into(),
            decls: Declarations::new(),
            export_decls: Declarations::new(),
            vars: Scope::new(),
            saved: Vec::new(),
            temporaries: TemporaryStack::new(),
            cleaners: Vec::new(),
            result: ResultSlot::new(Expected::Inviolable),
            type_result: None,
            modules: Vec::new(),
            builder_ips: Vec::new(),
            manifest: UnitManifest::default(),
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn decls(&self) -> &Declarations<C> {
        &self.decls
    }

    pub fn export_decls(&self) -> &Declarations<C> {
        &self.export_decls
    }

    /// Consume the context, keeping what it exported.
    pub fn into_exports(self) -> Declarations<C> {
        self.export_decls
    }

    pub fn variables(&self) -> &Scope<ValueOf<C>> {
        &self.vars
    }

    pub fn bind_variable(&mut self, name: Symbol, ty: TypeId, value: ValueOf<C>) {
        self.vars.bind(name, ty, value);
    }

    /// Result target of the expression being compiled.
    pub fn expected(&self) -> Expected {
        self.result.expected
    }

    /// Store a type computed by a type-calculator handler.
    pub fn set_type_result(&mut self, ty: TypeId) {
        self.type_result = Some(ty);
    }

    // -- Modules --

    pub fn push_module(&mut self, module: ModuleOf<C>) {
        self.modules.push(module);
    }

    pub fn pop_module(&mut self) -> Option<ModuleOf<C>> {
        self.modules.pop()
    }

    pub fn module(&self) -> Option<&ModuleOf<C>> {
        self.modules.last()
    }

    pub fn module_mut(&mut self) -> Result<&mut ModuleOf<C>> {
        self.modules.last_mut().ok_or(CompileError::NoActiveModule)
    }

    // -- Manifest --

    pub fn record(&mut self, record: DeclRecord) {
        self.manifest.push(record);
    }

    pub fn manifest(&self) -> &UnitManifest {
        &self.manifest
    }

    pub fn take_manifest(&mut self) -> UnitManifest {
        std::mem::take(&mut self.manifest)
    }

    pub fn add_cleaner(&mut self, cleaner: Cleaner<C>) {
        self.cleaners.push(cleaner);
    }
}
