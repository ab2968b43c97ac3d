//! JIT session.
//!
//! A [`Session`] compiles source files unit by unit. Each unit becomes a
//! module that is serialized, linked into the JIT, run, and flushed into
//! the process-wide symbol table before the next unit is compiled; then
//! the declarations it recorded take effect. Imported files go through the
//! binary cache.

use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use vela_backend::{BackendError, JitBackend, NativeAddress};
use vela_ir::{Node, NodeRef, Symbol};
use vela_types::{SharedTypeStore, TypeId};

use crate::cache::{cache_path_for, is_cache_fresh, CacheReader, CacheWriter};
use crate::context::{CompileContext, Declare, Emit, GlobalContext, LocalContext, NativeTypeOf};
use crate::frontend::{Frontend, NodeSource, UnitSource};
use crate::manifest::{DeclRecord, UnitManifest, METADATA_KEY};
use crate::{CompileError, Result, SessionConfig};

/// Work done by a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub units_compiled: usize,
    pub units_loaded_from_cache: usize,
    /// Imported files compiled from source, in order.
    pub files_compiled: Vec<PathBuf>,
}

pub struct Session<B: JitBackend + 'static> {
    global: GlobalContext<Self>,
    local: LocalContext<Self>,
    config: SessionConfig,
    frontend: Rc<dyn Frontend>,
    symbols: FxHashMap<Symbol, NativeAddress>,
    /// Serialized module of the unit that just finished compiling.
    pending_unit: Option<Vec<u8>>,
    stats: SessionStats,
}

impl<B: JitBackend + 'static> Session<B> {
    pub fn new(backend: B, config: SessionConfig, frontend: Rc<dyn Frontend>) -> Result<Self> {
        let global = GlobalContext::new(backend, config.widths)?;
        Ok(Session {
            global,
            local: LocalContext::new("<main>"),
            config,
            frontend,
            symbols: FxHashMap::default(),
            pending_unit: None,
            stats: SessionStats::default(),
        })
    }

    pub fn types(&self) -> &SharedTypeStore<NativeTypeOf<Self>> {
        self.global.types()
    }

    pub fn backend(&self) -> &B {
        self.global.backend()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Names in the process-wide symbol table, sorted.
    pub fn native_symbols(&self) -> Vec<String> {
        self.global.backend().native_symbols()
    }

    /// Make a host function callable from Vela code as `name`, of function
    /// type `ty`.
    pub fn add_host_function(
        &mut self,
        name: &str,
        ty: TypeId,
        function: B::HostFunction,
    ) -> Result<()> {
        let address = self.global.backend_mut().add_host_function(name, function)?;
        let name = Symbol::intern(name);
        self.add_symbol_value(name, address)?;
        self.global.declare_symbol(name, ty)
    }

    // -- Units --

    /// Compile one unit node; returns its serialized module, or `None` when
    /// the unit was empty.
    pub fn compile_unit(&mut self, unit: &Node) -> Result<Option<Vec<u8>>> {
        let compiler = self.global.compiler();
        compiler.visit(self, unit)?;
        Ok(self.pending_unit.take())
    }

    /// Link, run and flush a serialized unit, then apply the declarations
    /// it recorded.
    pub fn run_unit(&mut self, bytes: &[u8]) -> Result<()> {
        let backend = self.global.backend_mut();
        let module = backend.deserialize_module(bytes)?;
        let manifest = match backend.module_metadata(&module, METADATA_KEY) {
            Some(encoded) => UnitManifest::decode(encoded)?,
            None => UnitManifest::default(),
        };

        let unit = backend.link_module(module)?;
        backend.run_unit(unit)?;
        let published = backend.flush_unit_symbols(unit)?;
        for name in &published {
            if let Some(address) = backend.lookup_native_symbol(name) {
                self.symbols.insert(Symbol::intern(name), address);
            }
        }
        tracing::debug!(
            unit = unit.index(),
            published = published.len(),
            records = manifest.records.len(),
            "unit ran"
        );

        for record in manifest.records {
            self.apply_record(record)?;
        }
        Ok(())
    }

    /// Compile and run every unit `source` yields, appending each to
    /// `cache` when given.
    fn run_units(
        &mut self,
        path: &Path,
        mut source: Box<dyn UnitSource>,
        mut cache: Option<&mut CacheWriter>,
    ) -> Result<()> {
        loop {
            let unit = source.next_unit().map_err(|err| CompileError::Parse {
                path: path.to_path_buf(),
                line: err.line,
                column: err.column,
                message: err.message,
            })?;
            let Some(unit) = unit else {
                return Ok(());
            };
            let Some(bytes) = self.compile_unit(&unit)? else {
                continue;
            };
            if let Some(writer) = cache.as_deref_mut() {
                writer.write_record(&bytes)?;
            }
            self.run_unit(&bytes)?;
        }
    }

    // -- Main sources --

    /// Run `f` in a fresh local context for `path`. The context's cleaners
    /// run afterwards, even when `f` failed, and the previous context is
    /// restored; the finished context is handed back with the outcome.
    fn in_file_context<T>(
        &mut self,
        path: &Path,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> (Result<T>, LocalContext<Self>) {
        let outer = mem::replace(&mut self.local, LocalContext::new(path));
        let outcome = f(self);
        let cleaned = self.run_context_cleaners();
        let inner = mem::replace(&mut self.local, outer);
        (outcome.and_then(|value| cleaned.map(|()| value)), inner)
    }

    /// Compile and run `text` as the main file `path`. Every main file gets
    /// its own local context, and main files never use the binary cache.
    pub fn run_source(&mut self, path: impl Into<PathBuf>, text: String) -> Result<()> {
        let path = path.into();
        let source = self.frontend.open(&path, text);
        let (outcome, _) = self.in_file_context(&path, |s| s.run_units(&path, source, None));
        outcome
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_file(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|e| CompileError::io(&path, e))?;
        self.run_source(path, text)
    }

    /// Compile and run already-built unit nodes as the main file.
    pub fn run_nodes(&mut self, path: impl Into<PathBuf>, units: Vec<NodeRef>) -> Result<()> {
        let path = path.into();
        let source = Box::new(NodeSource::new(units));
        let (outcome, _) = self.in_file_context(&path, |s| s.run_units(&path, source, None));
        outcome
    }

    // -- Imports --

    /// Compile an imported file, from its cache when fresh.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %path.display()))]
    fn compile_import(&mut self, path: &Path) -> Result<()> {
        let cache = cache_path_for(path);
        if self.config.use_cache && is_cache_fresh(path, &cache) {
            tracing::debug!(file = %path.display(), "loading units from cache");
            for unit in CacheReader::open(&cache)? {
                self.run_unit(&unit?)?;
                self.stats.units_loaded_from_cache += 1;
            }
            return Ok(());
        }

        let text = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        let mut writer = if self.config.write_cache {
            match CacheWriter::create(&cache) {
                Ok(writer) => Some(writer),
                Err(err) => {
                    tracing::warn!(%err, "not caching import");
                    None
                }
            }
        } else {
            None
        };

        tracing::debug!(file = %path.display(), "compiling import");
        let source = self.frontend.open(path, text);
        self.run_units(path, source, writer.as_mut())?;
        self.stats.files_compiled.push(path.to_path_buf());
        if let Some(writer) = writer {
            writer.finish()?;
        }
        Ok(())
    }
}

impl<B: JitBackend + 'static> CompileContext for Session<B> {
    type Backend = B;

    fn global(&self) -> &GlobalContext<Self> {
        &self.global
    }

    fn global_mut(&mut self) -> &mut GlobalContext<Self> {
        &mut self.global
    }

    fn local(&self) -> &LocalContext<Self> {
        &self.local
    }

    fn local_mut(&mut self) -> &mut LocalContext<Self> {
        &mut self.local
    }

    fn split_mut(&mut self) -> (&mut GlobalContext<Self>, &mut LocalContext<Self>) {
        (&mut self.global, &mut self.local)
    }

    fn find_symbol_value(&self, name: Symbol) -> Option<NativeAddress> {
        self.symbols.get(&name).copied()
    }

    fn add_symbol_value(&mut self, name: Symbol, address: NativeAddress) -> Result<()> {
        match self.symbols.get(&name) {
            Some(&existing) if existing != address => {
                Err(CompileError::Backend(BackendError::DuplicateSymbol {
                    name: name.as_str().to_owned(),
                }))
            }
            _ => {
                self.symbols.insert(name, address);
                Ok(())
            }
        }
    }

    fn begin_unit(&mut self, line: u32, column: u32) -> Result<()> {
        let name = format!("unit_{line}_{column}");
        let backend = self.global.backend();
        let mut module = backend.create_module(&name);
        backend.begin_function(&mut module, &format!("{name}_entry"));
        self.local.push_module(module);
        self.local.take_manifest();
        self.push_variables();
        Ok(())
    }

    fn end_unit(&mut self) -> Result<()> {
        self.pop_variables()?;
        let manifest = self.local.take_manifest().encode()?;
        let mut module = self.local.pop_module().ok_or(CompileError::NoActiveModule)?;

        let backend = self.global.backend();
        backend.build_ret_void(&mut module);
        backend.attach_metadata(&mut module, METADATA_KEY, manifest);
        backend.verify_module(&module)?;
        self.pending_unit = Some(backend.serialize_module(&module)?);
        self.stats.units_compiled += 1;
        Ok(())
    }

    fn abandon_unit(&mut self) {
        self.local.pop_module();
        self.local.take_manifest();
        self.pending_unit = None;
        if let Err(err) = self.pop_variables() {
            tracing::warn!(%err, "abandoned unit left no saved scope");
        }
    }

    fn record_declaration(&mut self, record: DeclRecord) -> Result<()> {
        self.local.record(record);
        Ok(())
    }

    /// Import `name`. A file is compiled at most once per session; later
    /// imports merge the exports recorded the first time.
    #[tracing::instrument(level = "debug", skip(self))]
    fn import(&mut self, name: &str) -> Result<()> {
        let importer_dir = self.local.filename().parent().map(Path::to_path_buf);
        let path = self
            .config
            .import_paths
            .resolve(importer_dir.as_deref(), name)
            .ok_or_else(|| CompileError::ImportNotFound {
                name: name.to_owned(),
            })?;

        if let Some(exports) = self.global.imported_exports(&path) {
            tracing::debug!(file = %path.display(), "already imported");
            let exports = exports.clone();
            return self.import_declarations(&exports);
        }
        self.global.mark_imported(path.clone());

        let (compiled, inner) = self.in_file_context(&path, |s| s.compile_import(&path));
        compiled?;

        let exports = inner.into_exports();
        self.global.record_exports(path, exports.clone());
        self.import_declarations(&exports)
    }
}

#[cfg(test)]
mod tests;
