//! Compiling for another target.
//!
//! A [`TargetContext`] has its own Type Store built from the target's
//! widths, so layouts follow the target rather than the host. Units are
//! compiled into one persistent module and never linked or run; the
//! declarations they record apply immediately.

use rustc_hash::FxHashMap;
use vela_backend::{Backend, NativeAddress};
use vela_ir::{Node, Symbol};
use vela_types::{SharedTypeStore, TargetWidths};

use crate::context::{
    CompileContext, Declare, Emit, GlobalContext, LocalContext, ModuleOf, NativeTypeOf,
};
use crate::manifest::DeclRecord;
use crate::{CompileError, Result};

pub struct TargetContext<B: Backend + 'static> {
    global: GlobalContext<Self>,
    local: LocalContext<Self>,
    symbols: FxHashMap<Symbol, NativeAddress>,
    module_name: String,
    /// Units begun so far; numbers the entry functions.
    units: usize,
}

impl<B: Backend + 'static> TargetContext<B> {
    pub fn new(backend: B, widths: TargetWidths, module_name: &str) -> Result<Self> {
        let global: GlobalContext<Self> = GlobalContext::new(backend, widths)?;
        let mut local = LocalContext::new(module_name);
        local.push_module(global.backend().create_module(module_name));
        Ok(TargetContext {
            global,
            local,
            symbols: FxHashMap::default(),
            module_name: module_name.to_owned(),
            units: 0,
        })
    }

    pub fn types(&self) -> &SharedTypeStore<NativeTypeOf<Self>> {
        self.global.types()
    }

    /// Compile one unit into the persistent module.
    pub fn compile_unit(&mut self, unit: &Node) -> Result<()> {
        let compiler = self.global.compiler();
        compiler.visit(self, unit)
    }

    pub fn module(&self) -> Option<&ModuleOf<Self>> {
        self.local.module()
    }

    /// Hand over the module built so far and start a fresh one.
    pub fn take_module(&mut self) -> Result<ModuleOf<Self>> {
        let module = self.local.pop_module().ok_or(CompileError::NoActiveModule)?;
        let fresh = self.global.backend().create_module(&self.module_name);
        self.local.push_module(fresh);
        Ok(module)
    }
}

impl<B: Backend + 'static> CompileContext for TargetContext<B> {
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
        self.symbols.insert(name, address);
        Ok(())
    }

    fn begin_unit(&mut self, line: u32, column: u32) -> Result<()> {
        let name = format!("unit{}_{line}_{column}", self.units);
        self.units += 1;
        let (global, local) = self.split_mut();
        let module = local.module_mut()?;
        global.backend().begin_function(module, &name);
        self.push_variables();
        Ok(())
    }

    fn end_unit(&mut self) -> Result<()> {
        self.with_module(|backend, module| backend.build_ret_void(module))?;
        self.pop_variables()
    }

    fn abandon_unit(&mut self) {
        if let Err(err) = self.pop_variables() {
            tracing::warn!(%err, "abandoned unit left no saved scope");
        }
    }

    fn record_declaration(&mut self, record: DeclRecord) -> Result<()> {
        self.apply_record(record)
    }

    fn import(&mut self, _name: &str) -> Result<()> {
        Err(CompileError::Unsupported {
            operation: "import",
        })
    }
}
