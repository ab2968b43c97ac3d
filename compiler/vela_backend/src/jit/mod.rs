//! Reference JIT: unit libraries, linking and the process-wide symbol table.
//!
//! Every linked module becomes a unit library. Its undefined references
//! are bound at link time: the unit's own definitions first, then the
//! link-order queue of recently linked units (most recent first), then the
//! process-wide table of host functions and flushed unit symbols. A unit's
//! definitions reach the process-wide table only when it is flushed after
//! running.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::ir::Module;
use crate::traits::{JitMethods, UnitHandle};
use crate::value::{HostFn, NativeAddress, RtValue};
use crate::BackendError;

mod exec;
#[cfg(test)]
mod tests;

/// Number of recently linked units consulted before the main table.
const LINK_ORDER_DEPTH: usize = 8;

struct LinkedUnit {
    module: Module,
    defined: FxHashMap<String, NativeAddress>,
    resolved: FxHashMap<String, NativeAddress>,
    /// Index of the module's first string literal in JIT string storage.
    string_base: u32,
    flushed: bool,
}

/// In-process linker and interpreter for [`Module`]s.
#[derive(Default)]
pub struct Jit {
    host_fns: Vec<(String, HostFn)>,
    cells: Vec<RtValue>,
    strings: Vec<Box<str>>,
    main: FxHashMap<String, NativeAddress>,
    units: Vec<LinkedUnit>,
    link_order: VecDeque<UnitHandle>,
}

impl Jit {
    pub fn new() -> Self {
        Self::default()
    }

    fn unit(&self, handle: UnitHandle) -> Result<&LinkedUnit, BackendError> {
        self.units
            .get(handle.0 as usize)
            .ok_or(BackendError::UnknownUnit(handle.0))
    }

    fn resolve_extern(&self, name: &str) -> Option<NativeAddress> {
        self.link_order
            .iter()
            .find_map(|h| self.units.get(h.0 as usize)?.defined.get(name).copied())
            .or_else(|| self.main.get(name).copied())
    }

    /// Current value of a data symbol.
    pub fn read_global(&self, name: &str) -> Option<&RtValue> {
        match self.lookup_native_symbol(name)? {
            NativeAddress::Data(cell) => self.cells.get(cell as usize),
            NativeAddress::Code(_) => None,
        }
    }

    /// Number of units linked so far.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "cell, string and unit counts stay far below u32::MAX"
)]
impl JitMethods for Jit {
    type HostFunction = HostFn;

    fn attach_metadata(&self, module: &mut Module, key: &str, bytes: Vec<u8>) {
        module.metadata.insert(key.to_owned(), bytes);
    }

    fn module_metadata<'m>(&self, module: &'m Module, key: &str) -> Option<&'m [u8]> {
        module.metadata.get(key).map(Vec::as_slice)
    }

    fn serialize_module(&self, module: &Module) -> Result<Vec<u8>, BackendError> {
        bincode::serialize(module).map_err(|e| BackendError::Encode(e.to_string()))
    }

    fn deserialize_module(&self, bytes: &[u8]) -> Result<Module, BackendError> {
        bincode::deserialize(bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn link_module(&mut self, module: Module) -> Result<UnitHandle, BackendError> {
        let handle = UnitHandle(self.units.len() as u32);

        // Cells are only committed once every extern resolved.
        let first_cell = self.cells.len();
        let mut defined = FxHashMap::default();
        for (i, global) in module.globals.iter().enumerate() {
            let cell = (first_cell + i) as u32;
            if defined
                .insert(global.name.clone(), NativeAddress::Data(cell))
                .is_some()
            {
                return Err(BackendError::DuplicateSymbol {
                    name: global.name.clone(),
                });
            }
        }

        let mut resolved = defined.clone();
        for ext in &module.externs {
            if resolved.contains_key(&ext.name) {
                continue;
            }
            let address =
                self.resolve_extern(&ext.name)
                    .ok_or_else(|| BackendError::UnresolvedSymbol {
                        name: ext.name.clone(),
                        unit: module.name.clone(),
                    })?;
            let kind_ok = matches!(
                (ext.is_function, address),
                (true, NativeAddress::Code(_)) | (false, NativeAddress::Data(_))
            );
            if !kind_ok {
                return Err(BackendError::SymbolKind {
                    name: ext.name.clone(),
                    expected: if ext.is_function { "a function" } else { "data" },
                });
            }
            resolved.insert(ext.name.clone(), address);
        }

        self.cells
            .extend(module.globals.iter().map(|global| RtValue::zero(&global.ty)));
        let string_base = self.strings.len() as u32;
        self.strings
            .extend(module.strings.iter().map(|s| s.as_str().into()));

        tracing::debug!(
            unit = %module.name,
            defined = defined.len(),
            resolved = resolved.len() - defined.len(),
            "linked unit"
        );
        self.units.push(LinkedUnit {
            module,
            defined,
            resolved,
            string_base,
            flushed: false,
        });
        self.link_order.push_front(handle);
        self.link_order.truncate(LINK_ORDER_DEPTH);
        Ok(handle)
    }

    fn run_unit(&mut self, unit: UnitHandle) -> Result<(), BackendError> {
        self.unit(unit)?;
        self.execute(unit)
    }

    fn flush_unit_symbols(&mut self, unit: UnitHandle) -> Result<Vec<String>, BackendError> {
        let linked = self
            .units
            .get_mut(unit.0 as usize)
            .ok_or(BackendError::UnknownUnit(unit.0))?;
        if linked.flushed {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = linked.defined.keys().cloned().collect();
        names.sort_unstable();
        for name in &names {
            if self.main.contains_key(name) {
                return Err(BackendError::DuplicateSymbol { name: name.clone() });
            }
        }
        for name in &names {
            if let Some(&address) = linked.defined.get(name) {
                self.main.insert(name.clone(), address);
            }
        }
        linked.flushed = true;
        Ok(names)
    }

    fn lookup_native_symbol(&self, name: &str) -> Option<NativeAddress> {
        self.resolve_extern(name)
    }

    fn add_host_function(
        &mut self,
        name: &str,
        function: HostFn,
    ) -> Result<NativeAddress, BackendError> {
        if self.main.contains_key(name) {
            return Err(BackendError::DuplicateSymbol {
                name: name.to_owned(),
            });
        }
        let address = NativeAddress::Code(self.host_fns.len() as u32);
        self.host_fns.push((name.to_owned(), function));
        self.main.insert(name.to_owned(), address);
        Ok(address)
    }

    fn native_symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self.main.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
