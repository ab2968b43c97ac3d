//! Variable scopes.
//!
//! `Scope` uses `im::HashMap` for O(1) structural-sharing clone, so saving
//! the whole scope before a nested construct and restoring it afterwards
//! costs nothing and leaves no trace of the inner bindings.

use vela_ir::Symbol;
use vela_types::TypeId;

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// A named value produced by a statement: its type and native value.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding<V> {
    pub ty: TypeId,
    pub value: V,
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Variable bindings visible at one point of compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct Scope<V> {
    bindings: im::HashMap<Symbol, Binding<V>>,
}

impl<V: Clone> Scope<V> {
    pub fn new() -> Self {
        Self {
            bindings: im::HashMap::new(),
        }
    }

    /// A scope inheriting every binding; changes to it stay local.
    #[must_use]
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// Bind `name`, shadowing any earlier binding.
    pub fn bind(&mut self, name: Symbol, ty: TypeId, value: V) {
        self.bindings.insert(name, Binding { ty, value });
    }

    pub fn lookup(&self, name: Symbol) -> Option<&Binding<V>> {
        self.bindings.get(&name)
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.bindings.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<V: Clone> Default for Scope<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
