//! Name resolution.

use vela_backend::{BuilderMethods, NativeAddress};
use vela_ir::{Node, Symbol};
use vela_types::{TypeId, TypeKind};

use crate::context::{CompileContext, Emit, ValueOf};
use crate::decls::{ConstValue, Intrinsic};
use crate::{CompileError, Result};

/// Longest alias chain followed before a name is treated as unresolved.
pub const MAX_ALIAS_DEPTH: usize = 64;

/// Follow `alias_of` from `name` until a name without an alias.
///
/// `None` when the chain is longer than [`MAX_ALIAS_DEPTH`] (a cycle).
pub(crate) fn follow_aliases(
    name: Symbol,
    alias_of: impl Fn(Symbol) -> Option<Symbol>,
) -> Option<Symbol> {
    let mut current = name;
    for _ in 0..=MAX_ALIAS_DEPTH {
        match alias_of(current) {
            Some(target) => current = target,
            None => return Some(current),
        }
    }
    tracing::debug!(name = name.as_str(), "alias chain too long");
    None
}

/// Lookups over local then global declarations.
pub trait Resolve: CompileContext {
    /// The name `name` finally stands for, through local and global aliases.
    fn check_alias(&self, name: Symbol) -> Option<Symbol> {
        follow_aliases(name, |n| {
            self.local()
                .decls()
                .alias(n)
                .or_else(|| self.global().decls().alias(n))
        })
    }

    /// The type a type-valued constant names, through aliases.
    fn find_type(&self, name: Symbol) -> Option<TypeId> {
        match self.find_constant(self.check_alias(name)?)? {
            (_, ConstValue::Type(ty)) => Some(ty),
            _ => None,
        }
    }

    fn find_constant(&self, name: Symbol) -> Option<(TypeId, ConstValue)> {
        self.local()
            .decls()
            .constant(name)
            .or_else(|| self.global().decls().constant(name))
            .cloned()
    }

    /// Declared type of a native symbol. The name is taken literally.
    fn find_symbol_type(&self, name: Symbol) -> Option<TypeId> {
        self.local()
            .decls()
            .symbol(name)
            .or_else(|| self.global().decls().symbol(name))
    }

    fn find_intrinsic(&self, name: Symbol) -> Option<Intrinsic<Self>> {
        self.local()
            .decls()
            .intrinsic(name)
            .or_else(|| self.global().decls().intrinsic(name))
            .cloned()
    }

    /// Type and value of an identifier used as an expression: a variable,
    /// then a constant, then a native symbol. Data symbols yield a
    /// reference to their storage.
    fn obtain_identifier(&mut self, name: Symbol) -> Result<Option<(TypeId, ValueOf<Self>)>> {
        let Some(name) = self.check_alias(name) else {
            return Ok(None);
        };

        if let Some(binding) = self.local().variables().lookup(name) {
            return Ok(Some((binding.ty, binding.value.clone())));
        }

        if let Some((ty, value)) = self.find_constant(name) {
            let value = self.const_value(name, ty, &value)?;
            return Ok(Some((ty, value)));
        }

        let Some(ty) = self.find_symbol_type(name) else {
            return Ok(None);
        };
        let native = self.materialize(ty)?;
        if self.global().types().kind(ty) == Some(TypeKind::Function) {
            let value = self.with_module(|backend, module| {
                backend.declare_function(module, name.as_str(), &native)
            })?;
            Ok(Some((ty, value)))
        } else {
            let value = self.with_module(|backend, module| {
                backend.declare_global(module, name.as_str(), &native)
            })?;
            let reference = self.global().types().reference(ty, 0);
            Ok(Some((reference, value)))
        }
    }

    /// Compute the type a type expression denotes.
    fn lookup_type(&mut self, node: &Node) -> Result<TypeId> {
        let saved = self.local_mut().type_result.take();
        let type_calc = self.global().type_calculator();
        let outcome = type_calc.visit(self, node);
        let produced = std::mem::replace(&mut self.local_mut().type_result, saved);
        outcome?;
        produced.ok_or(CompileError::NoValue { kind: node.kind() })
    }

    /// Address of a native symbol, through aliases.
    fn resolve_symbol_value(&self, name: Symbol) -> Option<NativeAddress> {
        self.find_symbol_value(self.check_alias(name)?)
    }
}

impl<C: CompileContext> Resolve for C {}
