//! Declaration sets.
//!
//! A [`Declarations`] value holds four persistent maps: aliases, constants,
//! symbols and intrinsics. Cloning is O(1), which is what makes saving and
//! restoring scopes cheap. Declaring a name again with the same value is a
//! no-op; declaring it with a different value is a redeclaration error.

use std::fmt;
use std::rc::Rc;

use vela_ir::{NodeRef, Symbol};
use vela_types::TypeId;

use crate::{CompileError, CompilerVisitor, Result};

/// Which map a declaration lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Alias,
    Constant,
    Symbol,
    Intrinsic,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclKind::Alias => "alias",
            DeclKind::Constant => "constant",
            DeclKind::Symbol => "symbol",
            DeclKind::Intrinsic => "intrinsic",
        })
    }
}

/// Compile-time value of a named constant.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Char(char),
    Str(Rc<str>),
    Null,
    /// A type used as a constant; its declared type is `static_type`.
    Type(TypeId),
}

/// Signature of an intrinsic: the visitor in flight, the context, and the
/// unevaluated argument nodes.
pub type IntrinsicFn<C> = dyn Fn(&CompilerVisitor<C>, &mut C, &[NodeRef]) -> Result<()>;

/// Compile-time function invoked in place of a call.
///
/// Two intrinsics are equal only if they are the same function object.
pub struct Intrinsic<C>(Rc<IntrinsicFn<C>>);

impl<C> Intrinsic<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CompilerVisitor<C>, &mut C, &[NodeRef]) -> Result<()> + 'static,
    {
        Intrinsic(Rc::new(f))
    }

    pub fn call(&self, vis: &CompilerVisitor<C>, cx: &mut C, args: &[NodeRef]) -> Result<()> {
        (self.0)(vis, cx, args)
    }
}

impl<C> Clone for Intrinsic<C> {
    fn clone(&self) -> Self {
        Intrinsic(Rc::clone(&self.0))
    }
}

impl<C> PartialEq for Intrinsic<C> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl<C> fmt::Debug for Intrinsic<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Intrinsic({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// Aliases, constants, symbols and intrinsics visible in some context.
pub struct Declarations<C> {
    aliases: im::HashMap<Symbol, Symbol>,
    constants: im::HashMap<Symbol, (TypeId, ConstValue)>,
    symbols: im::HashMap<Symbol, TypeId>,
    intrinsics: im::HashMap<Symbol, Intrinsic<C>>,
}

fn insert_checked<V: Clone + PartialEq>(
    map: &mut im::HashMap<Symbol, V>,
    kind: DeclKind,
    name: Symbol,
    value: V,
) -> Result<()> {
    match map.get(&name) {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(CompileError::Redeclaration { kind, name }),
        None => {
            map.insert(name, value);
            Ok(())
        }
    }
}

impl<C> Declarations<C> {
    pub fn new() -> Self {
        Declarations {
            aliases: im::HashMap::new(),
            constants: im::HashMap::new(),
            symbols: im::HashMap::new(),
            intrinsics: im::HashMap::new(),
        }
    }

    pub fn insert_alias(&mut self, name: Symbol, target: Symbol) -> Result<()> {
        insert_checked(&mut self.aliases, DeclKind::Alias, name, target)
    }

    pub fn insert_constant(&mut self, name: Symbol, ty: TypeId, value: ConstValue) -> Result<()> {
        insert_checked(&mut self.constants, DeclKind::Constant, name, (ty, value))
    }

    pub fn insert_symbol(&mut self, name: Symbol, ty: TypeId) -> Result<()> {
        insert_checked(&mut self.symbols, DeclKind::Symbol, name, ty)
    }

    pub fn insert_intrinsic(&mut self, name: Symbol, intrinsic: Intrinsic<C>) -> Result<()> {
        insert_checked(&mut self.intrinsics, DeclKind::Intrinsic, name, intrinsic)
    }

    pub fn alias(&self, name: Symbol) -> Option<Symbol> {
        self.aliases.get(&name).copied()
    }

    pub fn constant(&self, name: Symbol) -> Option<&(TypeId, ConstValue)> {
        self.constants.get(&name)
    }

    pub fn symbol(&self, name: Symbol) -> Option<TypeId> {
        self.symbols.get(&name).copied()
    }

    pub fn intrinsic(&self, name: Symbol) -> Option<&Intrinsic<C>> {
        self.intrinsics.get(&name)
    }

    /// Insert everything from `other` under the redeclaration rule.
    pub fn merge(&mut self, other: &Declarations<C>) -> Result<()> {
        for (name, target) in &other.aliases {
            self.insert_alias(*name, *target)?;
        }
        for (name, (ty, value)) in &other.constants {
            self.insert_constant(*name, *ty, value.clone())?;
        }
        for (name, ty) in &other.symbols {
            self.insert_symbol(*name, *ty)?;
        }
        for (name, intrinsic) in &other.intrinsics {
            self.insert_intrinsic(*name, intrinsic.clone())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.aliases.len() + self.constants.len() + self.symbols.len() + self.intrinsics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> Default for Declarations<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Declarations<C> {
    fn clone(&self) -> Self {
        Declarations {
            aliases: self.aliases.clone(),
            constants: self.constants.clone(),
            symbols: self.symbols.clone(),
            intrinsics: self.intrinsics.clone(),
        }
    }
}

impl<C> PartialEq for Declarations<C> {
    fn eq(&self, other: &Self) -> bool {
        self.aliases == other.aliases
            && self.constants == other.constants
            && self.symbols == other.symbols
            && self.intrinsics == other.intrinsics
    }
}

impl<C> fmt::Debug for Declarations<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declarations")
            .field("aliases", &self.aliases.len())
            .field("constants", &self.constants.len())
            .field("symbols", &self.symbols.len())
            .field("intrinsics", &self.intrinsics.len())
            .finish()
    }
}
