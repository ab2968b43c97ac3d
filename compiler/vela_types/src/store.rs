//! Canonical type store.
//!
//! Every structural type is created once: [`TypeStore::get_or_make`] returns
//! the existing handle for a key it has seen and appends a new entry
//! otherwise. Backend representations are produced lazily through one
//! materialization hook per [`TypeKind`] and cached on the entry.
//!
//! # Named structs
//! A named struct is keyed by its name only and starts opaque. Its body is
//! set at most once; setting it drops the cached materialization of the
//! struct and of every cached type that embeds it by value.
//!
//! # Locking
//! Entries sit behind one `RwLock`. Hooks run with no lock held, so a hook
//! may create or materialize other types.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use vela_ir::Symbol;

use crate::{GenericArg, StructBody, TargetWidths, TypeData, TypeId, TypeKind, TypeStoreError};

#[cfg(test)]
mod tests;

/// Per-kind hook producing a backend representation of a type.
pub type MaterializeHook<H> =
    Arc<dyn Fn(&TypeStore<H>, TypeId) -> Result<H, TypeStoreError> + Send + Sync>;

struct TypeEntry<H> {
    data: TypeData,
    /// Named structs only; `None` while opaque.
    body: Option<StructBody>,
    native: Option<H>,
}

struct StoreInner<H> {
    map: FxHashMap<TypeData, TypeId>,
    entries: Vec<TypeEntry<H>>,
    /// Types whose hook is currently running.
    in_progress: FxHashSet<TypeId>,
}

impl<H> StoreInner<H> {
    fn entry(&self, id: TypeId) -> Result<&TypeEntry<H>, TypeStoreError> {
        self.entries
            .get(id.index())
            .ok_or(TypeStoreError::UnknownType { id: id.raw() })
    }

    fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.map.get(&data) {
            return id;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "type count bounded far below u32::MAX in practice"
        )]
        let id = TypeId::from_raw(self.entries.len() as u32);
        self.entries.push(TypeEntry {
            data: data.clone(),
            body: None,
            native: None,
        });
        self.map.insert(data, id);
        id
    }

    /// Drop cached materializations of `root` and of everything that
    /// embeds it by value, transitively.
    fn invalidate(&mut self, root: TypeId) -> usize {
        let mut seen = FxHashSet::default();
        let mut work = vec![root];
        let mut dropped = 0;
        while let Some(id) = work.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(id.index()) {
                if entry.native.take().is_some() {
                    dropped += 1;
                }
            }
            for (idx, entry) in self.entries.iter().enumerate() {
                let embeds = entry.data.embeds(id)
                    || entry.body.as_ref().is_some_and(|b| b.elems.contains(&id));
                if embeds {
                    #[expect(
                        clippy::cast_possible_truncation,
                        reason = "entry index came from a TypeId"
                    )]
                    work.push(TypeId::from_raw(idx as u32));
                }
            }
        }
        dropped
    }
}

/// Handles of the types every store starts with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommonTypes {
    pub void: TypeId,
    pub f16: TypeId,
    pub f32: TypeId,
    pub f64: TypeId,
    pub f128: TypeId,
    pub bool: TypeId,
    pub char: TypeId,
    pub short: TypeId,
    pub int: TypeId,
    pub unsigned: TypeId,
    pub long: TypeId,
    pub long_long: TypeId,
    pub intptr: TypeId,
    pub size: TypeId,
    pub char32: TypeId,
    pub uint64: TypeId,
    pub char_ptr: TypeId,
    pub void_ptr: TypeId,
    /// The type of type-valued constants.
    pub static_type: TypeId,
}

impl CommonTypes {
    fn create<H>(inner: &mut StoreInner<H>, widths: TargetWidths) -> Self {
        let char = inner.intern(TypeData::Int { bits: 8 });
        let void = inner.intern(TypeData::Void);
        CommonTypes {
            void,
            f16: inner.intern(TypeData::F16),
            f32: inner.intern(TypeData::F32),
            f64: inner.intern(TypeData::F64),
            f128: inner.intern(TypeData::F128),
            bool: inner.intern(TypeData::Uint { bits: 1 }),
            char,
            short: inner.intern(TypeData::Int { bits: 16 }),
            int: inner.intern(TypeData::Int {
                bits: widths.int_bits(),
            }),
            unsigned: inner.intern(TypeData::Uint {
                bits: widths.int_bits(),
            }),
            long: inner.intern(TypeData::Int {
                bits: widths.long_bits(),
            }),
            long_long: inner.intern(TypeData::Int { bits: 64 }),
            intptr: inner.intern(TypeData::Int {
                bits: widths.ptr_bits(),
            }),
            size: inner.intern(TypeData::Uint {
                bits: widths.ptr_bits(),
            }),
            char32: inner.intern(TypeData::Uint { bits: 32 }),
            uint64: inner.intern(TypeData::Uint { bits: 64 }),
            char_ptr: inner.intern(TypeData::Pointer {
                elem: char,
                addr_space: 0,
            }),
            void_ptr: inner.intern(TypeData::Pointer {
                elem: void,
                addr_space: 0,
            }),
            static_type: inner.intern(TypeData::NamedStruct {
                name: Symbol::intern("v_static_type"),
            }),
        }
    }
}

/// Integer shape of an `Int`/`Uint` type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IntInfo {
    pub bits: u32,
    pub signed: bool,
}

/// Parts of a function type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSig {
    pub ret: TypeId,
    pub params: Box<[TypeId]>,
    pub variadic: bool,
}

/// Owner of all canonical types for one context.
///
/// `H` is the backend's native type handle.
pub struct TypeStore<H> {
    inner: RwLock<StoreInner<H>>,
    hooks: RwLock<Vec<Option<MaterializeHook<H>>>>,
    widths: TargetWidths,
    common: CommonTypes,
}

impl<H> TypeStore<H> {
    pub fn new(widths: TargetWidths) -> Self {
        let mut inner = StoreInner {
            map: FxHashMap::default(),
            entries: Vec::with_capacity(64),
            in_progress: FxHashSet::default(),
        };
        let common = CommonTypes::create(&mut inner, widths);
        TypeStore {
            inner: RwLock::new(inner),
            hooks: RwLock::new((0..TypeKind::COUNT).map(|_| None).collect()),
            widths,
            common,
        }
    }

    #[inline]
    pub fn widths(&self) -> TargetWidths {
        self.widths
    }

    #[inline]
    pub fn common(&self) -> &CommonTypes {
        &self.common
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Canonicalization
    // ------------------------------------------------------------------

    /// The canonical handle for `data`, creating it on first use.
    pub fn get_or_make(&self, data: TypeData) -> TypeId {
        if let Some(&id) = self.inner.read().map.get(&data) {
            return id;
        }
        self.inner.write().intern(data)
    }

    pub fn void(&self) -> TypeId {
        self.common.void
    }

    pub fn int(&self, bits: u32) -> TypeId {
        self.get_or_make(TypeData::Int { bits })
    }

    pub fn uint(&self, bits: u32) -> TypeId {
        self.get_or_make(TypeData::Uint { bits })
    }

    pub fn function(&self, ret: TypeId, params: &[TypeId], variadic: bool) -> TypeId {
        self.get_or_make(TypeData::Function {
            ret,
            params: params.into(),
            variadic,
        })
    }

    pub fn pointer(&self, elem: TypeId, addr_space: u32) -> TypeId {
        self.get_or_make(TypeData::Pointer { elem, addr_space })
    }

    pub fn reference(&self, elem: TypeId, addr_space: u32) -> TypeId {
        self.get_or_make(TypeData::Reference { elem, addr_space })
    }

    /// The named struct `name`; opaque until [`Self::set_struct_body`].
    pub fn named_struct(&self, name: Symbol) -> TypeId {
        self.get_or_make(TypeData::NamedStruct { name })
    }

    pub fn tuple(&self, elems: &[TypeId], packed: bool) -> TypeId {
        self.get_or_make(TypeData::Tuple {
            elems: elems.into(),
            packed,
        })
    }

    pub fn array(&self, elem: TypeId, len: u64) -> TypeId {
        self.get_or_make(TypeData::Array { elem, len })
    }

    pub fn vector(&self, elem: TypeId, lanes: u32) -> TypeId {
        self.get_or_make(TypeData::Vector { elem, lanes })
    }

    pub fn svector(&self, elem: TypeId, lanes: u32) -> TypeId {
        self.get_or_make(TypeData::ScalableVector { elem, lanes })
    }

    pub fn generic(&self, cons: Symbol, args: Vec<GenericArg>) -> TypeId {
        self.get_or_make(TypeData::Generic {
            cons,
            args: args.into_boxed_slice(),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn lookup(&self, id: TypeId) -> Result<TypeData, TypeStoreError> {
        self.inner.read().entry(id).map(|e| e.data.clone())
    }

    pub fn kind(&self, id: TypeId) -> Option<TypeKind> {
        self.inner.read().entry(id).ok().map(|e| e.data.kind())
    }

    pub fn int_info(&self, id: TypeId) -> Option<IntInfo> {
        match self.lookup(id).ok()? {
            TypeData::Int { bits } => Some(IntInfo { bits, signed: true }),
            TypeData::Uint { bits } => Some(IntInfo {
                bits,
                signed: false,
            }),
            _ => None,
        }
    }

    /// Pointee of a pointer, or element of an array or vector.
    pub fn element_type(&self, id: TypeId) -> Option<TypeId> {
        match self.lookup(id).ok()? {
            TypeData::Pointer { elem, .. }
            | TypeData::Reference { elem, .. }
            | TypeData::Array { elem, .. }
            | TypeData::Vector { elem, .. }
            | TypeData::ScalableVector { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Target type of a reference.
    pub fn reference_target(&self, id: TypeId) -> Option<TypeId> {
        match self.lookup(id).ok()? {
            TypeData::Reference { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Pointee of a pointer.
    pub fn pointer_target(&self, id: TypeId) -> Option<TypeId> {
        match self.lookup(id).ok()? {
            TypeData::Pointer { elem, .. } => Some(elem),
            _ => None,
        }
    }

    pub fn function_signature(&self, id: TypeId) -> Option<FunctionSig> {
        match self.lookup(id).ok()? {
            TypeData::Function {
                ret,
                params,
                variadic,
            } => Some(FunctionSig {
                ret,
                params,
                variadic,
            }),
            _ => None,
        }
    }

    pub fn is_reference(&self, id: TypeId) -> bool {
        self.kind(id) == Some(TypeKind::Reference)
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        self.kind(id) == Some(TypeKind::Pointer)
    }

    /// Whether `id` is a named struct without a body.
    pub fn is_opaque(&self, id: TypeId) -> bool {
        let inner = self.inner.read();
        inner
            .entry(id)
            .is_ok_and(|e| matches!(e.data, TypeData::NamedStruct { .. }) && e.body.is_none())
    }

    // ------------------------------------------------------------------
    // Struct bodies
    // ------------------------------------------------------------------

    /// Give an opaque named struct its body.
    ///
    /// Setting the body it already has is a no-op; setting a different one
    /// is [`TypeStoreError::BodyRedefined`].
    pub fn set_struct_body(
        &self,
        id: TypeId,
        elems: &[TypeId],
        packed: bool,
    ) -> Result<(), TypeStoreError> {
        let Some(TypeData::NamedStruct { name }) = self.lookup(id).ok() else {
            return Err(TypeStoreError::NotANamedStruct {
                ty: self.display(id),
            });
        };
        let body = StructBody {
            elems: elems.into(),
            packed,
        };

        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .get_mut(id.index())
            .ok_or(TypeStoreError::UnknownType { id: id.raw() })?;
        if let Some(existing) = &entry.body {
            return if *existing == body {
                Ok(())
            } else {
                Err(TypeStoreError::BodyRedefined { name })
            };
        }
        entry.body = Some(body);

        let dropped = inner.invalidate(id);
        tracing::debug!(
            name = name.as_str(),
            invalidated = dropped,
            "struct body set"
        );
        Ok(())
    }

    /// Body of a complete named struct or of an anonymous struct.
    pub fn struct_body(&self, id: TypeId) -> Result<StructBody, TypeStoreError> {
        let found = {
            let inner = self.inner.read();
            let entry = inner.entry(id)?;
            match &entry.data {
                TypeData::NamedStruct { name } => Some(
                    entry
                        .body
                        .clone()
                        .ok_or(TypeStoreError::OpaqueStruct { name: *name }),
                ),
                TypeData::Tuple { elems, packed } => Some(Ok(StructBody {
                    elems: elems.clone(),
                    packed: *packed,
                })),
                _ => None,
            }
        };
        found.unwrap_or_else(|| {
            Err(TypeStoreError::NotAStruct {
                ty: self.display(id),
            })
        })
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Install the hook for `kind`, replacing any previous one.
    ///
    /// Cached results are kept; install hooks before materializing.
    pub fn set_materialize_hook(&self, kind: TypeKind, hook: MaterializeHook<H>) {
        self.hooks.write()[kind.index()] = Some(hook);
    }

    pub fn has_materialize_hook(&self, kind: TypeKind) -> bool {
        self.hooks.read()[kind.index()].is_some()
    }
}

impl<H: Clone> TypeStore<H> {
    /// Backend representation of `id`, computed by its kind's hook on first
    /// request and cached afterwards.
    pub fn materialize(&self, id: TypeId) -> Result<H, TypeStoreError> {
        let kind = {
            let inner = self.inner.read();
            let entry = inner.entry(id)?;
            if let Some(native) = &entry.native {
                return Ok(native.clone());
            }
            entry.data.kind()
        };

        let hook = self.hooks.read()[kind.index()]
            .clone()
            .ok_or(TypeStoreError::NoMaterializeHook { kind })?;

        if !self.inner.write().in_progress.insert(id) {
            return Err(TypeStoreError::RecursiveMaterialization {
                ty: self.display(id),
            });
        }
        let result = hook(self, id);

        let mut inner = self.inner.write();
        inner.in_progress.remove(&id);
        let native = result?;
        if let Some(entry) = inner.entries.get_mut(id.index()) {
            entry.native = Some(native.clone());
        }
        Ok(native)
    }

    /// The cached materialization, without running a hook.
    pub fn cached(&self, id: TypeId) -> Option<H> {
        self.inner.read().entry(id).ok()?.native.clone()
    }
}

/// Shared handle to a [`TypeStore`].
pub struct SharedTypeStore<H>(Arc<TypeStore<H>>);

impl<H> SharedTypeStore<H> {
    pub fn new(store: TypeStore<H>) -> Self {
        SharedTypeStore(Arc::new(store))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<H> Clone for SharedTypeStore<H> {
    fn clone(&self) -> Self {
        SharedTypeStore(Arc::clone(&self.0))
    }
}

impl<H> Deref for SharedTypeStore<H> {
    type Target = TypeStore<H>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
