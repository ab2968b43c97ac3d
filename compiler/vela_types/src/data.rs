//! Structural type keys.

use vela_ir::Symbol;

use crate::{TypeId, TypeKind};

/// Structural description of a type; the canonicalization key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Void,
    F16,
    F32,
    F64,
    F128,
    Int {
        bits: u32,
    },
    Uint {
        bits: u32,
    },
    Function {
        ret: TypeId,
        params: Box<[TypeId]>,
        variadic: bool,
    },
    Pointer {
        elem: TypeId,
        addr_space: u32,
    },
    Reference {
        elem: TypeId,
        addr_space: u32,
    },
    /// Keyed by name alone; the body lives on the store entry.
    NamedStruct {
        name: Symbol,
    },
    /// Anonymous struct; the element list is the identity.
    Tuple {
        elems: Box<[TypeId]>,
        packed: bool,
    },
    Array {
        elem: TypeId,
        len: u64,
    },
    Vector {
        elem: TypeId,
        lanes: u32,
    },
    ScalableVector {
        elem: TypeId,
        lanes: u32,
    },
    Generic {
        cons: Symbol,
        args: Box<[GenericArg]>,
    },
}

/// Argument of a generic type term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GenericArg {
    Number(u64),
    String(Box<str>),
    Symbol(Symbol),
    Type(TypeId),
    Cons {
        cons: Symbol,
        args: Box<[GenericArg]>,
    },
}

/// Element list of a struct.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructBody {
    pub elems: Box<[TypeId]>,
    pub packed: bool,
}

impl TypeData {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeData::Void => TypeKind::Void,
            TypeData::F16 => TypeKind::F16,
            TypeData::F32 => TypeKind::F32,
            TypeData::F64 => TypeKind::F64,
            TypeData::F128 => TypeKind::F128,
            TypeData::Int { .. } => TypeKind::Int,
            TypeData::Uint { .. } => TypeKind::Uint,
            TypeData::Function { .. } => TypeKind::Function,
            TypeData::Pointer { .. } => TypeKind::Pointer,
            TypeData::Reference { .. } => TypeKind::Reference,
            TypeData::NamedStruct { .. } | TypeData::Tuple { .. } => TypeKind::Struct,
            TypeData::Array { .. } => TypeKind::Array,
            TypeData::Vector { .. } => TypeKind::Vector,
            TypeData::ScalableVector { .. } => TypeKind::ScalableVector,
            TypeData::Generic { .. } => TypeKind::Generic,
        }
    }

    /// Whether a materialization of this type embeds `other`'s
    /// materialization by value.
    pub(crate) fn embeds(&self, other: TypeId) -> bool {
        match self {
            TypeData::Function { ret, params, .. } => *ret == other || params.contains(&other),
            TypeData::Tuple { elems, .. } => elems.contains(&other),
            TypeData::Array { elem, .. }
            | TypeData::Vector { elem, .. }
            | TypeData::ScalableVector { elem, .. } => *elem == other,
            TypeData::Generic { args, .. } => args.iter().any(|arg| arg.mentions(other)),
            _ => false,
        }
    }
}

impl GenericArg {
    fn mentions(&self, ty: TypeId) -> bool {
        match self {
            GenericArg::Type(id) => *id == ty,
            GenericArg::Cons { args, .. } => args.iter().any(|arg| arg.mentions(ty)),
            GenericArg::Number(_) | GenericArg::String(_) | GenericArg::Symbol(_) => false,
        }
    }
}
