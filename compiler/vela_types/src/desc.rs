//! Serializable type descriptions.
//!
//! A [`TypeDesc`] spells a type out structurally with names instead of
//! handles, so it means the same thing in any store of any process.
//! Compiled units carry their declarations' types this way.

use serde::{Deserialize, Serialize};
use vela_ir::Symbol;

use crate::{GenericArg, TypeData, TypeId, TypeStore, TypeStoreError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    Void,
    F16,
    F32,
    F64,
    F128,
    Int(u32),
    Uint(u32),
    Function {
        ret: Box<TypeDesc>,
        params: Vec<TypeDesc>,
        variadic: bool,
    },
    Pointer {
        elem: Box<TypeDesc>,
        addr_space: u32,
    },
    Reference {
        elem: Box<TypeDesc>,
        addr_space: u32,
    },
    NamedStruct(String),
    Tuple {
        elems: Vec<TypeDesc>,
        packed: bool,
    },
    Array {
        elem: Box<TypeDesc>,
        len: u64,
    },
    Vector {
        elem: Box<TypeDesc>,
        lanes: u32,
    },
    ScalableVector {
        elem: Box<TypeDesc>,
        lanes: u32,
    },
    Generic {
        cons: String,
        args: Vec<ArgDesc>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgDesc {
    Number(u64),
    String(String),
    Symbol(String),
    Type(TypeDesc),
    Cons { cons: String, args: Vec<ArgDesc> },
}

impl<H> TypeStore<H> {
    /// Structural description of `id`. Named structs are described by name
    /// only; their bodies travel separately.
    pub fn describe(&self, id: TypeId) -> Result<TypeDesc, TypeStoreError> {
        let desc = match self.lookup(id)? {
            TypeData::Void => TypeDesc::Void,
            TypeData::F16 => TypeDesc::F16,
            TypeData::F32 => TypeDesc::F32,
            TypeData::F64 => TypeDesc::F64,
            TypeData::F128 => TypeDesc::F128,
            TypeData::Int { bits } => TypeDesc::Int(bits),
            TypeData::Uint { bits } => TypeDesc::Uint(bits),
            TypeData::Function {
                ret,
                params,
                variadic,
            } => TypeDesc::Function {
                ret: Box::new(self.describe(ret)?),
                params: self.describe_all(&params)?,
                variadic,
            },
            TypeData::Pointer { elem, addr_space } => TypeDesc::Pointer {
                elem: Box::new(self.describe(elem)?),
                addr_space,
            },
            TypeData::Reference { elem, addr_space } => TypeDesc::Reference {
                elem: Box::new(self.describe(elem)?),
                addr_space,
            },
            TypeData::NamedStruct { name } => TypeDesc::NamedStruct(name.as_str().to_owned()),
            TypeData::Tuple { elems, packed } => TypeDesc::Tuple {
                elems: self.describe_all(&elems)?,
                packed,
            },
            TypeData::Array { elem, len } => TypeDesc::Array {
                elem: Box::new(self.describe(elem)?),
                len,
            },
            TypeData::Vector { elem, lanes } => TypeDesc::Vector {
                elem: Box::new(self.describe(elem)?),
                lanes,
            },
            TypeData::ScalableVector { elem, lanes } => TypeDesc::ScalableVector {
                elem: Box::new(self.describe(elem)?),
                lanes,
            },
            TypeData::Generic { cons, args } => TypeDesc::Generic {
                cons: cons.as_str().to_owned(),
                args: args
                    .iter()
                    .map(|arg| self.describe_arg(arg))
                    .collect::<Result<_, _>>()?,
            },
        };
        Ok(desc)
    }

    fn describe_all(&self, ids: &[TypeId]) -> Result<Vec<TypeDesc>, TypeStoreError> {
        ids.iter().map(|&id| self.describe(id)).collect()
    }

    fn describe_arg(&self, arg: &GenericArg) -> Result<ArgDesc, TypeStoreError> {
        Ok(match arg {
            GenericArg::Number(n) => ArgDesc::Number(*n),
            GenericArg::String(s) => ArgDesc::String(s.to_string()),
            GenericArg::Symbol(sym) => ArgDesc::Symbol(sym.as_str().to_owned()),
            GenericArg::Type(id) => ArgDesc::Type(self.describe(*id)?),
            GenericArg::Cons { cons, args } => ArgDesc::Cons {
                cons: cons.as_str().to_owned(),
                args: args
                    .iter()
                    .map(|a| self.describe_arg(a))
                    .collect::<Result<_, _>>()?,
            },
        })
    }

    /// Canonical handle for a description, creating types as needed.
    pub fn from_desc(&self, desc: &TypeDesc) -> TypeId {
        let data = match desc {
            TypeDesc::Void => TypeData::Void,
            TypeDesc::F16 => TypeData::F16,
            TypeDesc::F32 => TypeData::F32,
            TypeDesc::F64 => TypeData::F64,
            TypeDesc::F128 => TypeData::F128,
            TypeDesc::Int(bits) => TypeData::Int { bits: *bits },
            TypeDesc::Uint(bits) => TypeData::Uint { bits: *bits },
            TypeDesc::Function {
                ret,
                params,
                variadic,
            } => TypeData::Function {
                ret: self.from_desc(ret),
                params: params.iter().map(|p| self.from_desc(p)).collect(),
                variadic: *variadic,
            },
            TypeDesc::Pointer { elem, addr_space } => TypeData::Pointer {
                elem: self.from_desc(elem),
                addr_space: *addr_space,
            },
            TypeDesc::Reference { elem, addr_space } => TypeData::Reference {
                elem: self.from_desc(elem),
                addr_space: *addr_space,
            },
            TypeDesc::NamedStruct(name) => TypeData::NamedStruct {
                name: Symbol::intern(name),
            },
            TypeDesc::Tuple { elems, packed } => TypeData::Tuple {
                elems: elems.iter().map(|e| self.from_desc(e)).collect(),
                packed: *packed,
            },
            TypeDesc::Array { elem, len } => TypeData::Array {
                elem: self.from_desc(elem),
                len: *len,
            },
            TypeDesc::Vector { elem, lanes } => TypeData::Vector {
                elem: self.from_desc(elem),
                lanes: *lanes,
            },
            TypeDesc::ScalableVector { elem, lanes } => TypeData::ScalableVector {
                elem: self.from_desc(elem),
                lanes: *lanes,
            },
            TypeDesc::Generic { cons, args } => TypeData::Generic {
                cons: Symbol::intern(cons),
                args: args.iter().map(|a| self.arg_from_desc(a)).collect(),
            },
        };
        self.get_or_make(data)
    }

    fn arg_from_desc(&self, desc: &ArgDesc) -> GenericArg {
        match desc {
            ArgDesc::Number(n) => GenericArg::Number(*n),
            ArgDesc::String(s) => GenericArg::String(s.as_str().into()),
            ArgDesc::Symbol(s) => GenericArg::Symbol(Symbol::intern(s)),
            ArgDesc::Type(t) => GenericArg::Type(self.from_desc(t)),
            ArgDesc::Cons { cons, args } => GenericArg::Cons {
                cons: Symbol::intern(cons),
                args: args.iter().map(|a| self.arg_from_desc(a)).collect(),
            },
        }
    }
}
