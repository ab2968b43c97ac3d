//! Native types of the reference backend and the hooks that build them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vela_types::{TypeData, TypeId, TypeKind, TypeStore, TypeStoreError};

/// Backend-level type, shaped like LLVM's type system.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    Void,
    Float {
        bits: u32,
    },
    /// Integers carry no signedness; operations choose it.
    Int {
        bits: u32,
    },
    /// Pointers and references both lower to this.
    Ptr {
        addr_space: u32,
        bits: u32,
    },
    Function {
        ret: Box<NativeType>,
        params: Vec<NativeType>,
        variadic: bool,
    },
    /// `body` is `None` for an opaque named struct.
    Struct {
        name: Option<String>,
        body: Option<Vec<NativeType>>,
        packed: bool,
    },
    Array {
        elem: Box<NativeType>,
        len: u64,
    },
    Vector {
        elem: Box<NativeType>,
        lanes: u32,
        scalable: bool,
    },
    /// Generic terms have no layout of their own.
    Opaque {
        name: String,
    },
}

impl NativeType {
    pub fn int_bits(&self) -> Option<u32> {
        match self {
            NativeType::Int { bits } | NativeType::Ptr { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    /// Allocation size in bytes, or `None` for unsized types.
    pub fn size_of(&self) -> Option<u64> {
        match self {
            NativeType::Void
            | NativeType::Function { .. }
            | NativeType::Opaque { .. }
            | NativeType::Vector { scalable: true, .. } => None,
            NativeType::Float { bits } | NativeType::Int { bits } => {
                Some(u64::from(bits.div_ceil(8)).next_power_of_two())
            }
            NativeType::Ptr { bits, .. } => Some(u64::from(bits / 8)),
            NativeType::Struct { body, packed, .. } => {
                let body = body.as_ref()?;
                let mut offset = 0u64;
                let mut max_align = 1u64;
                for field in body {
                    let size = field.size_of()?;
                    let align = if *packed { 1 } else { field.align_of()? };
                    offset = offset.next_multiple_of(align) + size;
                    max_align = max_align.max(align);
                }
                Some(offset.next_multiple_of(max_align))
            }
            NativeType::Array { elem, len } => Some(elem.size_of()? * len),
            NativeType::Vector { elem, lanes, .. } => {
                Some((elem.size_of()? * u64::from(*lanes)).next_power_of_two())
            }
        }
    }

    /// ABI alignment in bytes, or `None` for unsized types.
    pub fn align_of(&self) -> Option<u64> {
        match self {
            NativeType::Struct { body, packed, .. } => {
                let body = body.as_ref()?;
                if *packed {
                    return Some(1);
                }
                body.iter()
                    .try_fold(1u64, |acc, field| Some(acc.max(field.align_of()?)))
            }
            NativeType::Array { elem, .. } => elem.align_of(),
            _ => self.size_of().map(|size| size.min(16)),
        }
    }
}

/// Install hooks producing [`NativeType`]s for every kind in `store`.
pub fn install_native_hooks(store: &TypeStore<NativeType>) {
    for kind in TypeKind::ALL {
        store.set_materialize_hook(kind, Arc::new(materialize_native));
    }
}

fn materialize_native(
    store: &TypeStore<NativeType>,
    id: TypeId,
) -> Result<NativeType, TypeStoreError> {
    let all = |ids: &[TypeId]| -> Result<Vec<NativeType>, TypeStoreError> {
        ids.iter().map(|&t| store.materialize(t)).collect()
    };
    let native = match store.lookup(id)? {
        TypeData::Void => NativeType::Void,
        TypeData::F16 => NativeType::Float { bits: 16 },
        TypeData::F32 => NativeType::Float { bits: 32 },
        TypeData::F64 => NativeType::Float { bits: 64 },
        TypeData::F128 => NativeType::Float { bits: 128 },
        TypeData::Int { bits } | TypeData::Uint { bits } => NativeType::Int { bits },
        TypeData::Function {
            ret,
            params,
            variadic,
        } => NativeType::Function {
            ret: Box::new(store.materialize(ret)?),
            params: all(&params)?,
            variadic,
        },
        TypeData::Pointer { addr_space, .. } | TypeData::Reference { addr_space, .. } => {
            NativeType::Ptr {
                addr_space,
                bits: store.widths().ptr_bits(),
            }
        }
        TypeData::NamedStruct { name } => match store.struct_body(id) {
            Ok(body) => NativeType::Struct {
                name: Some(name.as_str().to_owned()),
                body: Some(all(&body.elems)?),
                packed: body.packed,
            },
            Err(TypeStoreError::OpaqueStruct { .. }) => NativeType::Struct {
                name: Some(name.as_str().to_owned()),
                body: None,
                packed: false,
            },
            Err(e) => return Err(e),
        },
        TypeData::Tuple { elems, packed } => NativeType::Struct {
            name: None,
            body: Some(all(&elems)?),
            packed,
        },
        TypeData::Array { elem, len } => NativeType::Array {
            elem: Box::new(store.materialize(elem)?),
            len,
        },
        TypeData::Vector { elem, lanes } => NativeType::Vector {
            elem: Box::new(store.materialize(elem)?),
            lanes,
            scalable: false,
        },
        TypeData::ScalableVector { elem, lanes } => NativeType::Vector {
            elem: Box::new(store.materialize(elem)?),
            lanes,
            scalable: true,
        },
        TypeData::Generic { .. } => NativeType::Opaque {
            name: store.display(id),
        },
    };
    Ok(native)
}
