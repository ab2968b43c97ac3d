//! Type handles and kinds.

use std::fmt;

/// Handle to a canonical type in a [`TypeStore`](crate::TypeStore).
///
/// Two handles from the same store are equal exactly when they name the
/// same structural type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// The fifteen kinds of type the store knows.
///
/// Named and anonymous structs share [`TypeKind::Struct`], and therefore
/// share one materialization hook.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeKind {
    Void,
    F16,
    F32,
    F64,
    F128,
    Int,
    Uint,
    Function,
    Pointer,
    Reference,
    Struct,
    Array,
    Vector,
    ScalableVector,
    Generic,
}

impl TypeKind {
    pub const COUNT: usize = 15;

    pub const ALL: [TypeKind; Self::COUNT] = [
        TypeKind::Void,
        TypeKind::F16,
        TypeKind::F32,
        TypeKind::F64,
        TypeKind::F128,
        TypeKind::Int,
        TypeKind::Uint,
        TypeKind::Function,
        TypeKind::Pointer,
        TypeKind::Reference,
        TypeKind::Struct,
        TypeKind::Array,
        TypeKind::Vector,
        TypeKind::ScalableVector,
        TypeKind::Generic,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_float(self) -> bool {
        matches!(
            self,
            TypeKind::F16 | TypeKind::F32 | TypeKind::F64 | TypeKind::F128
        )
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, TypeKind::Int | TypeKind::Uint)
    }

    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::F16 => "f16",
            TypeKind::F32 => "f32",
            TypeKind::F64 => "f64",
            TypeKind::F128 => "f128",
            TypeKind::Int => "int",
            TypeKind::Uint => "uint",
            TypeKind::Function => "function",
            TypeKind::Pointer => "pointer",
            TypeKind::Reference => "reference",
            TypeKind::Struct => "struct",
            TypeKind::Array => "array",
            TypeKind::Vector => "vector",
            TypeKind::ScalableVector => "scalable vector",
            TypeKind::Generic => "generic",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_indices_are_dense() {
        for (i, kind) in TypeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
