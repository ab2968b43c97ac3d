//! Run-time values of the reference JIT.

use std::rc::Rc;

use crate::NativeType;

/// Where a run-time pointer points.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pointer {
    Null,
    /// A global cell owned by the JIT.
    Cell(u32),
    /// A stack slot of the running unit.
    Stack(u32),
    /// A byte of a linked string literal.
    Str { id: u32, offset: u32 },
}

/// Resolved address of a native symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeAddress {
    Data(u32),
    Code(u32),
}

/// A value held in a register, stack slot or global cell.
#[derive(Clone, Debug, PartialEq)]
pub enum RtValue {
    Void,
    /// Integer bits, zero-extended to 64.
    Int {
        bits: u32,
        value: u64,
    },
    Float(f64),
    Ptr(Pointer),
    Func(u32),
    Aggregate(Vec<RtValue>),
}

fn mask(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

#[allow(clippy::cast_possible_wrap, reason = "reinterpreting bits")]
fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 || bits == 0 {
        value as i64
    } else {
        let shift = 64 - bits;
        ((value << shift) as i64) >> shift
    }
}

impl RtValue {
    #[allow(clippy::cast_sign_loss, reason = "reinterpreting bits")]
    pub fn int(bits: u32, value: i64) -> Self {
        RtValue::Int {
            bits,
            value: mask(value as u64, bits),
        }
    }

    /// The integer read as signed at its own width.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            RtValue::Int { bits, value } => Some(sign_extend(value, bits)),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            RtValue::Int { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<Pointer> {
        match *self {
            RtValue::Ptr(ptr) => Some(ptr),
            _ => None,
        }
    }

    /// Resize an integer, extending by its sign when `signed`.
    #[allow(clippy::cast_sign_loss, reason = "reinterpreting bits")]
    pub fn int_cast(&self, to_bits: u32, signed: bool) -> Option<RtValue> {
        let RtValue::Int { bits, value } = *self else {
            return None;
        };
        let widened = if signed && to_bits > bits {
            sign_extend(value, bits) as u64
        } else {
            value
        };
        Some(RtValue::Int {
            bits: to_bits,
            value: mask(widened, to_bits),
        })
    }

    /// Zero-initialized value of `ty`.
    pub fn zero(ty: &NativeType) -> RtValue {
        match ty {
            NativeType::Int { bits } => RtValue::Int {
                bits: *bits,
                value: 0,
            },
            NativeType::Float { .. } => RtValue::Float(0.0),
            NativeType::Ptr { .. } => RtValue::Ptr(Pointer::Null),
            NativeType::Struct {
                body: Some(fields), ..
            } => RtValue::Aggregate(fields.iter().map(RtValue::zero).collect()),
            NativeType::Array { elem, len } => {
                let len = usize::try_from(*len).unwrap_or(0);
                RtValue::Aggregate(vec![RtValue::zero(elem); len])
            }
            NativeType::Vector {
                elem,
                lanes,
                scalable: false,
            } => RtValue::Aggregate(vec![RtValue::zero(elem); *lanes as usize]),
            _ => RtValue::Void,
        }
    }
}

/// Read access to JIT memory for host functions.
pub struct HostMemory<'a> {
    pub(crate) cells: &'a [RtValue],
    pub(crate) strings: &'a [Box<str>],
}

impl<'a> HostMemory<'a> {
    /// The string a pointer into a string literal refers to, from its
    /// offset to the end.
    pub fn read_str(&self, ptr: Pointer) -> Option<&'a str> {
        match ptr {
            Pointer::Str { id, offset } => self.strings.get(id as usize)?.get(offset as usize..),
            _ => None,
        }
    }

    /// Current value of a global cell.
    pub fn load(&self, ptr: Pointer) -> Option<&'a RtValue> {
        match ptr {
            Pointer::Cell(cell) => self.cells.get(cell as usize),
            _ => None,
        }
    }
}

/// Host function callable from generated code.
pub type HostFn = Rc<dyn Fn(&HostMemory<'_>, &[RtValue]) -> Result<RtValue, String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_are_masked_to_width() {
        let v = RtValue::int(8, -1);
        assert_eq!(v.as_u64(), Some(0xFF));
        assert_eq!(v.as_i64(), Some(-1));
        assert_eq!(RtValue::int(64, i64::MIN).as_i64(), Some(i64::MIN));
    }

    #[test]
    fn casts_extend_by_signedness() {
        let byte = RtValue::int(8, -2);
        assert_eq!(byte.int_cast(32, true).and_then(|v| v.as_i64()), Some(-2));
        assert_eq!(byte.int_cast(32, false).and_then(|v| v.as_u64()), Some(0xFE));
        let wide = RtValue::int(32, 0x1234);
        assert_eq!(wide.int_cast(8, true).and_then(|v| v.as_u64()), Some(0x34));
        assert_eq!(RtValue::Void.int_cast(8, true), None);
    }

    #[test]
    fn zero_values_follow_shape() {
        let ty = NativeType::Struct {
            name: None,
            body: Some(vec![NativeType::Int { bits: 32 }, NativeType::Float { bits: 64 }]),
            packed: false,
        };
        assert_eq!(
            RtValue::zero(&ty),
            RtValue::Aggregate(vec![RtValue::int(32, 0), RtValue::Float(0.0)])
        );
        assert_eq!(
            RtValue::zero(&NativeType::Ptr {
                addr_space: 0,
                bits: 64
            }),
            RtValue::Ptr(Pointer::Null)
        );
    }
}
