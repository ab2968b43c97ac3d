//! Target size parameters the common types are built from.

use serde::{Deserialize, Serialize};

use crate::TypeStoreError;

/// Byte widths of C `int`, `long` and pointers on the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetWidths {
    pub int_size: u32,
    pub long_size: u32,
    pub ptr_size: u32,
}

impl TargetWidths {
    /// Validated widths; each must be 1, 2, 4, 8 or 16 bytes.
    pub fn new(int_size: u32, long_size: u32, ptr_size: u32) -> Result<Self, TypeStoreError> {
        let valid = |w: u32| w.is_power_of_two() && w <= 16;
        if valid(int_size) && valid(long_size) && valid(ptr_size) {
            Ok(TargetWidths {
                int_size,
                long_size,
                ptr_size,
            })
        } else {
            Err(TypeStoreError::InvalidWidths {
                int_size,
                long_size,
                ptr_size,
            })
        }
    }

    /// Widths of the machine running the compiler.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "pointer width in bytes is at most 16"
    )]
    pub const fn host() -> Self {
        let ptr_size = std::mem::size_of::<usize>() as u32;
        let long_size = if cfg!(windows) { 4 } else { ptr_size };
        TargetWidths {
            int_size: 4,
            long_size,
            ptr_size,
        }
    }

    pub const fn int_bits(self) -> u32 {
        self.int_size * 8
    }

    pub const fn long_bits(self) -> u32 {
        self.long_size * 8
    }

    pub const fn ptr_bits(self) -> u32 {
        self.ptr_size * 8
    }
}

impl Default for TargetWidths {
    fn default() -> Self {
        Self::host()
    }
}
