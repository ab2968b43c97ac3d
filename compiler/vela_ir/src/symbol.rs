//! Interned symbol handle ("quark").
//!
//! A [`Symbol`] is a 32-bit handle for an interned string. Equal strings
//! always produce the same symbol, and the raw value 0 is reserved for
//! [`Symbol::NONE`], which no string ever interns to.

use std::fmt;

use crate::interner;

/// Interned string identifier.
///
/// Layout: 32-bit index split into shard (4 bits) + local index (28 bits)
/// - Bits 31-28: Shard index (0-15)
/// - Bits 27-0: Local index within shard
///
/// Shard 0, local 0 is never handed out by an interner.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// The "no symbol" value.
    pub const NONE: Symbol = Symbol(0);

    /// Maximum local index per shard.
    pub const MAX_LOCAL: u32 = 0x0FFF_FFFF;

    /// Number of shards.
    pub const NUM_SHARDS: usize = 16;

    /// Create from shard and local index.
    #[inline]
    pub const fn new(shard: u32, local: u32) -> Self {
        debug_assert!(shard < 16);
        debug_assert!(local <= Self::MAX_LOCAL);
        Symbol((shard << 28) | local)
    }

    /// Extract shard index.
    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> 28) as usize
    }

    /// Extract local index.
    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Symbol(raw)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// Intern `text` in the process-wide interner.
    pub fn intern(text: &str) -> Symbol {
        interner().intern(text)
    }

    /// Find the symbol of `text` without interning it.
    pub fn get(text: &str) -> Option<Symbol> {
        interner().get(text)
    }

    /// The interned text, or `""` for [`Symbol::NONE`] and for symbols
    /// that did not come from the process-wide interner.
    pub fn as_str(self) -> &'static str {
        interner().try_lookup(self).unwrap_or("")
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("Symbol(none)");
        }
        match interner().try_lookup(*self) {
            Some(text) => write!(f, "Symbol({text:?})"),
            None => write!(f, "Symbol(shard={}, local={})", self.shard(), self.local()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
