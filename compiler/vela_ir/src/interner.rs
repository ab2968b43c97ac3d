//! Sharded symbol interner.
//!
//! Provides O(1) interning and lookup with concurrent access through
//! per-shard locking. Interning is append-only: a string, once interned,
//! keeps its symbol for the life of the interner.

use std::borrow::Cow;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::well_known::WELL_KNOWN_NAMES;
use crate::Symbol;

/// Per-shard storage for interned strings.
struct InternShard {
    /// Map from string content to local index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by local index.
    strings: Vec<&'static str>,
}

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// Shard exceeded its 28-bit local index space.
    ShardOverflow { shard_idx: usize, count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::ShardOverflow { shard_idx, count } => write!(
                f,
                "symbol interner shard {shard_idx} exceeded capacity: {count} strings, max is {}",
                Symbol::MAX_LOCAL
            ),
        }
    }
}

impl std::error::Error for InternError {}

impl InternShard {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        }
    }

    /// Shard whose local index 0 is occupied by a placeholder that is not
    /// reachable through the map, so no string interns to `Symbol::NONE`.
    fn with_reserved_none() -> Self {
        let mut shard = Self::new();
        shard.strings.push("");
        shard
    }
}

/// Sharded string interner for concurrent access.
pub struct SymbolInterner {
    shards: [RwLock<InternShard>; Symbol::NUM_SHARDS],
    /// Total count of interned strings across all shards.
    total_count: AtomicUsize,
}

impl SymbolInterner {
    /// Create an interner with the well-known names pre-interned.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(InternShard::with_reserved_none())
            } else {
                RwLock::new(InternShard::new())
            }
        });

        let interner = Self {
            shards,
            total_count: AtomicUsize::new(0),
        };
        for name in WELL_KNOWN_NAMES {
            interner.intern(name);
        }
        interner
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Symbol::NUM_SHARDS
    }

    fn insert(&self, text: Cow<'_, str>) -> Result<Symbol, InternError> {
        let shard_idx = Self::shard_for(&text);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "shard_idx is bounded by NUM_SHARDS (16)"
        )]
        let shard_u32 = shard_idx as u32;
        let shard = &self.shards[shard_idx];

        {
            let guard = shard.read();
            if let Some(&local) = guard.map.get(&*text) {
                return Ok(Symbol::new(shard_u32, local));
            }
        }

        let mut guard = shard.write();
        if let Some(&local) = guard.map.get(&*text) {
            return Ok(Symbol::new(shard_u32, local));
        }

        let count = guard.strings.len();
        let local = u32::try_from(count)
            .ok()
            .filter(|&local| local <= Symbol::MAX_LOCAL)
            .ok_or(InternError::ShardOverflow { shard_idx, count })?;

        let leaked: &'static str = Box::leak(text.into_owned().into_boxed_str());
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);
        self.total_count.fetch_add(1, Ordering::Relaxed);

        Ok(Symbol::new(shard_u32, local))
    }

    /// Intern a string, or report shard overflow.
    #[inline]
    pub fn try_intern(&self, s: &str) -> Result<Symbol, InternError> {
        self.insert(Cow::Borrowed(s))
    }

    /// Intern a string.
    ///
    /// # Panics
    /// Panics if a shard exceeds 2^28 strings. Use `try_intern` to handle it.
    #[inline]
    pub fn intern(&self, s: &str) -> Symbol {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Intern an owned string without copying it when it is new.
    pub fn try_intern_owned(&self, s: String) -> Result<Symbol, InternError> {
        self.insert(Cow::Owned(s))
    }

    /// Intern an owned string.
    ///
    /// # Panics
    /// Panics on shard overflow, like `intern`.
    pub fn intern_owned(&self, s: String) -> Symbol {
        self.try_intern_owned(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Find the symbol for `s` without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        let shard_idx = Self::shard_for(s);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "shard_idx is bounded by NUM_SHARDS (16)"
        )]
        let shard_u32 = shard_idx as u32;
        let guard = self.shards[shard_idx].read();
        guard.map.get(s).map(|&local| Symbol::new(shard_u32, local))
    }

    /// Look up the string for a symbol.
    ///
    /// # Panics
    /// Panics if the symbol was not produced by this interner.
    pub fn lookup(&self, sym: Symbol) -> &str {
        self.lookup_static(sym)
    }

    /// Look up the string for a symbol with a `'static` lifetime.
    ///
    /// Interned strings are leaked and never deallocated.
    pub fn lookup_static(&self, sym: Symbol) -> &'static str {
        let guard = self.shards[sym.shard()].read();
        guard.strings[sym.local()]
    }

    /// Look up the string for a symbol, returning `None` for
    /// [`Symbol::NONE`] and for symbols this interner never produced.
    pub fn try_lookup(&self, sym: Symbol) -> Option<&'static str> {
        if sym.is_none() {
            return None;
        }
        let guard = self.shards[sym.shard()].read();
        guard.strings.get(sym.local()).copied()
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.total_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for looking up symbol text.
pub trait SymbolLookup {
    fn lookup(&self, sym: Symbol) -> &str;
}

impl SymbolLookup for SymbolInterner {
    fn lookup(&self, sym: Symbol) -> &str {
        SymbolInterner::lookup(self, sym)
    }
}

/// Shared interner handle for components that keep their own interner.
#[derive(Clone)]
pub struct SharedInterner(Arc<SymbolInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Arc::new(SymbolInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SharedInterner {
    type Target = SymbolInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

static GLOBAL: OnceLock<SymbolInterner> = OnceLock::new();

/// The process-wide interner used by [`Symbol::intern`] and friends.
pub fn interner() -> &'static SymbolInterner {
    GLOBAL.get_or_init(SymbolInterner::new)
}
