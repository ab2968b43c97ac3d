//! Session configuration.

use std::env;

use vela_types::TargetWidths;

use crate::ImportPaths;

/// Set to `0` to ignore existing binary caches.
pub const USE_CACHE_VAR: &str = "VELA_USE_CACHE";

/// How a [`Session`](crate::Session) finds, caches and lays out code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub import_paths: ImportPaths,
    /// Load imported files from fresh caches.
    pub use_cache: bool,
    /// Write caches for imported files compiled from source.
    pub write_cache: bool,
    pub widths: TargetWidths,
}

impl SessionConfig {
    /// Defaults with import paths and cache switch taken from the
    /// environment.
    pub fn from_env() -> Self {
        let use_cache = env::var(USE_CACHE_VAR).map_or(true, |v| v != "0");
        SessionConfig {
            import_paths: ImportPaths::from_env(),
            use_cache,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_import_paths(mut self, paths: ImportPaths) -> Self {
        self.import_paths = paths;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, use_cache: bool, write_cache: bool) -> Self {
        self.use_cache = use_cache;
        self.write_cache = write_cache;
        self
    }

    #[must_use]
    pub fn with_widths(mut self, widths: TargetWidths) -> Self {
        self.widths = widths;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            import_paths: ImportPaths::new(),
            use_cache: true,
            write_cache: true,
            widths: TargetWidths::host(),
        }
    }
}
