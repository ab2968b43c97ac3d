//! Import path resolution.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable listing extra import directories.
pub const IMPORT_PATH_VAR: &str = "VELA_IMPORT";

/// Source file extension tried when an import names a bare file.
pub const SOURCE_EXTENSION: &str = "vl";

/// Ordered list of directories searched for imports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportPaths {
    dirs: Vec<PathBuf>,
}

impl ImportPaths {
    pub fn new() -> Self {
        ImportPaths { dirs: Vec::new() }
    }

    /// Directories from `VELA_IMPORT` (platform path-list syntax), or the
    /// current directory when unset.
    pub fn from_env() -> Self {
        let dirs = match env::var_os(IMPORT_PATH_VAR) {
            Some(list) => env::split_paths(&list).collect(),
            None => vec![PathBuf::from(".")],
        };
        ImportPaths { dirs }
    }

    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Locate `name`: the importing file's directory first, then each
    /// search directory in order. Names without an extension also match
    /// `<name>.vl`. The result is canonicalized, so one file has one
    /// identity however it was named.
    pub fn resolve(&self, importer_dir: Option<&Path>, name: &str) -> Option<PathBuf> {
        let name = Path::new(name);
        let mut names = vec![name.to_path_buf()];
        if name.extension().is_none() {
            names.push(name.with_extension(SOURCE_EXTENSION));
        }

        importer_dir
            .into_iter()
            .chain(self.dirs.iter().map(PathBuf::as_path))
            .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
            .find(|candidate| candidate.is_file())
            .and_then(|found| found.canonicalize().ok())
    }
}

impl Default for ImportPaths {
    fn default() -> Self {
        Self::new()
    }
}
