//! Binary cache of compiled units.
//!
//! The cache for `dir/file.vl` lives next to it at `dir/file.vlc`:
//!
//! ```text
//! [magic: ".voidc\n\0"]
//! [u64 LE length][serialized unit]...
//! ```
//!
//! The writer reserves the magic with zeros and only writes it once every
//! unit of the file compiled, so an interrupted compilation never leaves a
//! cache that looks valid.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Marker at the start of a complete cache file.
pub const MAGIC: &[u8; 8] = b".voidc\n\0";

/// Errors reading or writing a cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache {}: truncated record at byte {offset}", path.display())]
    BadRecord { path: PathBuf, offset: u64 },

    #[error("cache {}: missing magic", path.display())]
    BadMagic { path: PathBuf },
}

/// Cache location for a source file: its path with `c` appended.
#[must_use]
pub fn cache_path_for(source: &Path) -> PathBuf {
    let mut path = source.as_os_str().to_owned();
    path.push("c");
    PathBuf::from(path)
}

/// Whether `cache` can stand in for `source`: it exists, starts with the
/// magic and was written no earlier than the source was modified.
pub fn is_cache_fresh(source: &Path, cache: &Path) -> bool {
    let Ok(source_meta) = fs::metadata(source) else {
        return false;
    };
    let Ok(cache_meta) = fs::metadata(cache) else {
        return false;
    };
    let (Ok(source_time), Ok(cache_time)) = (source_meta.modified(), cache_meta.modified()) else {
        return false;
    };
    if cache_time < source_time {
        return false;
    }

    let mut magic = [0u8; 8];
    File::open(cache)
        .and_then(|mut file| file.read_exact(&mut magic))
        .is_ok_and(|()| &magic == MAGIC)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends unit records to a new cache file.
pub struct CacheWriter {
    path: PathBuf,
    out: BufWriter<File>,
    records: usize,
}

impl CacheWriter {
    /// Create (or truncate) the cache file and reserve the magic.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = CacheWriter {
            path,
            out: BufWriter::new(file),
            records: 0,
        };
        writer.write_all(&[0u8; 8])?;
        Ok(writer)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), CacheError> {
        self.out.write_all(bytes).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn write_record(&mut self, unit: &[u8]) -> Result<(), CacheError> {
        self.write_all(&(unit.len() as u64).to_le_bytes())?;
        self.write_all(unit)?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Stamp the magic, marking the cache complete.
    pub fn finish(mut self) -> Result<PathBuf, CacheError> {
        let path = self.path.clone();
        let io_err = |source| CacheError::Io {
            path: path.clone(),
            source,
        };
        self.out.flush().map_err(io_err)?;
        let file = self.out.get_mut();
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        file.write_all(MAGIC).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        tracing::debug!(cache = %path.display(), records = self.records, "cache written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Iterates the unit records of a complete cache file.
pub struct CacheReader {
    path: PathBuf,
    input: BufReader<File>,
    offset: u64,
    done: bool,
}

impl CacheReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let mut input = BufReader::new(file);
        let mut magic = [0u8; 8];
        if input.read_exact(&mut magic).is_err() || &magic != MAGIC {
            return Err(CacheError::BadMagic { path });
        }
        Ok(CacheReader {
            path,
            input,
            offset: MAGIC.len() as u64,
            done: false,
        })
    }

    fn next_record(&mut self) -> Result<Option<Vec<u8>>, CacheError> {
        let mut len = [0u8; 8];
        let read = read_full(&mut self.input, &mut len).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        match read {
            0 => return Ok(None),
            8 => {}
            _ => {
                return Err(CacheError::BadRecord {
                    path: self.path.clone(),
                    offset: self.offset,
                })
            }
        }
        let len = u64::from_le_bytes(len);
        let mut unit = Vec::new();
        let got = (&mut self.input)
            .take(len)
            .read_to_end(&mut unit)
            .map_err(|source| CacheError::Io {
                path: self.path.clone(),
                source,
            })?;
        if got as u64 != len {
            return Err(CacheError::BadRecord {
                path: self.path.clone(),
                offset: self.offset,
            });
        }
        self.offset += 8 + len;
        Ok(Some(unit))
    }
}

impl Iterator for CacheReader {
    type Item = Result<Vec<u8>, CacheError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_record().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Read until `buf` is full or the input ends; returns the bytes read.
fn read_full(input: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn cache_path_appends_c() {
        assert_eq!(
            cache_path_for(Path::new("lib/common.vl")),
            PathBuf::from("lib/common.vlc")
        );
    }

    #[test]
    fn records_read_back_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.vlc");

        let mut writer = CacheWriter::create(&path).unwrap();
        writer.write_record(b"first").unwrap();
        writer.write_record(b"").unwrap();
        writer.write_record(b"third unit").unwrap();
        assert_eq!(writer.records(), 3);
        writer.finish().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], MAGIC);
        assert_eq!(&bytes[8..16], &5u64.to_le_bytes());

        let records: Vec<Vec<u8>> = CacheReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            records,
            vec![b"first".to_vec(), Vec::new(), b"third unit".to_vec()]
        );
    }

    #[test]
    fn unfinished_cache_is_not_fresh() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.vl");
        fs::write(&source, "x = 1;").unwrap();
        let cache = cache_path_for(&source);

        let mut writer = CacheWriter::create(&cache).unwrap();
        writer.write_record(b"unit").unwrap();
        drop(writer);

        assert!(!is_cache_fresh(&source, &cache));
        assert!(matches!(
            CacheReader::open(&cache),
            Err(CacheError::BadMagic { .. })
        ));
    }

    #[test]
    fn newer_source_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.vl");
        fs::write(&source, "x = 1;").unwrap();
        let cache = cache_path_for(&source);
        CacheWriter::create(&cache).unwrap().finish().unwrap();
        assert!(is_cache_fresh(&source, &cache));

        let later = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert!(!is_cache_fresh(&source, &cache));
    }

    #[test]
    fn truncated_record_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.vlc");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&10u64.to_le_bytes());
        bytes.extend_from_slice(b"short");
        fs::write(&path, bytes).unwrap();

        let mut reader = CacheReader::open(&path).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(CacheError::BadRecord { offset: 8, .. }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn missing_cache_is_not_fresh() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.vl");
        fs::write(&source, "").unwrap();
        assert!(!is_cache_fresh(&source, &cache_path_for(&source)));
    }
}
