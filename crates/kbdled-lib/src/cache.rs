//! Persistent cache: one file per key under the cache directory.
//!
//! Values are loaded once at construction and written through on every
//! [`CacheEntry::set`]. A file that does not decode is either treated as
//! absent (scalar caches) or remembered as corrupt and rejected loudly when an
//! operation requires it (the color cache), depending on the codec.

use std::path::{Path, PathBuf};

use crate::attr::AttributeStore;
use crate::error::{CacheKind, KbdledError, Result};

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/system76-kbd-led";

/// Text encoding of a cached value.
pub trait CacheCodec: Sized {
    /// Whether an undecodable file is equivalent to a missing one.
    const CORRUPT_IS_ABSENT: bool;

    fn encode(&self) -> String;

    /// Decode file contents. `path` is for error context only.
    fn decode(raw: &str, path: &Path) -> Result<Self>;
}

impl CacheCodec for u32 {
    const CORRUPT_IS_ABSENT: bool = true;

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str, path: &Path) -> Result<Self> {
        let text = raw.trim_end();
        text.parse::<u32>()
            .map_err(|_| KbdledError::decode(path, format!("not a decimal integer: {text:?}")))
    }
}

#[derive(Debug)]
enum Slot<T> {
    Missing,
    Loaded(T),
    Corrupt(String),
}

/// A single cached value and its backing file.
#[derive(Debug)]
pub struct CacheEntry<T> {
    path: PathBuf,
    slot: Slot<T>,
}

impl<T: CacheCodec> CacheEntry<T> {
    /// Load the entry from `path`. A missing file yields an empty entry; an
    /// unreadable existing file is an I/O error.
    pub fn load(store: &impl AttributeStore, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !store.exists(&path) {
            return Ok(CacheEntry {
                path,
                slot: Slot::Missing,
            });
        }
        let raw = store.read(&path)?;
        let slot = match std::str::from_utf8(&raw) {
            Ok(text) => match T::decode(text, &path) {
                Ok(value) => Slot::Loaded(value),
                Err(e) => Self::undecodable(&path, e.to_string()),
            },
            Err(_) => Self::undecodable(&path, "contents are not valid UTF-8".into()),
        };
        Ok(CacheEntry { path, slot })
    }

    fn undecodable(path: &Path, reason: String) -> Slot<T> {
        if T::CORRUPT_IS_ABSENT {
            log::warn!("ignoring unreadable cache {}: {reason}", path.display());
            Slot::Missing
        } else {
            log::warn!("cache {} is corrupt: {reason}", path.display());
            Slot::Corrupt(reason)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff the backing file existed and decoded on load, or was written since.
    pub fn exists(&self) -> bool {
        matches!(self.slot, Slot::Loaded(_))
    }

    /// True if the backing file was present but rejected as corrupt.
    pub fn is_corrupt(&self) -> bool {
        matches!(self.slot, Slot::Corrupt(_))
    }

    /// The in-memory value. Never re-reads the file.
    pub fn get(&self) -> Option<&T> {
        match &self.slot {
            Slot::Loaded(v) => Some(v),
            _ => None,
        }
    }

    /// The in-memory value, or the error an operation depending on it must fail with.
    pub fn require(&self, kind: CacheKind) -> Result<&T> {
        match &self.slot {
            Slot::Loaded(v) => Ok(v),
            Slot::Missing => Err(KbdledError::MissingCache(kind)),
            Slot::Corrupt(reason) => Err(KbdledError::corrupt(&self.path, reason.clone())),
        }
    }

    /// Update the value and write it through to the backing file.
    pub fn set(&mut self, store: &impl AttributeStore, value: T) -> Result<()> {
        store.write(&self.path, value.encode().as_bytes())?;
        log::debug!("cache {} <- {}", self.path.display(), value.encode());
        self.slot = Slot::Loaded(value);
        Ok(())
    }
}

/// Paths of the cache files under one cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    dir: PathBuf,
}

impl CacheLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheLayout { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: CacheKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl Default for CacheLayout {
    fn default() -> Self {
        CacheLayout::new(DEFAULT_CACHE_DIR)
    }
}

/// Create the cache directory if it does not exist yet.
pub fn ensure_cache_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|e| KbdledError::io(dir, e))?;
    log::info!("created cache directory {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::mock::MockStore;

    /// Strict test codec: only "ok" decodes.
    #[derive(Debug, PartialEq)]
    struct Strict;

    impl CacheCodec for Strict {
        const CORRUPT_IS_ABSENT: bool = false;
        fn encode(&self) -> String {
            "ok".into()
        }
        fn decode(raw: &str, path: &Path) -> Result<Self> {
            if raw == "ok" {
                Ok(Strict)
            } else {
                Err(KbdledError::corrupt(path, "not ok"))
            }
        }
    }

    #[test]
    fn missing_file_is_empty_entry() {
        let store = MockStore::new();
        let entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        assert!(!entry.exists());
        assert_eq!(entry.get(), None);
        assert!(matches!(
            entry.require(CacheKind::Brightness),
            Err(KbdledError::MissingCache(CacheKind::Brightness))
        ));
    }

    #[test]
    fn integer_tolerates_trailing_whitespace() {
        let store = MockStore::new();
        store.insert("/c/brightness", "120\n");
        let entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        assert_eq!(entry.get(), Some(&120));
    }

    #[test]
    fn integer_garbage_is_absent() {
        let store = MockStore::new();
        store.insert("/c/brightness", "12a");
        let entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        assert!(!entry.exists());
        assert!(!entry.is_corrupt());
    }

    #[test]
    fn integer_empty_file_is_absent() {
        let store = MockStore::new();
        store.insert("/c/brightness", "");
        let entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        assert!(!entry.exists());
    }

    #[test]
    fn set_writes_plain_decimal() {
        let store = MockStore::new();
        let mut entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        entry.set(&store, 48).unwrap();
        assert_eq!(store.text(Path::new("/c/brightness")).unwrap(), "48");
        assert_eq!(entry.get(), Some(&48));
        assert!(entry.exists());
    }

    #[test]
    fn set_failure_keeps_old_value() {
        let store = MockStore::new();
        store.insert("/c/brightness", "10");
        let mut entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        store.fail_writes_to("/c/brightness");
        assert!(entry.set(&store, 99).is_err());
        assert_eq!(entry.get(), Some(&10));
    }

    #[test]
    fn get_never_rereads_file() {
        let store = MockStore::new();
        store.insert("/c/brightness", "10");
        let entry = CacheEntry::<u32>::load(&store, "/c/brightness").unwrap();
        store.insert("/c/brightness", "20");
        assert_eq!(entry.get(), Some(&10));
    }

    #[test]
    fn strict_codec_remembers_corruption() {
        let store = MockStore::new();
        store.insert("/c/colors", "nope");
        let entry = CacheEntry::<Strict>::load(&store, "/c/colors").unwrap();
        assert!(!entry.exists());
        assert!(entry.is_corrupt());
        let err = entry.require(CacheKind::Colors).unwrap_err();
        assert!(matches!(err, KbdledError::CacheCorrupt { .. }), "got: {err}");
    }

    #[test]
    fn strict_codec_overwrite_clears_corruption() {
        let store = MockStore::new();
        store.insert("/c/colors", "nope");
        let mut entry = CacheEntry::<Strict>::load(&store, "/c/colors").unwrap();
        entry.set(&store, Strict).unwrap();
        assert!(entry.exists());
        assert_eq!(entry.require(CacheKind::Colors).unwrap(), &Strict);
    }

    #[test]
    fn layout_paths() {
        let layout = CacheLayout::new("/var/cache/kbd");
        assert_eq!(
            layout.path(CacheKind::HwBrightness),
            Path::new("/var/cache/kbd/hw_brightness")
        );
        assert_eq!(
            CacheLayout::default().path(CacheKind::Colors),
            Path::new("/var/cache/system76-kbd-led/colors")
        );
    }

    #[test]
    fn ensure_cache_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        ensure_cache_dir(&target).unwrap();
        assert!(target.is_dir());
        // Idempotent
        ensure_cache_dir(&target).unwrap();
    }
}
