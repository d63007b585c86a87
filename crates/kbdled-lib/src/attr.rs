//! Attribute store: byte-level access to device attributes and cache files.
//!
//! Every call touches the backing store and blocks. Nothing here retries: a
//! failed attribute write is a permission or hot-unplug problem and is
//! surfaced immediately.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{KbdledError, Result};
use crate::regions::Region;

/// Default sysfs LED directory of the keyboard backlight.
pub const DEFAULT_DEVICE_DIR: &str = "/sys/class/leds/system76::kbd_backlight";

// ── Trait ──

pub trait AttributeStore {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the full contents at `path`. An empty result is not an error here.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `bytes` to `path` in a single write, replacing previous contents.
    /// Fewer bytes written than requested is an error.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Read `path`, failing when it yields zero bytes.
    fn read_nonempty(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = self.read(path)?;
        if bytes.is_empty() {
            return Err(KbdledError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "attribute is empty"),
            ));
        }
        Ok(bytes)
    }

    /// Read `path` as UTF-8 text with trailing whitespace stripped.
    fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = self.read_nonempty(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| KbdledError::decode(path, "attribute is not valid UTF-8"))?;
        Ok(text.trim_end().to_string())
    }

    /// Read `path` as a decimal unsigned integer.
    fn read_u32(&self, path: &Path) -> Result<u32> {
        let text = self.read_text(path)?;
        text.parse::<u32>()
            .map_err(|_| KbdledError::decode(path, format!("not a decimal integer: {text:?}")))
    }
}

// ── Filesystem backend ──

/// Attribute store backed by the real filesystem (sysfs and the cache directory).
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl AttributeStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = std::fs::File::open(path).map_err(|e| KbdledError::io(path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| KbdledError::io(path, e))?;
        Ok(buf)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| KbdledError::io(path, e))?;
        // sysfs attributes expect the whole value in one write(2)
        let written = file.write(bytes).map_err(|e| KbdledError::io(path, e))?;
        if written != bytes.len() {
            return Err(KbdledError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("short write: {written} of {} bytes", bytes.len()),
                ),
            ));
        }
        Ok(())
    }
}

// ── Device layout ──

/// Paths of the device attributes under one LED directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    dir: PathBuf,
}

impl DeviceLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DeviceLayout { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn brightness(&self) -> PathBuf {
        self.dir.join("brightness")
    }

    pub fn max_brightness(&self) -> PathBuf {
        self.dir.join("max_brightness")
    }

    pub fn brightness_hw_changed(&self) -> PathBuf {
        self.dir.join("brightness_hw_changed")
    }

    pub fn color(&self, region: Region) -> PathBuf {
        self.dir.join(region.attribute())
    }
}

impl Default for DeviceLayout {
    fn default() -> Self {
        DeviceLayout::new(DEFAULT_DEVICE_DIR)
    }
}

// ── Mock backend ──

pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    /// In-memory attribute store for tests. Files live in a HashMap keyed by
    /// path; every successful write is also recorded in order.
    #[derive(Default)]
    pub struct MockStore {
        /// File storage: path → contents.
        pub files: RefCell<HashMap<PathBuf, Vec<u8>>>,
        /// Recorded writes: (path, bytes).
        pub writes: RefCell<Vec<(PathBuf, Vec<u8>)>>,
        /// Paths whose writes fail with a permission error.
        pub fail_writes: RefCell<HashSet<PathBuf>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a file without recording a write.
        pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl AsRef<[u8]>) {
            self.files
                .borrow_mut()
                .insert(path.into(), bytes.as_ref().to_vec());
        }

        /// Remove a file.
        pub fn remove(&self, path: &Path) {
            self.files.borrow_mut().remove(path);
        }

        /// Current contents of a file as text, if present.
        pub fn text(&self, path: &Path) -> Option<String> {
            self.files
                .borrow()
                .get(path)
                .map(|b| String::from_utf8_lossy(b).into_owned())
        }

        /// Make every subsequent write to `path` fail.
        pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
            self.fail_writes.borrow_mut().insert(path.into());
        }

        /// Number of recorded writes to `path`.
        pub fn write_count(&self, path: &Path) -> usize {
            self.writes.borrow().iter().filter(|(p, _)| p == path).count()
        }

        /// Whether any write landed under `dir`.
        pub fn wrote_under(&self, dir: &Path) -> bool {
            self.writes.borrow().iter().any(|(p, _)| p.starts_with(dir))
        }
    }

    impl AttributeStore for MockStore {
        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path)
        }

        fn read(&self, path: &Path) -> Result<Vec<u8>> {
            self.files.borrow().get(path).cloned().ok_or_else(|| {
                KbdledError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                )
            })
        }

        fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
            if self.fail_writes.borrow().contains(path) {
                return Err(KbdledError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "write refused"),
                ));
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), bytes.to_vec());
            self.writes
                .borrow_mut()
                .push((path.to_path_buf(), bytes.to_vec()));
            Ok(())
        }
    }
}
