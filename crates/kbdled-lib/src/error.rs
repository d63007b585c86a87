//! Unified error type for the kbdled-lib crate.
//!
//! [`KbdledError`] separates the failure kinds a run can end with: attribute or
//! cache I/O, undecodable values, a structurally corrupt cache, a cache that a
//! restore needed but never existed, and configuration problems. Each kind maps
//! to its own process exit status via [`KbdledError::exit_code`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Logical cache keys persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Last non-zero brightness applied by this tool.
    Brightness,
    /// Sticky pre-toggle brightness.
    HwBrightness,
    /// Packed four-region palette.
    Colors,
}

impl CacheKind {
    /// File name of the cache inside the cache directory.
    pub fn file_name(self) -> &'static str {
        match self {
            CacheKind::Brightness => "brightness",
            CacheKind::HwBrightness => "hw_brightness",
            CacheKind::Colors => "colors",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Brightness => write!(f, "brightness"),
            CacheKind::HwBrightness => write!(f, "hardware brightness"),
            CacheKind::Colors => write!(f, "color"),
        }
    }
}

/// Unified error type for kbdled-lib operations.
#[derive(Debug)]
pub enum KbdledError {
    /// An attribute or cache file could not be opened, read, or fully written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A value did not match its expected encoding (non-hex color, non-numeric level).
    Decode { path: PathBuf, reason: String },
    /// A cache blob is structurally invalid and was rejected as a whole.
    CacheCorrupt { path: PathBuf, reason: String },
    /// An operation required a cache that has never been written.
    MissingCache(CacheKind),
    /// Configuration validation error.
    Config(String),
}

impl KbdledError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        KbdledError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn decode(path: &Path, reason: impl Into<String>) -> Self {
        KbdledError::Decode {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        KbdledError::CacheCorrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error kind. Never 0, never 2 (clap usage errors).
    pub fn exit_code(&self) -> i32 {
        match self {
            KbdledError::Config(_) => 1,
            KbdledError::Io { .. } => 3,
            KbdledError::Decode { .. } => 4,
            KbdledError::CacheCorrupt { .. } => 5,
            KbdledError::MissingCache(_) => 6,
        }
    }
}

impl fmt::Display for KbdledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KbdledError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            KbdledError::Decode { path, reason } => {
                write!(f, "Decode error in {}: {reason}", path.display())
            }
            KbdledError::CacheCorrupt { path, reason } => {
                write!(f, "Corrupt cache {}: {reason}", path.display())
            }
            KbdledError::MissingCache(kind) => {
                write!(f, "cannot restore without a {kind} cache")
            }
            KbdledError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for KbdledError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KbdledError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Crate-level Result alias using [`KbdledError`].
pub type Result<T> = std::result::Result<T, KbdledError>;
