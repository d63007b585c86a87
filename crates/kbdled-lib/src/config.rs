//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::attr::{DEFAULT_DEVICE_DIR, DeviceLayout};
use crate::cache::{CacheLayout, DEFAULT_CACHE_DIR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// LED class directory holding the brightness and color attributes.
    #[serde(default = "default_device_dir")]
    pub device_dir: String,

    /// Directory for the brightness, hw_brightness, and colors caches.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Lower clamp bound for set/increment. Toggling off still reaches 0.
    #[serde(default)]
    pub min_brightness: u32,
}

fn default_device_dir() -> String {
    DEFAULT_DEVICE_DIR.into()
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.into()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_dir: default_device_dir(),
            cache_dir: default_cache_dir(),
            min_brightness: 0,
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A path field is empty or whitespace-only.
    EmptyPath { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyPath { field } => write!(f, "{field} cannot be empty"),
        }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub device: DeviceLayout,
    pub caches: CacheLayout,
    pub min_brightness: u32,
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kbdled"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.device_dir.trim().is_empty() {
            errors.push(ValidationError::EmptyPath {
                field: "device_dir",
            });
        }
        if self.cache_dir.trim().is_empty() {
            errors.push(ValidationError::EmptyPath { field: "cache_dir" });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and resolve into run settings.
    pub fn settings(&self) -> crate::error::Result<Settings> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(ToString::to_string).collect();
            crate::KbdledError::Config(msgs.join("; "))
        })?;
        Ok(Settings {
            device: DeviceLayout::new(self.device_dir.trim()),
            caches: CacheLayout::new(self.cache_dir.trim()),
            min_brightness: self.min_brightness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.device_dir, "/sys/class/leds/system76::kbd_backlight");
        assert_eq!(c.cache_dir, "/var/cache/system76-kbd-led");
        assert_eq!(c.min_brightness, 0);
    }

    #[test]
    fn serialize_roundtrip() {
        let c = Config {
            device_dir: "/sys/class/leds/other".into(),
            cache_dir: "/tmp/kbd".into(),
            min_brightness: 45,
        };
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c2, c);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("min_brightness = 45").unwrap();
        assert_eq!(c.min_brightness, 45);
        assert_eq!(c.device_dir, "/sys/class/leds/system76::kbd_backlight");
        assert_eq!(c.cache_dir, "/var/cache/system76-kbd-led");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn wrong_type_toml_is_error() {
        let result: std::result::Result<Config, _> = toml::from_str("min_brightness = \"low\"");
        assert!(result.is_err());
    }

    #[test]
    fn negative_min_brightness_is_error() {
        let result: std::result::Result<Config, _> = toml::from_str("min_brightness = -1");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_missing_file_gives_defaults_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("config.toml"));
        assert_eq!(c, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_from_malformed_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(c, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"), "got: {}", warnings[0]);
    }

    #[test]
    fn load_from_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cache_dir = \"/tmp/kbdled\"\n").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(c.cache_dir, "/tmp/kbdled");
    }

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(path) = Config::path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
            assert_eq!(path.parent().unwrap().file_name().unwrap(), "kbdled");
        }
    }

    #[test]
    fn validate_collects_all_errors() {
        let c = Config {
            device_dir: " ".into(),
            cache_dir: "".into(),
            min_brightness: 0,
        };
        let errors = c.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "device_dir cannot be empty");
    }

    #[test]
    fn settings_resolves_layouts() {
        let c = Config {
            device_dir: "/dev/kbd".into(),
            cache_dir: "/cache".into(),
            min_brightness: 45,
        };
        let s = c.settings().unwrap();
        assert_eq!(s.device.brightness(), Path::new("/dev/kbd/brightness"));
        assert_eq!(s.caches.dir(), Path::new("/cache"));
        assert_eq!(s.min_brightness, 45);
    }

    #[test]
    fn settings_rejects_invalid_config() {
        let c = Config {
            cache_dir: "".into(),
            ..Config::default()
        };
        let err = c.settings().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("cache_dir"));
    }
}
