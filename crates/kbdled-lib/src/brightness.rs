//! Brightness state: live level, hardware level, and their caches.
//!
//! Two caches back the state: `brightness` holds the last non-zero level this
//! tool applied (the restore source) and `hw_brightness` is the sticky memory
//! replayed when toggling back on. A zero level is never written to either.

use std::path::PathBuf;

use serde::Serialize;

use crate::attr::{AttributeStore, DeviceLayout};
use crate::cache::{CacheEntry, CacheLayout};
use crate::error::{CacheKind, Result};

/// Point-in-time view of the brightness state, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrightnessSnapshot {
    pub level: u32,
    pub max_level: u32,
    pub hw_level: u32,
    pub min_level: u32,
}

#[derive(Debug)]
pub struct BrightnessState {
    level: u32,
    hw_level: u32,
    max_level: u32,
    min_level: u32,
    path: PathBuf,
    cache: CacheEntry<u32>,
    hw_cache: CacheEntry<u32>,
    cache_written: bool,
}

impl BrightnessState {
    /// Read the device attributes, load both caches, and reconcile any
    /// brightness change made outside this tool since the last run.
    ///
    /// `min_level` is the lower clamp bound for [`set_value`](Self::set_value)
    /// and [`increment`](Self::increment).
    pub fn init(
        store: &impl AttributeStore,
        device: &DeviceLayout,
        caches: &CacheLayout,
        min_level: u32,
    ) -> Result<Self> {
        let max_level = store.read_u32(&device.max_brightness())?;
        let path = device.brightness();
        let level = store.read_u32(&path)?;

        let hw_path = device.brightness_hw_changed();
        let hw_level = if store.exists(&hw_path) {
            store.read_u32(&hw_path).unwrap_or_else(|e| {
                log::warn!("ignoring {}: {e}", hw_path.display());
                0
            })
        } else {
            0
        };

        let mut state = BrightnessState {
            level: level.min(max_level),
            hw_level,
            max_level,
            min_level,
            path,
            cache: CacheEntry::load(store, caches.path(CacheKind::Brightness))?,
            hw_cache: CacheEntry::load(store, caches.path(CacheKind::HwBrightness))?,
            cache_written: false,
        };
        state.reconcile_hardware(store)?;
        Ok(state)
    }

    /// Bring the sticky memory up to date with the live level.
    ///
    /// A live level of zero is taken as a deliberate off-toggle and never
    /// overwrites the remembered brightness.
    fn reconcile_hardware(&mut self, store: &impl AttributeStore) -> Result<()> {
        match self.hw_cache.get().copied() {
            Some(cached) => {
                if self.level != 0 && self.level != cached {
                    log::info!("brightness changed outside kbdled: {cached} -> {}", self.level);
                    self.hw_cache.set(store, self.level)?;
                }
            }
            None => {
                let seed = if self.level != 0 {
                    self.level
                } else {
                    self.hw_level
                };
                if seed != 0 {
                    self.hw_cache.set(store, seed)?;
                    if !self.cache.exists() {
                        self.cache.set(store, seed)?;
                        self.cache_written = true;
                    }
                }
            }
        }
        if let Some(&sticky) = self.hw_cache.get() {
            self.hw_level = sticky;
        }
        Ok(())
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn hw_level(&self) -> u32 {
        self.hw_level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn snapshot(&self) -> BrightnessSnapshot {
        BrightnessSnapshot {
            level: self.level,
            max_level: self.max_level,
            hw_level: self.hw_level,
            min_level: self.min_level,
        }
    }

    /// Clamp `value` into `[min_level, max_level]`. A lower bound above the
    /// maximum collapses onto the maximum.
    pub fn clamp(&self, value: i64) -> u32 {
        let lo = i64::from(self.min_level.min(self.max_level));
        let hi = i64::from(self.max_level);
        value.clamp(lo, hi) as u32
    }

    fn write_level(&mut self, store: &impl AttributeStore, level: u32) -> Result<()> {
        store.write(&self.path, level.to_string().as_bytes())?;
        log::debug!("brightness {} -> {level}", self.level);
        self.level = level;
        Ok(())
    }

    /// Clamp and write `value`. The write happens even if the level is unchanged.
    pub fn set_value(&mut self, store: &impl AttributeStore, value: i64) -> Result<()> {
        let level = self.clamp(value);
        self.write_level(store, level)
    }

    /// Add `delta` to the current level, clamping instead of wrapping.
    pub fn increment(&mut self, store: &impl AttributeStore, delta: i64) -> Result<()> {
        let target = i64::from(self.level).saturating_add(delta);
        self.set_value(store, target)
    }

    /// Switch the backlight off (remembering the level) or back on (replaying it).
    pub fn toggle(&mut self, store: &impl AttributeStore) -> Result<()> {
        if self.level != 0 {
            self.hw_cache.set(store, self.level)?;
            self.hw_level = self.level;
            log::info!("toggle off (remembering {})", self.level);
            return self.write_level(store, 0);
        }
        let target = match self.hw_cache.get().copied() {
            Some(level) if level != 0 => level,
            _ => {
                log::warn!(
                    "no remembered brightness, toggling on at {}",
                    self.max_level
                );
                self.max_level
            }
        };
        log::info!("toggle on ({target})");
        self.replay(store, target)
    }

    /// Write a remembered level back. Only the maximum applies: the lower
    /// bound is for new values, not for replaying old ones.
    fn replay(&mut self, store: &impl AttributeStore, level: u32) -> Result<()> {
        self.write_level(store, level.min(self.max_level))
    }

    /// The cached restore level, or the error a restore must fail with.
    pub fn cached_level(&self) -> Result<u32> {
        self.cache.require(CacheKind::Brightness).copied()
    }

    /// Apply the cached brightness.
    pub fn restore(&mut self, store: &impl AttributeStore) -> Result<()> {
        let level = self.cached_level()?;
        self.replay(store, level)?;
        log::info!("restored brightness {}", self.level);
        Ok(())
    }

    /// Persist a non-zero level that differs from the brightness cache.
    /// Returns whether it wrote.
    pub fn sync_cache(&mut self, store: &impl AttributeStore) -> Result<bool> {
        if self.level == 0 || self.cache.get() == Some(&self.level) {
            return Ok(false);
        }
        self.cache.set(store, self.level)?;
        self.cache_written = true;
        Ok(true)
    }

    /// Whether this run has written the brightness cache, seeding included.
    pub fn cache_written(&self) -> bool {
        self.cache_written
    }

    /// Value of the brightness cache, if any.
    pub fn cached(&self) -> Option<u32> {
        self.cache.get().copied()
    }
}
