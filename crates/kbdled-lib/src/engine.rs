//! Reconciliation and toggle engine: one authoritative state per invocation.
//!
//! The engine owns the brightness state and the color region set for a single
//! run. [`Engine::run`] applies a [`Request`] in a fixed order: restore,
//! colors, absolute brightness, increment, cache sync, toggle, color cache
//! write-back. A failed step aborts the rest; device writes that already
//! happened are not rolled back.

use serde::Serialize;

use crate::attr::AttributeStore;
use crate::brightness::{BrightnessSnapshot, BrightnessState};
use crate::color::Rgb;
use crate::config::Settings;
use crate::error::Result;
use crate::regions::{ColorRegionSet, Palette, Region};

/// Mutations requested for one run, already validated by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Replay cached colors and brightness before anything else.
    pub restore: bool,
    /// Color for every region, applied before per-region colors.
    pub all: Option<Rgb>,
    /// Per-region colors, indexed in [`Region::ALL`] order.
    pub colors: [Option<Rgb>; 4],
    /// Absolute brightness (clamped).
    pub brightness: Option<i64>,
    /// Relative brightness change (clamped).
    pub increment: Option<i64>,
    /// Switch the backlight off, or back on.
    pub toggle: bool,
}

impl Request {
    pub fn with_color(mut self, region: Region, color: Rgb) -> Self {
        self.colors[region as usize] = Some(color);
        self
    }

    fn has_colors(&self) -> bool {
        self.all.is_some() || self.colors.iter().any(Option::is_some)
    }
}

/// Final state after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub brightness: BrightnessSnapshot,
    pub colors: Palette,
    pub color_cache_written: bool,
    pub brightness_cache_written: bool,
}

#[derive(Debug)]
pub struct Engine {
    brightness: BrightnessState,
    regions: ColorRegionSet,
}

impl Engine {
    /// Build the run state from the device and caches. Hardware-change
    /// reconciliation happens here.
    pub fn load(store: &impl AttributeStore, settings: &Settings) -> Result<Self> {
        let brightness = BrightnessState::init(
            store,
            &settings.device,
            &settings.caches,
            settings.min_brightness,
        )?;
        let regions = ColorRegionSet::read(store, &settings.device, &settings.caches)?;
        Ok(Engine::new(brightness, regions))
    }

    pub fn new(brightness: BrightnessState, regions: ColorRegionSet) -> Self {
        Engine {
            brightness,
            regions,
        }
    }

    /// Apply `request` and write the final state back to the caches.
    pub fn run(&mut self, store: &impl AttributeStore, request: &Request) -> Result<Outcome> {
        if request.restore {
            self.restore(store)?;
        }

        if request.has_colors() {
            if let Some(color) = request.all {
                self.regions.set_all(store, color, false)?;
            }
            for (region, color) in Region::ALL.into_iter().zip(request.colors) {
                if let Some(color) = color {
                    self.regions.set_color(store, region, color, false)?;
                }
            }
            self.regions.commit_all(store)?;
            log::info!("colors set to {}", self.regions.serialize());
        }

        if let Some(level) = request.brightness {
            self.brightness.set_value(store, level)?;
            self.brightness.sync_cache(store)?;
        }
        if let Some(delta) = request.increment {
            self.brightness.increment(store, delta)?;
            self.brightness.sync_cache(store)?;
        }
        self.brightness.sync_cache(store)?;

        if request.toggle {
            self.brightness.toggle(store)?;
        }

        let color_cache_written = self.regions.write_back(store)?;

        let outcome = Outcome {
            brightness: self.brightness.snapshot(),
            colors: *self.regions.palette(),
            color_cache_written,
            brightness_cache_written: self.brightness.cache_written(),
        };
        log::debug!(
            "brightness: level={} max_level={} hw_level={}",
            outcome.brightness.level,
            outcome.brightness.max_level,
            outcome.brightness.hw_level
        );
        Ok(outcome)
    }

    /// Replay both caches. Both are validated before any device write so a
    /// missing or corrupt cache leaves the device untouched.
    fn restore(&mut self, store: &impl AttributeStore) -> Result<()> {
        self.regions.cached_palette()?;
        self.brightness.cached_level()?;
        self.regions.restore(store)?;
        self.brightness.restore(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::DeviceLayout;
    use crate::attr::mock::MockStore;
    use crate::cache::CacheLayout;
    use crate::error::{CacheKind, KbdledError};

    fn settings() -> Settings {
        Settings {
            device: DeviceLayout::new("/dev/kbd"),
            caches: CacheLayout::new("/cache"),
            min_brightness: 0,
        }
    }

    fn device(level: u32) -> MockStore {
        let s = settings();
        let store = MockStore::new();
        store.insert(s.device.brightness(), level.to_string());
        store.insert(s.device.max_brightness(), "255");
        for region in Region::ALL {
            store.insert(s.device.color(region), "000000");
        }
        store
    }

    #[test]
    fn empty_request_seeds_caches() {
        let store = device(100);
        let s = settings();
        let mut engine = Engine::load(&store, &s).unwrap();
        let out = engine.run(&store, &Request::default()).unwrap();
        assert_eq!(out.brightness.level, 100);
        assert!(out.color_cache_written);
        assert_eq!(
            store.text(&s.caches.path(CacheKind::Colors)).unwrap(),
            "000000000000000000000000"
        );
        assert_eq!(
            store.text(&s.caches.path(CacheKind::Brightness)).unwrap(),
            "100"
        );
        // Device attributes untouched
        assert!(!store.wrote_under(s.device.dir()));
    }

    #[test]
    fn colors_are_committed_together() {
        let store = device(100);
        let s = settings();
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request::default()
            .with_color(Region::Left, Rgb::new(0xFF, 0, 0))
            .with_color(Region::Extra, Rgb::WHITE);
        let out = engine.run(&store, &request).unwrap();
        assert_eq!(out.colors.serialize(), "FF0000000000000000FFFFFF");
        for region in Region::ALL {
            assert_eq!(store.write_count(&s.device.color(region)), 1);
        }
    }

    #[test]
    fn per_region_color_overrides_all() {
        let store = device(100);
        let mut engine = Engine::load(&store, &settings()).unwrap();
        let request = Request {
            all: Some(Rgb::WHITE),
            ..Request::default()
        }
        .with_color(Region::Center, Rgb::BLACK);
        let out = engine.run(&store, &request).unwrap();
        assert_eq!(out.colors.serialize(), "FFFFFF000000FFFFFFFFFFFF");
    }

    #[test]
    fn restore_without_caches_touches_nothing() {
        let store = device(100);
        let s = settings();
        // Level 0 and no hw attribute: nothing gets seeded either
        store.insert(s.device.brightness(), "0");
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request {
            restore: true,
            ..Request::default()
        };
        let err = engine.run(&store, &request).unwrap_err();
        assert!(matches!(err, KbdledError::MissingCache(CacheKind::Colors)));
        assert!(store.writes.borrow().is_empty());
    }

    #[test]
    fn restore_with_color_cache_but_no_brightness_cache_writes_nothing() {
        let store = device(0);
        let s = settings();
        store.insert(s.caches.path(CacheKind::Colors), "FF000000FF000000FFFFFFFF");
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request {
            restore: true,
            ..Request::default()
        };
        let err = engine.run(&store, &request).unwrap_err();
        assert!(matches!(
            err,
            KbdledError::MissingCache(CacheKind::Brightness)
        ));
        assert!(!store.wrote_under(s.device.dir()));
    }

    #[test]
    fn restore_replays_both_caches() {
        let store = device(0);
        let s = settings();
        store.insert(s.caches.path(CacheKind::Colors), "FF000000FF000000FFFFFFFF");
        store.insert(s.caches.path(CacheKind::Brightness), "90");
        store.insert(s.caches.path(CacheKind::HwBrightness), "90");
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request {
            restore: true,
            ..Request::default()
        };
        let out = engine.run(&store, &request).unwrap();
        assert_eq!(out.brightness.level, 90);
        assert_eq!(store.text(&s.device.color(Region::Right)).unwrap(), "0000FF");
        assert!(!out.color_cache_written, "palette matches the cache");
    }

    #[test]
    fn increment_then_toggle_remembers_incremented_level() {
        let store = device(100);
        let s = settings();
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request {
            increment: Some(20),
            toggle: true,
            ..Request::default()
        };
        let out = engine.run(&store, &request).unwrap();
        assert_eq!(out.brightness.level, 0);
        assert_eq!(out.brightness.hw_level, 120);
        assert_eq!(
            store.text(&s.caches.path(CacheKind::Brightness)).unwrap(),
            "120"
        );
    }

    #[test]
    fn first_run_reports_seeded_brightness_cache() {
        let store = device(100);
        let s = settings();
        let mut engine = Engine::load(&store, &s).unwrap();
        let out = engine.run(&store, &Request::default()).unwrap();
        let path = s.caches.path(CacheKind::Brightness);
        assert_eq!(store.write_count(&path), 1);
        assert!(out.brightness_cache_written);
    }

    #[test]
    fn zero_brightness_is_not_cached() {
        let store = device(100);
        let s = settings();
        store.insert(s.caches.path(CacheKind::Brightness), "100");
        store.insert(s.caches.path(CacheKind::HwBrightness), "100");
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request {
            brightness: Some(0),
            ..Request::default()
        };
        let out = engine.run(&store, &request).unwrap();
        assert_eq!(out.brightness.level, 0);
        assert!(!out.brightness_cache_written);
        assert_eq!(store.write_count(&s.caches.path(CacheKind::Brightness)), 0);
        assert_eq!(
            store.text(&s.caches.path(CacheKind::Brightness)).unwrap(),
            "100"
        );
    }

    #[test]
    fn failed_color_write_aborts_before_brightness() {
        let store = device(100);
        let s = settings();
        store.fail_writes_to(s.device.color(Region::Right));
        let mut engine = Engine::load(&store, &s).unwrap();
        let request = Request {
            all: Some(Rgb::WHITE),
            brightness: Some(10),
            ..Request::default()
        };
        let err = engine.run(&store, &request).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(store.write_count(&s.device.brightness()), 0);
        // Earlier region writes are not rolled back
        assert_eq!(store.text(&s.device.color(Region::Left)).unwrap(), "FFFFFF");
    }
}
