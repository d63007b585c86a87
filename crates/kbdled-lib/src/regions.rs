//! Color region set: the four independently colorable keyboard zones.
//!
//! The palette is cached as four 6-digit hex blocks in region order
//! (left, center, right, extra). The cache is validated as a whole: a blob of
//! the wrong length or with any bad block is rejected and never partially
//! applied.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::attr::{AttributeStore, DeviceLayout};
use crate::cache::{CacheCodec, CacheEntry, CacheLayout};
use crate::color::{HEX_LEN, Rgb};
use crate::error::{CacheKind, KbdledError, Result};

/// One keyboard color zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Left,
    Center,
    Right,
    Extra,
}

impl Region {
    /// All regions in cache order.
    pub const ALL: [Region; 4] = [Region::Left, Region::Center, Region::Right, Region::Extra];

    pub fn name(self) -> &'static str {
        match self {
            Region::Left => "left",
            Region::Center => "center",
            Region::Right => "right",
            Region::Extra => "extra",
        }
    }

    /// Device attribute file name.
    pub fn attribute(self) -> &'static str {
        match self {
            Region::Left => "color_left",
            Region::Center => "color_center",
            Region::Right => "color_right",
            Region::Extra => "color_extra",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Colors of all four regions, in cache order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Palette(pub [Rgb; 4]);

impl Palette {
    /// Length of a serialized palette in characters.
    pub const SERIALIZED_LEN: usize = HEX_LEN * 4;

    pub fn get(&self, region: Region) -> Rgb {
        self.0[region.index()]
    }

    pub fn set(&mut self, region: Region, color: Rgb) {
        self.0[region.index()] = color;
    }

    /// Concatenated hex blocks, left to extra.
    pub fn serialize(&self) -> String {
        self.0.iter().map(Rgb::to_string).collect()
    }

    /// Parse a serialized palette. `path` is the cache file, for error context.
    pub fn deserialize(blob: &str, path: &Path) -> Result<Self> {
        if blob.len() != Self::SERIALIZED_LEN {
            return Err(KbdledError::corrupt(
                path,
                format!(
                    "expected {} characters, found {}",
                    Self::SERIALIZED_LEN,
                    blob.len()
                ),
            ));
        }
        let mut colors = [Rgb::BLACK; 4];
        for (i, slot) in colors.iter_mut().enumerate() {
            let block = blob
                .get(i * HEX_LEN..(i + 1) * HEX_LEN)
                .ok_or_else(|| KbdledError::corrupt(path, "cache is not ASCII"))?;
            *slot = Rgb::from_hex(block, path).map_err(|_| {
                KbdledError::corrupt(
                    path,
                    format!("{} block {block:?} is not a hex color", Region::ALL[i]),
                )
            })?;
        }
        Ok(Palette(colors))
    }
}

impl CacheCodec for Palette {
    const CORRUPT_IS_ABSENT: bool = false;

    fn encode(&self) -> String {
        self.serialize()
    }

    fn decode(raw: &str, path: &Path) -> Result<Self> {
        Palette::deserialize(raw, path)
    }
}

/// Live region colors plus the persisted palette.
#[derive(Debug)]
pub struct ColorRegionSet {
    palette: Palette,
    paths: [PathBuf; 4],
    cache: CacheEntry<Palette>,
}

impl ColorRegionSet {
    /// Read every region from the device and load the color cache.
    pub fn read(
        store: &impl AttributeStore,
        device: &DeviceLayout,
        caches: &CacheLayout,
    ) -> Result<Self> {
        let paths = Region::ALL.map(|r| device.color(r));
        let mut palette = Palette::default();
        for region in Region::ALL {
            palette.set(region, read_color(store, &paths[region.index()])?);
        }
        let cache = CacheEntry::load(store, caches.path(CacheKind::Colors))?;
        Ok(ColorRegionSet {
            palette,
            paths,
            cache,
        })
    }

    /// Re-read one region from its device attribute.
    pub fn read_region(&mut self, store: &impl AttributeStore, region: Region) -> Result<Rgb> {
        let color = read_color(store, &self.paths[region.index()])?;
        self.palette.set(region, color);
        Ok(color)
    }

    pub fn color(&self, region: Region) -> Rgb {
        self.palette.get(region)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn cache(&self) -> &CacheEntry<Palette> {
        &self.cache
    }

    /// Update one region in memory, writing it to the device if `commit`.
    pub fn set_color(
        &mut self,
        store: &impl AttributeStore,
        region: Region,
        color: Rgb,
        commit: bool,
    ) -> Result<()> {
        self.palette.set(region, color);
        if commit {
            self.commit(store, region)?;
        }
        Ok(())
    }

    /// Set every region to one color.
    pub fn set_all(&mut self, store: &impl AttributeStore, color: Rgb, commit: bool) -> Result<()> {
        for region in Region::ALL {
            self.set_color(store, region, color, commit)?;
        }
        Ok(())
    }

    fn commit(&self, store: &impl AttributeStore, region: Region) -> Result<()> {
        let color = self.palette.get(region);
        store.write(&self.paths[region.index()], color.to_string().as_bytes())?;
        log::debug!("{region} <- {color}");
        Ok(())
    }

    /// Write every region's current color to its device attribute.
    pub fn commit_all(&self, store: &impl AttributeStore) -> Result<()> {
        for region in Region::ALL {
            self.commit(store, region)?;
        }
        Ok(())
    }

    /// Serialized form of the current palette.
    pub fn serialize(&self) -> String {
        self.palette.serialize()
    }

    /// Replace the in-memory palette from a serialized blob. Nothing is applied
    /// unless the whole blob is valid.
    pub fn deserialize(&mut self, blob: &str) -> Result<()> {
        self.palette = Palette::deserialize(blob, self.cache.path())?;
        Ok(())
    }

    /// Check that a restore is possible without touching anything.
    pub fn cached_palette(&self) -> Result<Palette> {
        self.cache.require(CacheKind::Colors).copied()
    }

    /// Apply the cached palette to every region.
    pub fn restore(&mut self, store: &impl AttributeStore) -> Result<()> {
        self.palette = self.cached_palette()?;
        self.commit_all(store)?;
        log::info!("restored colors {}", self.palette.serialize());
        Ok(())
    }

    /// Persist the palette if it differs from the cache. Returns whether it wrote.
    pub fn write_back(&mut self, store: &impl AttributeStore) -> Result<bool> {
        if self.cache.get() == Some(&self.palette) {
            return Ok(false);
        }
        self.cache.set(store, self.palette)?;
        Ok(true)
    }
}

/// Read the first six bytes of a color attribute as a hex color.
fn read_color(store: &impl AttributeStore, path: &Path) -> Result<Rgb> {
    let raw = store.read_nonempty(path)?;
    let head = raw.get(..HEX_LEN).unwrap_or(&raw);
    let text = std::str::from_utf8(head)
        .map_err(|_| KbdledError::decode(path, "color attribute is not text"))?;
    Rgb::from_hex(text, path)
}
