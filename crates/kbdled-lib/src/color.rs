//! RGB colors in the keyboard's `RRGGBB` text format.

use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::error::{KbdledError, Result};

/// Number of text characters in one encoded color.
pub const HEX_LEN: usize = 6;

/// One 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Decode exactly six hex digits (either case, no prefix, no sign).
    /// `path` names the attribute or cache the text came from.
    pub fn from_hex(s: &str, path: &Path) -> Result<Self> {
        if s.len() != HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KbdledError::decode(
                path,
                format!("expected {HEX_LEN} hex digits, got {s:?}"),
            ));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| KbdledError::decode(path, format!("bad channel in {s:?}: {e}")))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a user-supplied color.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`, `"off"`/`"black"`
pub fn parse_color(s: &str) -> Result<Rgb> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(Rgb::new(0xFF, 0x00, 0x00)),
        "green" => return Ok(Rgb::new(0x00, 0xFF, 0x00)),
        "blue" => return Ok(Rgb::new(0x00, 0x00, 0xFF)),
        "white" => return Ok(Rgb::WHITE),
        "orange" => return Ok(Rgb::new(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(Rgb::new(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(Rgb::new(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(Rgb::new(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(Rgb::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    Rgb::from_hex(hex, Path::new("<argument>")).map_err(|_| {
        KbdledError::Config(format!(
            "Invalid color: {s} (use RRGGBB, #RRGGBB or a color name)"
        ))
    })
}
