//! CLI layer: flag parsing, settings resolution, human and JSON output.

mod apply;
mod config_cmd;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use kbdled_lib::attr::FsStore;
pub(super) use kbdled_lib::cache::{CacheLayout, ensure_cache_dir};
pub(super) use kbdled_lib::color::parse_color;
pub(super) use kbdled_lib::config::Config;
pub(super) use kbdled_lib::engine::{Engine, Outcome, Request};
pub(super) use kbdled_lib::error::{CacheKind, Result};
pub(super) use kbdled_lib::regions::Region;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w.saturating_sub(2));
}

/// Pretty-print `value` as JSON on stdout.
pub(super) fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => log::error!("JSON serialization failed: {e}"),
    }
}

// ── Arguments ──

/// Settings overrides, applied on top of the config file.
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// Config file path (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// LED device directory
    #[arg(long, global = true, value_name = "DIR")]
    pub device_dir: Option<String>,

    /// Cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<String>,

    /// Lower bound for -b and -i
    #[arg(long, global = true, value_name = "LEVEL")]
    pub min_brightness: Option<u32>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.device_dir {
            config.device_dir = dir.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(min) = self.min_brightness {
            config.min_brightness = min;
        }
    }
}

/// State changes requested on the command line.
#[derive(clap::Args, Debug, Default)]
pub struct Actions {
    /// Toggle the backlight off, or back on to the remembered level
    #[arg(short, long)]
    pub toggle: bool,

    /// Restore cached colors and brightness
    #[arg(short = 'x', long)]
    pub restore: bool,

    /// Left region color (RRGGBB, #RRGGBB or a name)
    #[arg(short, long, value_name = "COLOR")]
    pub left: Option<String>,

    /// Center region color
    #[arg(short, long, value_name = "COLOR")]
    pub center: Option<String>,

    /// Right region color
    #[arg(short, long, value_name = "COLOR")]
    pub right: Option<String>,

    /// Extra region color
    #[arg(short, long, value_name = "COLOR")]
    pub extra: Option<String>,

    /// Color for every region (per-region flags win)
    #[arg(short, long, value_name = "COLOR")]
    pub all: Option<String>,

    /// Set brightness (clamped to the valid range)
    #[arg(short, long, value_name = "LEVEL", allow_negative_numbers = true)]
    pub brightness: Option<i64>,

    /// Change brightness by a signed amount (clamped)
    #[arg(short, long, value_name = "DELTA", allow_negative_numbers = true)]
    pub increment: Option<i64>,
}

impl Actions {
    /// Validate colors and build the engine request.
    pub(super) fn request(&self) -> Result<Request> {
        let mut request = Request {
            restore: self.restore,
            all: self.all.as_deref().map(parse_color).transpose()?,
            brightness: self.brightness,
            increment: self.increment,
            toggle: self.toggle,
            ..Request::default()
        };
        let flags = [&self.left, &self.center, &self.right, &self.extra];
        for (region, flag) in Region::ALL.into_iter().zip(flags) {
            if let Some(s) = flag {
                request = request.with_color(region, parse_color(s)?);
            }
        }
        Ok(request)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show current configuration and cache file status
    Config,
}

/// Load the config file, from `custom_path` when given.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    match custom_path {
        Some(path) => {
            let (config, warnings) = Config::load_from(path);
            for w in &warnings {
                log::warn!("{w}");
            }
            config
        }
        None => Config::load(),
    }
}

/// Config file plus command-line overrides.
pub(super) fn resolve_config(overrides: &Overrides) -> Config {
    let mut config = load_config(overrides.config.as_deref());
    overrides.apply(&mut config);
    config
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ApplyOutput {
    pub version: String,
    pub device_dir: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub caches: Vec<CacheFileJson>,
}

#[derive(Serialize)]
pub(super) struct CacheFileJson {
    pub name: &'static str,
    pub path: String,
    pub exists: bool,
}

pub fn run(cmd: Option<Command>, actions: &Actions, overrides: &Overrides, json: bool) -> Result<()> {
    match cmd {
        Some(Command::Config) => config_cmd::cmd_config(json, overrides),
        None => apply::cmd_apply(actions, overrides, json),
    }
}
