//! `config` subcommand: show resolved configuration and cache file status.

use super::{
    CacheFileJson, CacheKind, CacheLayout, Config, ConfigOutput, Overrides, Result, kv, kv_indent,
    kv_width, print_json, resolve_config,
};

const CACHES: [CacheKind; 3] = [
    CacheKind::Brightness,
    CacheKind::HwBrightness,
    CacheKind::Colors,
];

pub(super) fn cmd_config(json: bool, overrides: &Overrides) -> Result<()> {
    let config = resolve_config(overrides);
    let config_path = overrides.config.clone().or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    if let Err(errors) = config.validate() {
        for e in &errors {
            log::warn!("invalid config: {e}");
        }
    }

    let layout = CacheLayout::new(&config.cache_dir);
    let caches: Vec<CacheFileJson> = CACHES
        .into_iter()
        .map(|kind| {
            let path = layout.path(kind);
            CacheFileJson {
                name: kind.file_name(),
                exists: path.exists(),
                path: path.display().to_string(),
            }
        })
        .collect();

    if json {
        print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            caches,
        });
        return Ok(());
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "device_dir:",
            "cache_dir:",
            "min_brightness:",
            "hw_brightness:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("device_dir:", &config.device_dir, w);
    kv_indent("cache_dir:", &config.cache_dir, w);
    kv_indent("min_brightness:", config.min_brightness, w);
    println!();

    println!("Caches:");
    for cache in &caches {
        let status = if cache.exists { "present" } else { "not found" };
        kv_indent(
            &format!("{}:", cache.name),
            format_args!("{} ({status})", cache.path),
            w,
        );
    }
    Ok(())
}
