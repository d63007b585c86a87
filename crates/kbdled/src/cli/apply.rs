//! Default command: apply the requested changes and sync the caches.

use super::{
    Actions, ApplyOutput, Engine, FsStore, Overrides, Region, Result, ensure_cache_dir, kv,
    kv_indent, kv_width, print_json, resolve_config,
};

pub(super) fn cmd_apply(actions: &Actions, overrides: &Overrides, json: bool) -> Result<()> {
    // Reject bad colors before touching the device or the cache directory
    let request = actions.request()?;
    let settings = resolve_config(overrides).settings()?;

    ensure_cache_dir(settings.caches.dir())?;

    let store = FsStore;
    let mut engine = Engine::load(&store, &settings)?;
    let outcome = engine.run(&store, &request)?;
    log::info!(
        "brightness {}/{}, colors {}",
        outcome.brightness.level,
        outcome.brightness.max_level,
        outcome.colors.serialize()
    );

    if json {
        print_json(&ApplyOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            device_dir: settings.device.dir().display().to_string(),
            outcome,
        });
        return Ok(());
    }

    let w = kv_width(&["Brightness:", "Sticky level:"], &["center:"]);
    let b = outcome.brightness;
    kv(
        "Brightness:",
        format_args!("{} / {}", b.level, b.max_level),
        w,
    );
    kv("Sticky level:", b.hw_level, w);
    println!("Colors:");
    for region in Region::ALL {
        kv_indent(
            &format!("{region}:"),
            outcome.colors.get(region),
            w,
        );
    }
    Ok(())
}
