//! kbdled: keyboard backlight brightness and color control for System76 laptops.
//!
//! Run without a subcommand to apply flags (restore, colors, brightness, toggle)
//! and sync the caches. Meant to be bound to hotkeys and boot hooks.

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "kbdled",
    version,
    about = "Keyboard backlight brightness and color control for System76 laptops"
)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    overrides: cli::Overrides,

    #[command(flatten)]
    actions: cli::Actions,

    #[command(subcommand)]
    command: Option<cli::Command>,
}

fn main() {
    let args = Args::parse();

    let default_filter = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = cli::run(args.command, &args.actions, &args.overrides, args.json) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
