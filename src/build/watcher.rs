//! Rebuild on change.
//!
//! `mx watch` polls the source tree and rebuilds the default target when
//! something under `src/` or `tools/` moves. Configuration is reloaded on
//! every cycle so edits to `mallet.toml` take effect without restarting.

use super::{BuildOptions, BuildSession};
use crate::config::{ConfigContext, LoadOptions};
use anyhow::Result;
use colored::*;
use notify::{Config, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Duration;

pub fn watch(load: LoadOptions, opts: BuildOptions) -> Result<()> {
    println!("{} Watching for changes in src/...", "👀".cyan());

    let (tx, rx) = channel();
    let notify_config = Config::default().with_poll_interval(Duration::from_secs(1));
    let mut watcher = notify::RecommendedWatcher::new(tx, notify_config)?;

    watcher.watch(Path::new(crate::config::SRC_DIR), RecursiveMode::Recursive)?;
    if Path::new(crate::config::TOOLS_DIR).exists() {
        watcher.watch(Path::new(crate::config::TOOLS_DIR), RecursiveMode::Recursive)?;
    }

    rebuild_and_clear(&load, &opts);

    while rx.recv().is_ok() {
        // debounce burst events
        std::thread::sleep(Duration::from_millis(100));
        while rx.try_recv().is_ok() {}
        rebuild_and_clear(&load, &opts);
    }
    Ok(())
}

fn rebuild_and_clear(load: &LoadOptions, opts: &BuildOptions) {
    print!("\x1B[2J\x1B[1;1H");
    println!("{} File changed. Rebuilding...", "🔄".yellow());

    if let Err(e) = rebuild_default(load, opts) {
        println!("{} Error: {e:#}", "x".red());
    }
}

fn rebuild_default(load: &LoadOptions, opts: &BuildOptions) -> Result<()> {
    let ctx = ConfigContext::load(load, None)?;
    let registry = ctx.freeze()?;
    let name = ctx.default_target().to_string();
    let target = registry
        .find(&name)
        .ok_or_else(|| anyhow::anyhow!("unknown or disabled target: {name}"))?
        .clone();

    let cc = crate::config::resolve_compiler();
    BuildSession::new(&ctx, cc, opts.clone()).build_target(&target)
}
