//! Build artifact cleanup.
//!
//! `mx clean` empties the build directory but keeps it; `mx clobber`
//! removes the directory itself.

use crate::config;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

pub fn clean() -> Result<()> {
    let build_dir = Path::new(config::BUILD_DIR);
    if !build_dir.exists() {
        println!("{} Nothing to clean", "!".yellow());
        return Ok(());
    }

    for entry in fs::read_dir(build_dir).context("failed to read build directory")? {
        let entry = entry.context("failed to read build directory entry")?;
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }
    println!("{} Clean complete.", "✓".green());
    Ok(())
}

pub fn clobber() -> Result<()> {
    let build_dir = Path::new(config::BUILD_DIR);
    if !build_dir.exists() {
        println!("{} Nothing to clobber", "!".yellow());
        return Ok(());
    }
    fs::remove_dir_all(build_dir).context("failed to remove build directory")?;
    println!("{} Removed {}/", "✓".green(), config::BUILD_DIR);
    Ok(())
}
