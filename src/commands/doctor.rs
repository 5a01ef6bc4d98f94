//! Environment and configuration diagnosis.

use crate::config::{self, ConfigContext};
use crate::process::CommandLine;
use colored::*;
use std::path::Path;

pub fn run_doctor(ctx: &ConfigContext) {
    println!("{} Checking build environment...", "🚑".red());
    println!("-------------------------------");

    println!(
        "{}: {} {}",
        "System".bold(),
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    let cc = config::resolve_compiler();
    print!("{}: {} ... ", "Compiler".bold(), cc.cyan());
    let mut probe = CommandLine::new(&cc);
    probe.arg("-v");
    match probe.run() {
        Ok(true) => println!("{}", "Found".green()),
        _ => println!(
            "{} (install it or set {})",
            "Not Found".red(),
            config::CC_ENV
        ),
    }

    println!(
        "{}: src={} include={} tests={} tools={} core={}",
        "Dirs".bold(),
        config::SRC_DIR,
        config::INCLUDE_DIR,
        config::TESTS_DIR,
        config::TOOLS_DIR,
        config::CORE_DIR
    );

    if ctx.no_config() {
        println!("{}: disabled (legacy mode)", "Config".bold());
    } else if let Some(path) = ctx.config_path() {
        println!("{}: {}", "Config".bold(), path.display());
    } else {
        println!("{}: none", "Config".bold());
    }
    if Path::new(config::PROJECT_FILE).exists() {
        println!(
            "{}: {} (synthesized into {}/_malletfile)",
            "Extension".bold(),
            config::PROJECT_FILE,
            config::BUILD_DIR
        );
    }

    println!("{}: {}", "Default target".bold(), ctx.default_target());
    println!(
        "{}: {}",
        "Auto tool discovery".bold(),
        if ctx.disable_auto_tools() {
            "disabled".yellow().to_string()
        } else {
            "enabled".green().to_string()
        }
    );
}
