//! Project scaffolding.
//!
//! `mx init` ensures the conventional layout exists and drops in a starter
//! main and smoke test. Existing files are never overwritten.

use crate::config;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

const MAIN_C: &str = r#"#include <stdio.h>

int main(int argc, char **argv) {
  (void)argc; (void)argv;
  puts("Hello from mallet!");
  return 0;
}
"#;

const SMOKE_TEST_C: &str = r#"#include <stdio.h>

int main(void) {
  puts("smoke_test: ok");
  return 0;
}
"#;

pub fn init_project() -> Result<()> {
    for dir in [
        config::SRC_DIR,
        config::INCLUDE_DIR,
        config::TESTS_DIR,
        config::TOOLS_DIR,
        config::BUILD_DIR,
        config::CORE_DIR,
        config::APP_DIR,
    ] {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {dir}"))?;
    }

    if !Path::new("src/main.c").exists() && !Path::new("src/app/main.c").exists() {
        fs::write("src/main.c", MAIN_C).context("cannot create src/main.c")?;
    }

    if !Path::new("tests/smoke_test.c").exists() {
        fs::write("tests/smoke_test.c", SMOKE_TEST_C)
            .context("cannot create tests/smoke_test.c")?;
    }

    println!(
        "{} Initialized project layout (src/include/tests/tools/build)",
        "✓".green()
    );
    println!("  Run {} to build.", "mx build".bold().white());
    Ok(())
}
