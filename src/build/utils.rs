//! Build helpers: warning/profile flag sets, output layout, artifact naming.

use crate::config::{self, Profile};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Output area of the shared core unit, reused across targets.
pub const CORE_ID: &str = "_core";

/// Strict by default, but keep GCC attributes in system headers from
/// killing builds; `--strict` re-enables the suppressed warnings.
const WARN_FLAGS_BASE: &[&str] = &[
    "-Wall",
    "-Werror",
    "-Wwrite-strings",
    "-Wimplicit-function-declaration",
    "-Wno-unsupported",
];
const WARN_FLAGS_STRICT: &[&str] = &["-Wunsupported"];

pub fn warning_flags(strict: bool) -> Vec<String> {
    let mut flags: Vec<String> = WARN_FLAGS_BASE.iter().map(|s| s.to_string()).collect();
    if strict {
        flags.extend(WARN_FLAGS_STRICT.iter().map(|s| s.to_string()));
    }
    flags
}

pub fn profile_flags(profile: Profile) -> Vec<String> {
    let flags: &[&str] = match profile {
        Profile::Debug => &["-g", "-bt20", "-DDEBUG=1"],
        Profile::Release => &["-O2", "-DNDEBUG=1"],
    };
    flags.iter().map(|s| s.to_string()).collect()
}

/// Derive a stable, collision-free artifact id from a source path: path
/// separators, extension dots, and drive colons all become `_`, so
/// `src/net/io.c` and `src/fs/io.c` name distinct objects in one flat
/// directory.
pub fn sanitize_path_to_id(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ':' => '_',
            _ => c,
        })
        .collect()
}

/// Per-target, per-profile output partition.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    pub root: PathBuf,
    pub obj_dir: PathBuf,
    pub dep_dir: PathBuf,
    pub bin_dir: PathBuf,
}

impl BuildLayout {
    pub fn for_target(target_id: &str, profile: Profile) -> Self {
        let root = Path::new(config::BUILD_DIR)
            .join(target_id)
            .join(profile.name());
        Self {
            obj_dir: root.join("obj"),
            dep_dir: root.join("dep"),
            bin_dir: root.join("bin"),
            root,
        }
    }

    /// Create the whole partition. Unlike staleness probing, a failure here
    /// is fatal: nothing can be compiled into a directory we cannot create.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.obj_dir, &self.dep_dir, &self.bin_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("cannot create output directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Object and dependency-record paths for one source file.
    pub fn artifacts(&self, source: &Path) -> (PathBuf, PathBuf) {
        let id = sanitize_path_to_id(source);
        (
            self.obj_dir.join(format!("{id}.o")),
            self.dep_dir.join(format!("{id}.d")),
        )
    }

    pub fn exe_path(&self, bin_base: &str) -> PathBuf {
        if cfg!(windows) {
            self.bin_dir.join(format!("{bin_base}.exe"))
        } else {
            self.bin_dir.join(bin_base)
        }
    }
}
