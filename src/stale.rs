//! Staleness decisions for objects and link outputs.
//!
//! All decisions reduce to modification-time comparisons plus the dependency
//! record. I/O failures while checking (unreadable metadata, unreadable
//! record) degrade to "rebuild": a wasted compile is recoverable, a stale
//! binary is not.

use crate::depfile;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True if any prerequisite in the record is missing or newer than the
/// object. A missing or unreadable record also returns true: it may describe
/// headers we can no longer see, so assuming "no dependencies" is unsound.
fn record_is_stale(obj_mtime: SystemTime, record: &Path) -> bool {
    let prereqs = match depfile::parse(record) {
        Ok(p) => p,
        Err(_) => return true,
    };
    for prereq in &prereqs {
        match mtime(Path::new(prereq)) {
            Some(t) if t <= obj_mtime => {}
            _ => return true,
        }
    }
    false
}

/// Decide whether `source` must be recompiled into `object`.
///
/// Checks short-circuit in order: force, object missing, source newer than
/// object, then the dependency record. The record check comes last purely to
/// avoid reading it when a cheaper test already answered; it is what catches
/// header edits, which never touch the source file's own timestamp.
pub fn needs_compile(object: &Path, source: &Path, record: &Path, force: bool) -> bool {
    if force {
        return true;
    }
    let obj_t = match mtime(object) {
        Some(t) => t,
        None => return true,
    };
    match mtime(source) {
        Some(src_t) if src_t <= obj_t => {}
        _ => return true,
    }
    record_is_stale(obj_t, record)
}

/// Decide whether `binary` must be relinked from `objects`.
pub fn needs_link(binary: &Path, objects: &[PathBuf], force: bool) -> bool {
    if force || !binary.exists() {
        return true;
    }
    let bin_t = match mtime(binary) {
        Some(t) => t,
        None => return true,
    };
    objects.iter().any(|obj| match mtime(obj) {
        Some(t) => t > bin_t,
        None => true,
    })
}
