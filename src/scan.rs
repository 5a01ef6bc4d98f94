//! Recursive source file enumeration.
//!
//! Walks a directory tree collecting files by suffix. The tool's own output
//! root (`build`) is never descended into, and callers may name one more
//! directory to skip (used to keep the shared core subtree out of an `src/`
//! scan that would otherwise compile it twice).

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect every file under `root` whose name ends with `suffix`.
///
/// A missing or non-directory `root` yields an empty list: optional source
/// directories (no `tools/`, no `src/core/`) are a normal, silent case.
pub fn scan_sources(root: &Path, suffix: &str, skip_dir: Option<&str>) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if !e.file_type().is_dir() {
                return true;
            }
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if name == "build" {
                return false;
            }
            match skip_dir {
                Some(skip) => name != skip,
                None => true,
            }
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.into_path());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_scan_collects_by_suffix_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("a.c"));
        touch(&root.join("sub/b.c"));
        touch(&root.join("sub/deep/c.c"));
        touch(&root.join("sub/readme.md"));

        let mut found = scan_sources(root, ".c", None);
        found.sort();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|p| p.extension().unwrap() == "c"));
    }

    #[test]
    fn test_scan_skips_build_and_named_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("main.c"));
        touch(&root.join("build/stale.c"));
        touch(&root.join("core/shared.c"));

        let all = scan_sources(root, ".c", None);
        assert_eq!(all.len(), 2); // build/ pruned unconditionally

        let without_core = scan_sources(root, ".c", Some("core"));
        assert_eq!(without_core.len(), 1);
        assert!(without_core[0].ends_with("main.c"));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan_sources(&tmp.path().join("nope"), ".c", None).is_empty());

        // a plain file as root is not an error either
        let file = tmp.path().join("single.c");
        touch(&file);
        assert!(scan_sources(&file, ".c", None).is_empty());
    }

    #[test]
    fn test_scan_suffix_match_is_literal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("unit_test.c"));
        touch(&root.join("unit.c"));

        let tests = scan_sources(root, "_test.c", None);
        assert_eq!(tests.len(), 1);
        assert!(tests[0].ends_with("unit_test.c"));
    }
}
