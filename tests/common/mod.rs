//! Shared helpers for integration tests.
//!
//! Tests drive the real `mx` binary inside a throwaway project directory,
//! with a shell-script compiler stand-in selected through `MALLET_CC` so no
//! real toolchain is needed. The stub logs every invocation to `cc.log`
//! next to itself, which is what the assertions read.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{Duration, SystemTime};

pub const STUB_CC: &str = r#"#!/bin/sh
# compiler stand-in for mallet integration tests
log="$(dirname "$0")/cc.log"
obj=""; dep=""; src=""; mode=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) obj="$2"; shift 2 ;;
    -MF) dep="$2"; shift 2 ;;
    -I) shift 2 ;;
    -c) mode="compile"; shift ;;
    -*) shift ;;
    *.c) src="$1"; shift ;;
    *) shift ;;
  esac
done
if [ "$mode" = "compile" ]; then
  echo "compile $src" >> "$log"
  case "$src" in
    *_bad.c) exit 1 ;;
  esac
  sleep 0.2
  : > "$obj"
  if [ -n "$dep" ]; then
    printf '%s: %s\n' "$obj" "$src" > "$dep"
  fi
  echo "done $src" >> "$log"
else
  echo "link $obj" >> "$log"
  : > "$obj"
fi
exit 0
"#;

pub struct TestProject {
    _tmp: tempfile::TempDir,
    pub root: PathBuf,
    pub stub_cc: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp project");
        let root = tmp.path().to_path_buf();

        let stub_cc = root.join("stubcc");
        fs::write(&stub_cc, STUB_CC).expect("write stub compiler");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&stub_cc, fs::Permissions::from_mode(0o755))
                .expect("make stub executable");
        }

        Self {
            _tmp: tmp,
            root,
            stub_cc,
        }
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content).expect("write project file");
        path
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.root.join(rel)).expect("create dir");
    }

    /// Run `mx` in the project with the stub compiler.
    pub fn mx(&self, args: &[&str]) -> Output {
        self.mx_with_cc(args, &self.stub_cc.to_string_lossy())
    }

    pub fn mx_with_cc(&self, args: &[&str], cc: &str) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mx"))
            .args(args)
            .current_dir(&self.root)
            .env("MALLET_CC", cc)
            .output()
            .expect("run mx")
    }

    /// Lines of the stub's invocation log starting with `prefix`.
    pub fn log_lines(&self, prefix: &str) -> Vec<String> {
        let log = self.root.join("cc.log");
        let content = fs::read_to_string(&log).unwrap_or_default();
        content
            .lines()
            .filter(|l| l.starts_with(prefix))
            .map(|l| l.to_string())
            .collect()
    }

    pub fn compile_count(&self) -> usize {
        self.log_lines("compile ").len()
    }

    pub fn link_count(&self) -> usize {
        self.log_lines("link ").len()
    }

    /// Push a file's modification time into the future so it is strictly
    /// newer than everything built so far, without sleeping.
    pub fn touch_future(&self, rel: &str, ahead: Duration) {
        let path = self.root.join(rel);
        let f = fs::File::options()
            .write(true)
            .open(&path)
            .expect("open for touch");
        f.set_modified(SystemTime::now() + ahead)
            .expect("set mtime");
    }
}

pub fn stdout_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// A real C compiler for tests that need one (malletfile synthesis). Tests
/// skip when none is installed, mirroring the binary-missing guard used for
/// `mx` itself.
pub fn real_cc() -> Option<&'static str> {
    for cc in ["cc", "gcc", "clang", "tcc"] {
        let found = Command::new(cc)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if found {
            return Some(cc);
        }
    }
    None
}

/// Maximum nesting depth of compile start/done pairs in the log, i.e. the
/// peak number of concurrently running compile processes.
pub fn max_concurrency(project: &TestProject) -> usize {
    let log = fs::read_to_string(project.root.join("cc.log")).unwrap_or_default();
    let mut depth = 0usize;
    let mut max = 0usize;
    for line in log.lines() {
        if line.starts_with("compile ") {
            depth += 1;
            max = max.max(depth);
        } else if line.starts_with("done ") {
            depth = depth.saturating_sub(1);
        }
    }
    max
}

pub fn assert_path_exists(project: &TestProject, rel: &str) {
    assert!(
        project.root.join(rel).exists(),
        "expected {} to exist",
        rel
    );
}
pub fn dep_record_path(project: &TestProject, target_id: &str, source: &str) -> PathBuf {
    let id: String = source
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ':' => '_',
            _ => c,
        })
        .collect();
    project
        .root
        .join("build")
        .join(target_id)
        .join("debug")
        .join("dep")
        .join(format!("{id}.d"))
}
