//! End-to-end build flow tests.
//!
//! These run the real `mx` binary against throwaway projects, with a shell
//! script standing in for the compiler (see `common::STUB_CC`), and assert
//! on the stub's invocation log: which sources were compiled, how many link
//! steps ran, and how many compile processes overlapped.

#![cfg(unix)]

mod common;

use common::{TestProject, max_concurrency, stderr_of, stdout_of};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;

const MAIN_C: &str = "int main(void) { return 0; }\n";
const UNIT_C: &str = "int unit(void) { return 1; }\n";

fn scenario_project() -> TestProject {
    let p = TestProject::new();
    p.write("src/main.c", MAIN_C);
    p.write("src/alpha.c", UNIT_C);
    p.write("src/util.c", UNIT_C);
    p.write("src/core/shared.c", UNIT_C);
    p
}

#[test]
fn test_first_build_compiles_everything_and_links() {
    let p = scenario_project();

    let out = p.mx(&["build", "debug", "-j", "2"]);
    assert!(out.status.success(), "stderr: {}", stderr_of(&out));

    // 3 app sources + 1 shared core source
    assert_eq!(p.compile_count(), 4);
    assert_eq!(p.link_count(), 1);
    common::assert_path_exists(&p, "build/app/debug/bin/app");
    common::assert_path_exists(&p, "build/_core/debug/obj");
}

#[test]
fn test_second_build_is_idempotent() {
    let p = scenario_project();

    assert!(p.mx(&["build", "debug", "-j", "2"]).status.success());
    let compiles_after_first = p.compile_count();
    let links_after_first = p.link_count();

    let out = p.mx(&["build", "debug", "-j", "2"]);
    assert!(out.status.success());
    assert!(stdout_of(&out).contains("Up to date"));

    assert_eq!(p.compile_count(), compiles_after_first);
    assert_eq!(p.link_count(), links_after_first);
}

#[test]
fn test_touched_recorded_header_recompiles_exactly_one_object() {
    let p = scenario_project();
    assert!(p.mx(&["build", "debug", "-j", "2"]).status.success());
    let baseline_compiles = p.compile_count();
    let baseline_links = p.link_count();

    // Record a header dependency for src/util.c only, then advance the
    // header's mtime past every object.
    p.write("src/util.h", "int unit(void);\n");
    let record = common::dep_record_path(&p, "app", "src/util.c");
    let mut f = OpenOptions::new().append(true).open(&record).unwrap();
    writeln!(f, "src/util.h").unwrap();
    drop(f);
    p.touch_future("src/util.h", Duration::from_secs(5));

    let out = p.mx(&["build", "debug", "-j", "2"]);
    assert!(out.status.success(), "stderr: {}", stderr_of(&out));

    assert_eq!(p.compile_count(), baseline_compiles + 1);
    let compiles = p.log_lines("compile ");
    assert!(compiles.last().unwrap().ends_with("src/util.c"));
    // the fresh object forces a relink of the target that includes it
    assert_eq!(p.link_count(), baseline_links + 1);
}

#[test]
fn test_deleted_record_recompiles_exactly_one_object() {
    let p = scenario_project();
    assert!(p.mx(&["build", "debug"]).status.success());
    let baseline = p.compile_count();

    fs::remove_file(common::dep_record_path(&p, "app", "src/alpha.c")).unwrap();

    let out = p.mx(&["build", "debug"]);
    assert!(out.status.success());
    assert_eq!(p.compile_count(), baseline + 1);
    assert!(p.log_lines("compile ").last().unwrap().ends_with("src/alpha.c"));
}

#[test]
fn test_rebuild_flag_forces_everything() {
    let p = scenario_project();
    assert!(p.mx(&["build", "debug", "-j", "2"]).status.success());
    let baseline_compiles = p.compile_count();

    let out = p.mx(&["build", "debug", "-j", "2", "--rebuild"]);
    assert!(out.status.success());
    assert_eq!(p.compile_count(), baseline_compiles * 2);
    assert_eq!(p.link_count(), 2);
}

#[test]
fn test_failing_compile_fails_fast() {
    let p = TestProject::new();
    // sorted scan order puts the failing unit first
    p.write("src/a_bad.c", UNIT_C);
    p.write("src/main.c", MAIN_C);
    p.write("src/zeta.c", UNIT_C);

    let out = p.mx(&["build", "debug", "-j", "1", "--no-core"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("Build failed"));

    // with one job slot, no further compile may launch after the failure
    assert_eq!(p.compile_count(), 1);
    assert_eq!(p.link_count(), 0);
}

#[test]
fn test_failure_drains_already_launched_jobs() {
    let p = TestProject::new();
    p.write("src/main.c", MAIN_C);
    p.write("src/n_bad.c", UNIT_C);
    p.write("src/alpha.c", UNIT_C);
    p.write("src/beta.c", UNIT_C);
    p.write("src/zeta.c", UNIT_C);

    let out = p.mx(&["build", "debug", "-j", "2", "--no-core"]);
    assert_eq!(out.status.code(), Some(1));

    // every compile that started also finished (stub logs `done` on
    // success); the failing one exits early and logs only `compile`.
    let started = p.compile_count();
    let finished = p.log_lines("done ").len();
    assert_eq!(started, finished + 1);
    assert_eq!(p.link_count(), 0);
}

#[test]
fn test_bounded_concurrency_never_exceeds_jobs() {
    let p = TestProject::new();
    p.write("src/main.c", MAIN_C);
    for name in ["one", "two", "three", "four", "five"] {
        p.write(&format!("src/{name}.c"), UNIT_C);
    }

    let out = p.mx(&["build", "debug", "-j", "2", "--no-core"]);
    assert!(out.status.success(), "stderr: {}", stderr_of(&out));

    assert_eq!(p.compile_count(), 6);
    assert_eq!(p.link_count(), 1);
    let peak = max_concurrency(&p);
    assert!(peak <= 2, "ran {peak} compiles concurrently with -j 2");
    assert_eq!(peak, 2, "pool never filled with 6 stale sources");
}

#[test]
fn test_serial_build_runs_one_at_a_time() {
    let p = TestProject::new();
    p.write("src/main.c", MAIN_C);
    p.write("src/alpha.c", UNIT_C);
    p.write("src/beta.c", UNIT_C);

    assert!(p.mx(&["build", "debug", "--no-core"]).status.success());
    assert_eq!(max_concurrency(&p), 1);
}

#[test]
fn test_shared_core_built_once_and_linked_into_tools() {
    let p = TestProject::new();
    p.write("src/main.c", MAIN_C);
    p.write("src/core/shared.c", UNIT_C);
    p.write("tools/gen/gen.c", MAIN_C);
    // the tool opts into the shared core; app keeps its built-in override
    p.write(
        "mallet.toml",
        "[target.\"tool:gen\"]\ncore = true\nincludes = \"src\"\n",
    );

    let out = p.mx(&["build", "debug", "--target", "tool:gen"]);
    assert!(out.status.success(), "stderr: {}", stderr_of(&out));

    // 1 tool source + 1 core source, linked together
    assert_eq!(p.compile_count(), 2);
    assert_eq!(p.link_count(), 1);
    common::assert_path_exists(&p, "build/tool_gen/debug/bin/gen");
    common::assert_path_exists(&p, "build/_core/debug/obj");
}

#[test]
fn test_no_core_flag_skips_shared_unit() {
    let p = scenario_project();

    let out = p.mx(&["build", "debug", "--no-core"]);
    assert!(out.status.success());
    // only the 3 app sources; core/ is skipped by the scan and not built
    assert_eq!(p.compile_count(), 3);
}

#[test]
fn test_missing_target_exits_with_usage_status() {
    let p = scenario_project();
    let out = p.mx(&["build", "debug", "--target", "tool:absent"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_of(&out).contains("unknown or disabled target"));
}

#[test]
fn test_empty_source_dir_is_an_error() {
    let p = TestProject::new();
    p.mkdir("src");
    let out = p.mx(&["build", "debug"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("no sources"));
}

#[test]
fn test_compile_commands_json_is_written() {
    let p = scenario_project();
    assert!(p.mx(&["build", "debug"]).status.success());

    let content = fs::read_to_string(p.root.join("compile_commands.json")).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&content).unwrap();
    let files: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["file"].as_str())
        .collect();
    assert!(files.contains(&"src/main.c"));
    assert!(files.contains(&"src/core/shared.c"));
}
