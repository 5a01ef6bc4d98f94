//! # mallet - Minimal C Build Driver
//!
//! mallet (binary: `mx`) builds a tree of C sources with nothing but a C
//! compiler on the PATH: no make, no cmake, no ninja.
//!
//! ## Features
//!
//! - **Incremental Builds**: compiler-emitted dependency records decide
//!   exactly which objects a header edit invalidates
//! - **Parallel Compilation**: `-j N` bounds a pool of external compiler
//!   processes
//! - **Target Discovery**: the app plus one target per `tools/<name>/`
//! - **Shared Core**: `src/core/` compiled once per profile and statically
//!   linked into any target that asks for it
//! - **Layered Configuration**: built-in defaults, a compile-time
//!   `malletfile.c`, a runtime `mallet.toml`, and CLI flags
//!
//! ## Quick Start
//!
//! ```bash
//! # Scaffold a project
//! mx init
//!
//! # Build and run
//! mx run debug -j 8 -- --hello world
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Compilation scheduler, staleness-gated, bounded concurrency
//! - [`config`] - Configuration layering (`mallet.toml` and friends)
//! - [`registry`] - Target discovery and the frozen target registry
//! - [`depfile`] / [`stale`] - Incremental-build decision engine
//! - [`process`] - Argv-vector process launching (no shell re-parsing)

/// Compilation scheduling and the build/test/clean/watch commands.
pub mod build;

/// CLI command handlers kept out of main.
pub mod commands;

/// Configuration layering (`mallet.toml`, overrides, the frozen context).
pub mod config;

/// Dependency record (`.d` file) parsing.
pub mod depfile;

/// Synthesis of the compile-time `malletfile.c` layer.
pub mod malletfile;

/// External process execution from typed argument vectors.
pub mod process;

/// Target discovery and registry.
pub mod registry;

/// Recursive source scanning.
pub mod scan;

/// Staleness decisions for objects and link outputs.
pub mod stale;

/// Terminal UI utilities (tables).
pub mod ui;
