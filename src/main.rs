//! # mx CLI entry point
//!
//! Thin glue over the library: parse arguments, load and freeze the
//! configuration, then hand the frozen registry to the build core.
//!
//! Exit codes: 0 success, 1 build/test failure, 2 invalid usage,
//! configuration error, or unknown target (clap's own usage errors also
//! exit 2).

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;

use mallet::build::{self, BuildOptions, BuildSession};
use mallet::commands;
use mallet::config::{self, ConfigContext, LoadOptions, Profile};

#[derive(Parser)]
#[command(name = "mx")]
#[command(about = "The minimal C build driver", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Ignore all configuration files (legacy mode)
    #[arg(long, global = true)]
    no_config: bool,

    /// Explicit configuration file instead of mallet.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable tool auto-discovery
    #[arg(long, global = true)]
    no_auto_tools: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    Debug,
    Release,
}

impl From<ProfileArg> for Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Debug => Profile::Debug,
            ProfileArg::Release => Profile::Release,
        }
    }
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Build profile
    #[arg(value_enum, default_value = "debug")]
    profile: ProfileArg,

    /// Target to build (name or id); defaults to the configured default
    #[arg(long, value_name = "NAME")]
    target: Option<String>,

    /// Echo every compiler invocation
    #[arg(short, long)]
    verbose: bool,

    /// Recompile and relink everything
    #[arg(long)]
    rebuild: bool,

    /// Maximum concurrent compiler processes
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    jobs: usize,

    /// Re-enable warnings suppressed by default
    #[arg(long)]
    strict: bool,

    /// Do not link the shared core unit
    #[arg(long)]
    no_core: bool,
}

impl BuildArgs {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            profile: self.profile.into(),
            verbose: self.verbose,
            force: self.rebuild,
            jobs: self.jobs.max(1),
            strict: self.strict,
            no_core: self.no_core,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one target
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },
    /// Compile one target and run its binary
    Run {
        #[command(flatten)]
        args: BuildArgs,
        /// Arguments passed to the target program (after --)
        #[arg(last = true)]
        run_args: Vec<String>,
    },
    /// Build and run *_test.c files under tests/
    Test {
        /// Build profile
        #[arg(value_enum, default_value = "debug")]
        profile: ProfileArg,
        /// Echo every compiler invocation
        #[arg(short, long)]
        verbose: bool,
        /// Rebuild all test binaries
        #[arg(long)]
        rebuild: bool,
        /// Re-enable warnings suppressed by default
        #[arg(long)]
        strict: bool,
    },
    /// List the frozen target registry
    List,
    /// Remove build outputs, keeping the build directory
    Clean,
    /// Remove the build directory itself
    Clobber,
    /// Diagnose environment and configuration
    Doctor,
    /// Scaffold the conventional project layout
    Init,
    /// Rebuild the default target on source changes
    Watch {
        #[command(flatten)]
        args: BuildArgs,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn main() {
    let cli = Cli::parse();
    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} Build failed: {e:#}", "x".red());
            1
        }
    };
    std::process::exit(code);
}

fn load_options(cli: &Cli) -> LoadOptions {
    LoadOptions {
        no_config: cli.no_config,
        config_path: cli.config.clone(),
        no_auto_tools: cli.no_auto_tools,
    }
}

fn dispatch(cli: &Cli) -> Result<i32> {
    // commands that never touch the configuration stack
    match &cli.command {
        Some(Commands::Init) => {
            commands::init::init_project()?;
            return Ok(0);
        }
        Some(Commands::Clean) => {
            build::clean()?;
            return Ok(0);
        }
        Some(Commands::Clobber) => {
            build::clobber()?;
            return Ok(0);
        }
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(0);
        }
        _ => {}
    }

    let load = load_options(cli);
    let ctx = match ConfigContext::load(&load, None) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{} config: {e:#}", "x".red());
            return Ok(2);
        }
    };
    let registry = match ctx.freeze() {
        Ok(reg) => reg,
        Err(e) => {
            eprintln!("{} config: {e:#}", "x".red());
            return Ok(2);
        }
    };

    let find_target = |name: &str| -> Option<mallet::registry::Target> {
        registry.find(name).cloned()
    };

    match &cli.command {
        None => {
            // bare `mx` builds the default target, debug profile
            let name = ctx.default_target().to_string();
            let Some(target) = find_target(&name) else {
                return Ok(missing_target(&name));
            };
            let cc = config::resolve_compiler();
            BuildSession::new(&ctx, cc, BuildOptions::default()).build_target(&target)?;
            Ok(0)
        }

        Some(Commands::Build { args }) => {
            let name = args
                .target
                .clone()
                .unwrap_or_else(|| ctx.default_target().to_string());
            let Some(target) = find_target(&name) else {
                return Ok(missing_target(&name));
            };
            let cc = config::resolve_compiler();
            BuildSession::new(&ctx, cc, args.options()).build_target(&target)?;
            Ok(0)
        }

        Some(Commands::Run { args, run_args }) => {
            let name = args
                .target
                .clone()
                .unwrap_or_else(|| ctx.default_target().to_string());
            let Some(target) = find_target(&name) else {
                return Ok(missing_target(&name));
            };
            let cc = config::resolve_compiler();
            let ok = BuildSession::new(&ctx, cc, args.options()).run_target(&target, run_args)?;
            Ok(if ok { 0 } else { 1 })
        }

        Some(Commands::Test {
            profile,
            verbose,
            rebuild,
            strict,
        }) => {
            let cc = config::resolve_compiler();
            let ok = build::run_tests(&cc, (*profile).into(), *verbose, *rebuild, *strict)?;
            Ok(if ok { 0 } else { 1 })
        }

        Some(Commands::List) => {
            commands::list::list_targets(&ctx, &registry);
            Ok(0)
        }

        Some(Commands::Doctor) => {
            commands::doctor::run_doctor(&ctx);
            Ok(0)
        }

        Some(Commands::Watch { args }) => {
            build::watch(load_options(cli), args.options())?;
            Ok(0)
        }

        // handled above
        Some(Commands::Init)
        | Some(Commands::Clean)
        | Some(Commands::Clobber)
        | Some(Commands::Completion { .. }) => Ok(0),
    }
}

fn missing_target(name: &str) -> i32 {
    eprintln!("{} unknown or disabled target: {}", "x".red(), name.bold());
    eprintln!("  hint: run {} to see what exists", "mx list".white().bold());
    2
}
