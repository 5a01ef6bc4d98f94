//! The compilation scheduler.
//!
//! One [`BuildSession`] drives every build of a single invocation: it owns
//! the resolved compiler, the build options, and the shared core unit's
//! object list (built at most once and reused by every target that links
//! it). Compilation runs through a bounded pool of external compiler
//! processes; the single control thread blocks only while waiting for a
//! pool slot or for the final drain.

use crate::config::{ConfigContext, TargetOverride};
use crate::process::{self, CommandLine};
use crate::registry::Target;
use crate::stale;
use crate::{config, scan};
use anyhow::{Result, bail};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub profile: config::Profile,
    pub verbose: bool,
    /// Recompile and relink everything regardless of staleness.
    pub force: bool,
    /// Upper bound on concurrently running compiler processes.
    pub jobs: usize,
    pub strict: bool,
    /// Never link the shared core unit, even if an override asks for it.
    pub no_core: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            profile: config::Profile::Debug,
            verbose: false,
            force: false,
            jobs: 1,
            strict: false,
            no_core: false,
        }
    }
}

pub struct BuildSession<'a> {
    ctx: &'a ConfigContext,
    cc: String,
    opts: BuildOptions,
    /// Shared unit objects, filled on first use; `Some` means "already
    /// built this invocation", including the empty no-core-dir case.
    core_objs: Option<Vec<PathBuf>>,
    compile_entries: Vec<serde_json::Value>,
}

impl<'a> BuildSession<'a> {
    /// `cc` is the already-resolved compiler command; resolution from the
    /// environment is the CLI layer's job.
    pub fn new(ctx: &'a ConfigContext, cc: String, opts: BuildOptions) -> Self {
        Self {
            ctx,
            cc,
            opts,
            core_objs: None,
            compile_entries: Vec::new(),
        }
    }

    /// Build one target: shared unit first if linked in, then this target's
    /// stale sources through the pool, then at most one link step.
    pub fn build_target(&mut self, target: &Target) -> Result<()> {
        let started = Instant::now();
        println!(
            "{} Building {} ({})",
            "🔨".blue(),
            target.name.bold(),
            self.opts.profile.name()
        );

        let ov = self.ctx.resolve_override(&target.name).cloned();
        let use_core = !self.opts.no_core && ov.as_ref().is_some_and(|o| o.use_core);

        let layout = super::utils::BuildLayout::for_target(&target.id, self.opts.profile);
        layout.ensure()?;
        let out_exe = layout.exe_path(&target.bin_base);

        let core_objs = if use_core {
            self.ensure_core_built()?
        } else {
            Vec::new()
        };

        // When the app builds straight out of src/, keep the shared subtree
        // out of the scan: those files belong to the core build.
        let skip_core = target.src_dir == Path::new(config::SRC_DIR)
            && Path::new(config::CORE_DIR).is_dir();
        let mut sources =
            scan::scan_sources(&target.src_dir, ".c", skip_core.then_some("core"));

        // legacy layout: src/app/ projects may still carry src/main.c
        if target.src_dir == Path::new(config::APP_DIR) && Path::new("src/main.c").exists() {
            sources.push(PathBuf::from("src/main.c"));
        }

        if sources.is_empty() {
            bail!(
                "no sources in {} for target {}",
                target.src_dir.display(),
                target.name
            );
        }

        let mut includes = vec![
            config::INCLUDE_DIR.to_string(),
            target.src_dir.to_string_lossy().into_owned(),
            config::SRC_DIR.to_string(),
        ];
        if Path::new(config::CORE_DIR).is_dir() {
            includes.push(config::CORE_DIR.to_string());
        }

        let mut objects = self.compile_sources(&sources, &layout, &includes, ov.as_ref())?;
        objects.extend(core_objs);

        self.write_compile_commands();

        if stale::needs_link(&out_exe, &objects, self.opts.force) {
            println!("   {} Linking...", "🔗".cyan());
            self.link(&out_exe, &objects, &includes, ov.as_ref())?;
            println!(
                "{} Build finished in {:.2?}",
                "✓".green(),
                started.elapsed()
            );
        } else {
            println!("{} Up to date", "⚡".green());
        }

        Ok(())
    }

    /// Build a target, then execute its binary with `args` in place.
    pub fn run_target(&mut self, target: &Target, args: &[String]) -> Result<bool> {
        self.build_target(target)?;
        let exe = super::utils::BuildLayout::for_target(&target.id, self.opts.profile)
            .exe_path(&target.bin_base);

        println!("{} Running...\n", "▶".green());
        let mut cmd = CommandLine::new(exe.to_string_lossy().into_owned());
        cmd.args(args.iter().cloned());
        if self.opts.verbose {
            println!("{}", cmd.render());
        }
        cmd.run()
    }

    /// The shared core unit, compiled at most once per invocation. Targets
    /// built later in the same run reuse the object list as-is.
    fn ensure_core_built(&mut self) -> Result<Vec<PathBuf>> {
        if let Some(objs) = &self.core_objs {
            return Ok(objs.clone());
        }
        let objs = self.build_core()?;
        self.core_objs = Some(objs.clone());
        Ok(objs)
    }

    /// No core directory (or an empty one) is normal and yields no objects;
    /// the core takes no target override, only its built-in flag set.
    fn build_core(&mut self) -> Result<Vec<PathBuf>> {
        let core_dir = Path::new(config::CORE_DIR);
        if !core_dir.is_dir() {
            return Ok(Vec::new());
        }
        let sources = scan::scan_sources(core_dir, ".c", None);
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let layout = super::utils::BuildLayout::for_target(super::utils::CORE_ID, self.opts.profile);
        layout.ensure()?;

        let includes = vec![
            config::INCLUDE_DIR.to_string(),
            config::SRC_DIR.to_string(),
            config::CORE_DIR.to_string(),
        ];
        self.compile_sources(&sources, &layout, &includes, None)
    }

    /// Compile every stale source under the `jobs` bound and return the full
    /// object list (fresh objects are reused without a process launch).
    ///
    /// Backpressure: when the pool is full, wait for the oldest outstanding
    /// job before launching another. First failure stops *launching*; every
    /// already-started child is still waited on before the error returns.
    fn compile_sources(
        &mut self,
        sources: &[PathBuf],
        layout: &super::utils::BuildLayout,
        includes: &[String],
        ov: Option<&TargetOverride>,
    ) -> Result<Vec<PathBuf>> {
        let jobs = self.opts.jobs.max(1);
        let mut running: VecDeque<(std::process::Child, PathBuf)> = VecDeque::new();
        let mut objects = Vec::with_capacity(sources.len());
        let mut failed: Option<String> = None;

        let pb = if self.opts.verbose {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        for src in sources {
            let (obj, dep) = layout.artifacts(src);

            let cmd = self.compile_argv(src, &obj, &dep, includes, ov);
            self.compile_entries.push(json!({
                "directory": std::env::current_dir()
                    .map(|d| d.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| ".".to_string()),
                "command": cmd.render(),
                "file": src.to_string_lossy(),
            }));
            objects.push(obj.clone());

            if !stale::needs_compile(&obj, src, &dep, self.opts.force) {
                continue;
            }
            if failed.is_some() {
                continue;
            }

            if running.len() >= jobs {
                if let Some((child, done_src)) = running.pop_front() {
                    pb.inc(1);
                    if !process::wait(child) {
                        failed = Some(done_src.to_string_lossy().into_owned());
                        continue;
                    }
                }
            }

            if self.opts.verbose {
                println!("{}", cmd.render());
            }
            pb.inc_length(1);
            pb.set_message(format!("compiling {}", src.display()));

            match cmd.spawn() {
                Ok(child) => running.push_back((child, src.clone())),
                Err(e) => failed = Some(format!("{} ({e:#})", src.display())),
            }
        }

        // final drain: nothing is abandoned, even after a failure
        while let Some((child, done_src)) = running.pop_front() {
            pb.inc(1);
            if !process::wait(child) && failed.is_none() {
                failed = Some(done_src.to_string_lossy().into_owned());
            }
        }
        pb.finish_and_clear();

        if let Some(what) = failed {
            bail!("compile failed: {what}");
        }
        Ok(objects)
    }

    fn compile_argv(
        &self,
        src: &Path,
        obj: &Path,
        dep: &Path,
        includes: &[String],
        ov: Option<&TargetOverride>,
    ) -> CommandLine {
        let mut cmd = CommandLine::new(&self.cc);
        cmd.arg("-c");
        cmd.args(super::utils::warning_flags(self.opts.strict));
        cmd.args(super::utils::profile_flags(self.opts.profile));

        for inc in includes {
            cmd.arg("-I").arg(inc);
        }
        if let Some(ov) = ov {
            for inc in &ov.includes {
                cmd.arg("-I").arg(inc);
            }
            for def in &ov.defines {
                cmd.arg(format!("-D{def}"));
            }
            cmd.args(ov.cflags.iter().cloned());
        }

        cmd.arg("-MD")
            .arg("-MF")
            .arg(dep.to_string_lossy().into_owned());
        cmd.arg("-o").arg(obj.to_string_lossy().into_owned());
        cmd.arg(src.to_string_lossy().into_owned());
        cmd
    }

    fn link(
        &self,
        out_exe: &Path,
        objects: &[PathBuf],
        includes: &[String],
        ov: Option<&TargetOverride>,
    ) -> Result<()> {
        let mut cmd = CommandLine::new(&self.cc);
        cmd.args(super::utils::warning_flags(self.opts.strict));
        cmd.args(super::utils::profile_flags(self.opts.profile));

        for inc in includes {
            cmd.arg("-I").arg(inc);
        }
        if let Some(ov) = ov {
            for inc in &ov.includes {
                cmd.arg("-I").arg(inc);
            }
            for def in &ov.defines {
                cmd.arg(format!("-D{def}"));
            }
            cmd.args(ov.ldflags.iter().cloned());
        }

        cmd.arg("-o").arg(out_exe.to_string_lossy().into_owned());
        for obj in objects {
            cmd.arg(obj.to_string_lossy().into_owned());
        }
        if let Some(ov) = ov {
            cmd.args(ov.libs.iter().cloned());
        }

        if self.opts.verbose {
            println!("{}", cmd.render());
        }
        if !cmd.run()? {
            bail!("link failed: {}", out_exe.display());
        }
        Ok(())
    }

    fn write_compile_commands(&self) {
        match serde_json::to_string_pretty(&self.compile_entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write("compile_commands.json", json) {
                    println!(
                        "{} could not write compile_commands.json: {e}",
                        "!".yellow()
                    );
                }
            }
            Err(e) => println!("{} compile_commands.json: {e}", "!".yellow()),
        }
    }
}
