//! Configuration layering.
//!
//! Target configuration arrives from up to four places, applied in a fixed
//! order (discovery, compile-time project layer, runtime file) with CLI
//! flags on top. Override *lookup* runs the other way: the runtime file
//! wins, then the compile-time layer, then the built-in table. The entire
//! matching override object wins; fields are never merged across sources.
//!
//! All of it lives in a [`ConfigContext`] constructed once per invocation
//! and frozen into a [`TargetRegistry`] before any build command runs.

use crate::malletfile;
use crate::registry::{TargetDef, TargetRegistry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Project layout conventions.
pub const BUILD_DIR: &str = "build";
pub const SRC_DIR: &str = "src";
pub const INCLUDE_DIR: &str = "include";
pub const TESTS_DIR: &str = "tests";
pub const TOOLS_DIR: &str = "tools";
pub const CORE_DIR: &str = "src/core";
pub const APP_DIR: &str = "src/app";

/// Runtime declarative configuration file.
pub const CONFIG_FILE: &str = "mallet.toml";
/// Compile-time project extension (see `src/malletfile.rs`).
pub const PROJECT_FILE: &str = "malletfile.c";

pub const CC_ENV: &str = "MALLET_CC";
pub const CC_DEFAULT: &str = "tcc";
pub const DEFAULT_TARGET: &str = "app";

/// Compiler command resolution: `MALLET_CC` if set and non-empty, else the
/// default.
pub fn resolve_compiler() -> String {
    match env::var(CC_ENV) {
        Ok(v) if !v.is_empty() => v,
        _ => CC_DEFAULT.to_string(),
    }
}

/// Build profile selecting flag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Debug,
    Release,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Debug => "debug",
            Profile::Release => "release",
        }
    }
}

/// Per-target build adjustments. Keyed by target name; resolved as a whole
/// object from the highest-precedence source that defines the name.
#[derive(Debug, Clone, Default)]
pub struct TargetOverride {
    pub name: String,
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub libs: Vec<String>,
    /// Statically link the shared core unit (`src/core/`) into this target.
    pub use_core: bool,
}

/// One configuration layer, materialized: declarative target mutations plus
/// overrides plus project-wide settings.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub targets: Vec<TargetDef>,
    pub overrides: Vec<TargetOverride>,
    pub default_target: Option<String>,
    pub disable_auto_tools: bool,
}

/// A pluggable compile-time configuration source. Projects that bake their
/// configuration into a custom `mx` build register one of these at startup;
/// otherwise the slot is filled by synthesizing `malletfile.c` (see
/// `src/malletfile.rs`).
pub trait ProjectSource {
    fn layer(&self) -> Layer;
}

/// Built-in defaults, the lowest-precedence override source.
fn builtin_overrides() -> Vec<TargetOverride> {
    vec![TargetOverride {
        name: DEFAULT_TARGET.to_string(),
        includes: vec![SRC_DIR.to_string()],
        use_core: true,
        ..Default::default()
    }]
}

// --- mallet.toml (and the generated compile-time file) ---

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    project: ProjectSection,
    #[serde(default, rename = "target")]
    targets: BTreeMap<String, TargetSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectSection {
    default_target: Option<String>,
    disable_auto_tools: Option<bool>,
}

/// One `[target."NAME"]` section. Definition fields (`src`, `bin`, `id`,
/// `enabled`, `remove`) and override fields (`core`, list fields) may be
/// mixed freely; list fields are `;`-delimited strings.
#[derive(Debug, Default, Deserialize)]
struct TargetSection {
    src: Option<String>,
    bin: Option<String>,
    id: Option<String>,
    enabled: Option<bool>,
    remove: Option<bool>,
    core: Option<bool>,
    includes: Option<String>,
    defines: Option<String>,
    cflags: Option<String>,
    ldflags: Option<String>,
    libs: Option<String>,
}

/// Split a `;`-delimited list field, trimming entries, dropping empties.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl TargetSection {
    fn target_def(&self, name: &str) -> Option<TargetDef> {
        if self.remove == Some(true) {
            return Some(TargetDef {
                name: name.to_string(),
                remove: true,
                ..Default::default()
            });
        }
        let has_fields = self.src.is_some() || self.bin.is_some() || self.id.is_some();
        if !has_fields {
            // enable/disable action only, and only when stated
            return self.enabled.map(|enabled| TargetDef {
                name: name.to_string(),
                enabled: Some(enabled),
                ..Default::default()
            });
        }
        Some(TargetDef {
            name: name.to_string(),
            src_dir: self.src.clone(),
            bin_base: self.bin.clone(),
            id: self.id.clone(),
            enabled: self.enabled,
            remove: false,
        })
    }

    fn target_override(&self, name: &str) -> Option<TargetOverride> {
        let any = self.core.is_some()
            || self.includes.is_some()
            || self.defines.is_some()
            || self.cflags.is_some()
            || self.ldflags.is_some()
            || self.libs.is_some();
        if !any {
            return None;
        }
        Some(TargetOverride {
            name: name.to_string(),
            includes: self.includes.as_deref().map(split_list).unwrap_or_default(),
            defines: self.defines.as_deref().map(split_list).unwrap_or_default(),
            cflags: self.cflags.as_deref().map(split_list).unwrap_or_default(),
            ldflags: self.ldflags.as_deref().map(split_list).unwrap_or_default(),
            libs: self.libs.as_deref().map(split_list).unwrap_or_default(),
            use_core: self.core.unwrap_or(false),
        })
    }
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse configuration (check TOML syntax)")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn into_layer(self) -> Layer {
        let mut layer = Layer {
            default_target: self.project.default_target,
            disable_auto_tools: self.project.disable_auto_tools.unwrap_or(false),
            ..Default::default()
        };
        for (name, section) in &self.targets {
            if let Some(def) = section.target_def(name) {
                layer.targets.push(def);
            }
            if let Some(ov) = section.target_override(name) {
                layer.overrides.push(ov);
            }
        }
        layer
    }
}

// --- the context ---

/// CLI-level configuration inputs, parsed before the context is built.
#[derive(Debug, Default)]
pub struct LoadOptions {
    /// Ignore every configuration file (legacy mode).
    pub no_config: bool,
    /// Explicit runtime config path instead of `mallet.toml`.
    pub config_path: Option<PathBuf>,
    /// Suppress tool auto-discovery from the CLI.
    pub no_auto_tools: bool,
}

/// All configuration state of one invocation. Built once, then frozen into
/// a [`TargetRegistry`]; never mutated after a build command starts.
#[derive(Default)]
pub struct ConfigContext {
    builtin: Vec<TargetOverride>,
    project: Option<Layer>,
    runtime: Option<Layer>,
    config_path: Option<PathBuf>,
    no_config: bool,
    no_auto_tools_cli: bool,
}

impl ConfigContext {
    /// Load all layers. `provider`, when given, fills the compile-time slot
    /// directly; otherwise a present `malletfile.c` is synthesized into it.
    /// Configuration errors here are fatal: building with a half-loaded
    /// layer stack would build with the wrong configuration.
    pub fn load(opts: &LoadOptions, provider: Option<&dyn ProjectSource>) -> Result<Self> {
        let mut ctx = ConfigContext {
            builtin: builtin_overrides(),
            no_config: opts.no_config,
            no_auto_tools_cli: opts.no_auto_tools,
            ..Default::default()
        };
        if opts.no_config {
            return Ok(ctx);
        }

        if let Some(p) = provider {
            ctx.project = Some(p.layer());
        } else if let Some(generated) = malletfile::prepare_generated_config()? {
            ctx.project = Some(ConfigFile::load(&generated)?.into_layer());
        }

        let runtime_path = match &opts.config_path {
            Some(p) => Some(p.clone()),
            None => Path::new(CONFIG_FILE)
                .exists()
                .then(|| PathBuf::from(CONFIG_FILE)),
        };
        if let Some(path) = runtime_path {
            ctx.runtime = Some(ConfigFile::load(&path)?.into_layer());
            ctx.config_path = Some(path);
        }

        Ok(ctx)
    }

    /// Assemble and freeze the target registry: discovery first, then the
    /// compile-time declarations, then the runtime declarations.
    pub fn freeze(&self) -> Result<TargetRegistry> {
        let mut reg = TargetRegistry::discover(self.disable_auto_tools());
        self.apply_layers(&mut reg);
        reg.validate()?;
        Ok(reg)
    }

    pub fn apply_layers(&self, reg: &mut TargetRegistry) {
        for layer in [&self.project, &self.runtime].into_iter().flatten() {
            for def in &layer.targets {
                reg.apply(def);
            }
        }
    }

    /// First source defining an override for `name` wins whole: runtime,
    /// then compile-time, then built-in.
    pub fn resolve_override(&self, name: &str) -> Option<&TargetOverride> {
        for overrides in [
            self.runtime.as_ref().map(|l| &l.overrides),
            self.project.as_ref().map(|l| &l.overrides),
            Some(&self.builtin),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(ov) = overrides.iter().find(|ov| ov.name == name) {
                return Some(ov);
            }
        }
        None
    }

    pub fn default_target(&self) -> &str {
        self.runtime
            .as_ref()
            .and_then(|l| l.default_target.as_deref())
            .or_else(|| {
                self.project
                    .as_ref()
                    .and_then(|l| l.default_target.as_deref())
            })
            .unwrap_or(DEFAULT_TARGET)
    }

    /// Compile-time flag, runtime flag, CLI flag, checked in that order with
    /// the CLI taking final effect.
    pub fn disable_auto_tools(&self) -> bool {
        if self.project.as_ref().is_some_and(|l| l.disable_auto_tools) {
            return true;
        }
        if self.runtime.as_ref().is_some_and(|l| l.disable_auto_tools) {
            return true;
        }
        self.no_auto_tools_cli
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn no_config(&self) -> bool {
        self.no_config
    }

    #[cfg(test)]
    fn with_layers(project: Option<Layer>, runtime: Option<Layer>) -> Self {
        ConfigContext {
            builtin: builtin_overrides(),
            project,
            runtime,
            ..Default::default()
        }
    }
}
