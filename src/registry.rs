//! The target registry: every buildable unit known to one invocation.
//!
//! Targets come from discovery (the app directory, plus one target per
//! immediate subdirectory of `tools/`) and from declarative entries applied
//! by the configuration layers. Once every layer has been applied the
//! registry is validated and treated as frozen; build commands only read it.

use crate::config;
use anyhow::{Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// One buildable unit.
#[derive(Debug, Clone)]
pub struct Target {
    /// Externally addressable name, possibly namespaced (`tool:foo`).
    pub name: String,
    /// Filesystem-safe derivation of `name`, used for output directories.
    pub id: String,
    /// Directory scanned recursively for sources.
    pub src_dir: PathBuf,
    /// Output executable base name, without extension.
    pub bin_base: String,
    pub enabled: bool,
}

/// One declarative mutation of the registry.
///
/// `remove` wins outright. An entry with no `src_dir`/`bin_base`/`id` is an
/// enable/disable action on an existing target. Anything else is an upsert
/// that overwrites only the supplied fields.
#[derive(Debug, Clone, Default)]
pub struct TargetDef {
    pub name: String,
    pub src_dir: Option<String>,
    pub bin_base: Option<String>,
    pub id: Option<String>,
    pub enabled: Option<bool>,
    pub remove: bool,
}

/// Replace anything that is not alphanumeric, `_`, or `-` so the result is
/// safe as a directory name (`tool:foo` -> `tool_foo`).
pub fn sanitize_name_to_id(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct TargetRegistry {
    items: Vec<Target>,
}

impl TargetRegistry {
    /// Build the initial registry from the project layout: the `app` target
    /// (preferring `src/app/` when present) and, unless suppressed, one
    /// `tool:<name>` target per immediate subdirectory of `tools/`.
    pub fn discover(disable_auto_tools: bool) -> Self {
        let mut reg = Self::default();

        if Path::new(config::APP_DIR).is_dir() {
            reg.push("app", config::APP_DIR, "app");
        } else {
            reg.push("app", config::SRC_DIR, "app");
        }

        if !disable_auto_tools {
            let mut tool_dirs: Vec<String> = fs::read_dir(config::TOOLS_DIR)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .filter(|e| e.path().is_dir())
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();
            tool_dirs.sort();

            for name in tool_dirs {
                let src = Path::new(config::TOOLS_DIR).join(&name);
                reg.push(&format!("tool:{name}"), &src.to_string_lossy(), &name);
            }
        }

        reg
    }

    pub fn push(&mut self, name: &str, src_dir: &str, bin_base: &str) {
        self.items.push(Target {
            name: name.to_string(),
            id: sanitize_name_to_id(name),
            src_dir: PathBuf::from(src_dir),
            bin_base: bin_base.to_string(),
            enabled: true,
        });
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|t| t.name == name)
    }

    /// Apply one declarative entry. See [`TargetDef`] for the operation
    /// kinds. An enable/disable action on a target that does not exist is a
    /// no-op: enabling something undeclared has no defined source directory.
    pub fn apply(&mut self, def: &TargetDef) {
        if def.name.is_empty() {
            return;
        }
        let idx = self.index_of(&def.name);

        if def.remove {
            if let Some(i) = idx {
                self.items.remove(i);
            }
            return;
        }

        if def.src_dir.is_none() && def.bin_base.is_none() && def.id.is_none() {
            if let Some(i) = idx
                && let Some(enabled) = def.enabled
            {
                self.items[i].enabled = enabled;
            }
            return;
        }

        let i = match idx {
            Some(i) => i,
            None => {
                let fallback_bin = sanitize_name_to_id(&def.name);
                self.push(
                    &def.name,
                    def.src_dir.as_deref().unwrap_or(config::SRC_DIR),
                    def.bin_base.as_deref().unwrap_or(&fallback_bin),
                );
                self.items.len() - 1
            }
        };

        let t = &mut self.items[i];
        if let Some(src) = &def.src_dir {
            t.src_dir = PathBuf::from(src);
        }
        if let Some(bin) = &def.bin_base {
            t.bin_base = bin.clone();
        }
        if let Some(id) = &def.id {
            t.id = id.clone();
        }
        t.enabled = def.enabled.unwrap_or(true);
    }

    /// Freeze-time invariant check: names are unique, ids are unique, and no
    /// id shadows another target's name (lookups by name or by id must
    /// resolve to the same entry).
    pub fn validate(&self) -> Result<()> {
        for (i, a) in self.items.iter().enumerate() {
            for b in &self.items[i + 1..] {
                if a.name == b.name {
                    bail!("duplicate target name: {}", a.name);
                }
                if a.id == b.id {
                    bail!("targets '{}' and '{}' share id '{}'", a.name, b.name, a.id);
                }
                if a.id == b.name {
                    bail!("id '{}' of target '{}' shadows target '{}'", a.id, a.name, b.name);
                }
                if b.id == a.name {
                    bail!("id '{}' of target '{}' shadows target '{}'", b.id, b.name, a.name);
                }
            }
        }
        Ok(())
    }

    /// Look up an *enabled* target by name or by id.
    pub fn find(&self, name_or_id: &str) -> Option<&Target> {
        self.items
            .iter()
            .filter(|t| t.enabled)
            .find(|t| t.name == name_or_id || t.id == name_or_id)
    }

    /// Every target, disabled ones included (used by `mx list`).
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
