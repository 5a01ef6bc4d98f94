//! Compile-time project extension synthesis.
//!
//! Projects can keep their configuration in a `malletfile.c` next to the
//! sources: a plain C file defining `MALLETFILE_TARGETS`,
//! `MALLETFILE_OVERRIDES`, `MALLETFILE_DEFAULT_TARGET`, and
//! `MALLETFILE_DISABLE_AUTO_TOOLS`. A custom `mx` build may register that
//! table directly as a [`crate::config::ProjectSource`]; every stock `mx`
//! instead compiles a tiny generator that includes the file and emits an
//! equivalent `mallet.toml`-format layer under `build/_malletfile/`.
//!
//! The generated file is cached against `malletfile.c`'s own modification
//! time. Synthesis failure is fatal to the invocation (unless configuration
//! was disabled outright): silently proceeding would build with the wrong
//! configuration.

use crate::config;
use crate::process::CommandLine;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// Generator program, kept self-contained and C89-friendly. It is compiled
/// next to the project so `#include "malletfile.c"` resolves.
const GENERATOR_SOURCE: &str = r##"/* auto-generated by mallet; do not edit */
#include <stdio.h>
#include <stdlib.h>
#include <string.h>

typedef struct {
  const char *name;
  const char * const *includes;
  const char * const *defines;
  const char * const *cflags;
  const char * const *ldflags;
  const char * const *libs;
  int use_core;
} TargetOverride;

typedef struct {
  const char *name;
  const char *src_dir;
  const char *bin_base;
  const char *id;
  int enabled;
  int remove;
} TargetDef;

/* Pull in the project configuration */
#include "malletfile.c"

#ifdef MALLETFILE_OVERRIDES
static void emit_list(FILE *f, const char *key, const char * const *lst) {
  int i;
  if (!lst || !lst[0]) return;
  fputs(key, f);
  fputs(" = \"", f);
  for (i = 0; lst[i]; i++) {
    if (i) fputc(';', f);
    fputs(lst[i], f);
  }
  fputs("\"\n", f);
}

static void emit_override_fields(FILE *f, const TargetOverride *ov) {
  fputs(ov->use_core ? "core = true\n" : "core = false\n", f);
  emit_list(f, "includes", ov->includes);
  emit_list(f, "defines",  ov->defines);
  emit_list(f, "cflags",   ov->cflags);
  emit_list(f, "ldflags",  ov->ldflags);
  emit_list(f, "libs",     ov->libs);
}

static const TargetOverride *find_override_entry(const char *name) {
  const TargetOverride *ov = (const TargetOverride*)MALLETFILE_OVERRIDES;
  while (ov && ov->name) {
    if (strcmp(ov->name, name) == 0) return ov;
    ov++;
  }
  return 0;
}
#endif

#ifdef MALLETFILE_TARGETS
static int is_declared_target(const char *name) {
  const TargetDef *td = (const TargetDef*)MALLETFILE_TARGETS;
  while (td && td->name) {
    if (strcmp(td->name, name) == 0) return 1;
    td++;
  }
  return 0;
}
#endif

int main(int argc, char **argv) {
  const char *out = (argc > 1) ? argv[1] : "malletfile.generated.toml";
  FILE *f = fopen(out, "wb");
  if (!f) return 1;

  fputs("# generated from malletfile.c\n\n", f);
  fputs("[project]\n", f);
#ifdef MALLETFILE_DEFAULT_TARGET
  fprintf(f, "default_target = \"%s\"\n", MALLETFILE_DEFAULT_TARGET);
#endif
#ifdef MALLETFILE_DISABLE_AUTO_TOOLS
#if MALLETFILE_DISABLE_AUTO_TOOLS
  fputs("disable_auto_tools = true\n", f);
#endif
#endif
  fputc('\n', f);

  /* One section per name: a section may carry both definition and
   * override fields, and duplicate tables are not tolerated downstream. */
#ifdef MALLETFILE_TARGETS
  {
    const TargetDef *td = (const TargetDef*)MALLETFILE_TARGETS;
    while (td && td->name) {
      fprintf(f, "[target.\"%s\"]\n", td->name);
      if (td->src_dir)  fprintf(f, "src = \"%s\"\n", td->src_dir);
      if (td->bin_base) fprintf(f, "bin = \"%s\"\n", td->bin_base);
      if (td->id)       fprintf(f, "id = \"%s\"\n", td->id);
      if (td->remove) {
        fputs("remove = true\n", f);
      } else if (!td->src_dir && !td->bin_base && !td->id) {
        fputs(td->enabled ? "enabled = true\n" : "enabled = false\n", f);
      } else if (!td->enabled) {
        fputs("enabled = false\n", f);
      }
#ifdef MALLETFILE_OVERRIDES
      {
        const TargetOverride *ov = find_override_entry(td->name);
        if (ov) emit_override_fields(f, ov);
      }
#endif
      fputc('\n', f);
      td++;
    }
  }
#endif

#ifdef MALLETFILE_OVERRIDES
  {
    const TargetOverride *ov = (const TargetOverride*)MALLETFILE_OVERRIDES;
    while (ov && ov->name) {
      int declared = 0;
#ifdef MALLETFILE_TARGETS
      declared = is_declared_target(ov->name);
#endif
      if (!declared) {
        fprintf(f, "[target.\"%s\"]\n", ov->name);
        emit_override_fields(f, ov);
        fputc('\n', f);
      }
      ov++;
    }
  }
#endif

  fclose(f);
  return 0;
}
"##;

fn generator_paths() -> (PathBuf, PathBuf, PathBuf, PathBuf) {
    let dir = Path::new(config::BUILD_DIR).join("_malletfile");
    let gen_c = dir.join("malletfile_gen.c");
    let gen_exe = if cfg!(windows) {
        dir.join("malletfile_gen.exe")
    } else {
        dir.join("malletfile_gen")
    };
    let gen_toml = dir.join("malletfile.generated.toml");
    (dir, gen_c, gen_exe, gen_toml)
}

/// Synthesize the compile-time layer from `malletfile.c`, if present.
///
/// Returns the path of the generated declarative file, reusing a cached one
/// when it is at least as new as `malletfile.c`. Every failure here is an
/// error for the caller to treat as fatal.
pub fn prepare_generated_config() -> Result<Option<PathBuf>> {
    if !Path::new(config::PROJECT_FILE).exists() {
        return Ok(None);
    }

    let (dir, gen_c, gen_exe, gen_toml) = generator_paths();
    let ext_mtime = fs::metadata(config::PROJECT_FILE)
        .and_then(|m| m.modified())
        .with_context(|| format!("cannot stat {}", config::PROJECT_FILE))?;

    if let Ok(meta) = fs::metadata(&gen_toml)
        && let Ok(gen_mtime) = meta.modified()
        && gen_mtime >= ext_mtime
    {
        return Ok(Some(gen_toml));
    }

    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create {}", dir.display()))?;
    fs::write(&gen_c, GENERATOR_SOURCE)
        .with_context(|| format!("cannot write {}", gen_c.display()))?;

    let mut compile = CommandLine::new(config::resolve_compiler());
    compile
        .arg("-I")
        .arg(".")
        .arg("-I")
        .arg(config::INCLUDE_DIR)
        .arg("-o")
        .arg(gen_exe.to_string_lossy().into_owned())
        .arg(gen_c.to_string_lossy().into_owned());
    if !compile.run()? {
        bail!(
            "{}: generator compile failed: {}",
            config::PROJECT_FILE,
            compile.render()
        );
    }

    let mut generate = CommandLine::new(gen_exe.to_string_lossy().into_owned());
    generate.arg(gen_toml.to_string_lossy().into_owned());
    if !generate.run()? {
        bail!("{}: generator failed", config::PROJECT_FILE);
    }

    Ok(Some(gen_toml))
}
