//! External process execution.
//!
//! Every compiler and link invocation goes through [`CommandLine`]: a typed,
//! owned argument vector handed to the OS process-creation facility as-is.
//! Nothing is ever joined into a shell string, so paths with spaces or quote
//! characters need no escaping and cannot be re-parsed into something else.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// One pending process invocation: program, arguments, optional working dir.
#[derive(Debug, Clone)]
pub struct CommandLine {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            cwd: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for a in args {
            self.argv.push(a.into());
        }
        self
    }

    pub fn cwd(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Start the process without waiting. Stdio is inherited so compiler
    /// diagnostics reach the terminal directly.
    pub fn spawn(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd.spawn()
            .with_context(|| format!("failed to spawn '{}'", self.argv[0]))
    }

    /// Spawn and wait. Returns true on a zero exit status.
    pub fn run(&self) -> Result<bool> {
        let child = self.spawn()?;
        Ok(wait(child))
    }

    /// Render the argv for verbose echo. Arguments containing whitespace or
    /// quotes are quoted for readability only; execution never sees this
    /// string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, arg) in self.argv.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if arg.chars().any(|c| c.is_whitespace() || c == '"') {
                out.push('"');
                for c in arg.chars() {
                    if c == '"' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Reap a spawned child. A child that cannot be waited on counts as failed.
pub fn wait(mut child: Child) -> bool {
    match child.wait() {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}
