//! Helpers intended for [`std::process::Command`].

use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Helpers intended for [`std::process::Command`].
pub trait CommandRunExt {
    /// Execute the child process, and verify that it exited successfully.
    /// On failure, the error includes the last lines of the child's stderr.
    fn run(&mut self) -> Result<()>;
}

/// The number of trailing stderr lines we keep for error messages.
const MAX_STDERR_LINES: usize = 10;

fn tail_of(buf: &[u8]) -> String {
    let text = String::from_utf8_lossy(buf);
    let lines = text.lines().collect::<Vec<_>>();
    let start = lines.len().saturating_sub(MAX_STDERR_LINES);
    lines[start..].join("\n")
}

impl CommandRunExt for Command {
    fn run(&mut self) -> Result<()> {
        let name = self.get_program().to_string_lossy().into_owned();
        tracing::trace!("exec: {name}");
        let output = self
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Spawning {name}"))?;
        if !output.status.success() {
            anyhow::bail!(
                "{name} failed: {}: {}",
                output.status,
                tail_of(&output.stderr)
            );
        }
        Ok(())
    }
}
