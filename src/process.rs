//! Running external tools
//!
//! Every stage that shells out goes through a [`ProcessRunner`], so the
//! pipeline can be driven by a fake runner in tests.

use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use crate::error::{PatchError, Result};
use crate::ui;

/// A fully specified external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the command runs in
    pub cwd: PathBuf,
    /// Inherit the terminal instead of capturing output (tool may prompt)
    pub interactive: bool,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            interactive: false,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes tool commands to completion
pub trait ProcessRunner {
    /// Run `command`, returning its captured stdout
    ///
    /// A non-zero exit is [`PatchError::ToolExecutionFailed`] carrying
    /// `failure` and the captured stderr. An executable that cannot be found
    /// is [`PatchError::ToolMissing`].
    fn run(&self, command: &ToolCommand, failure: &str) -> Result<String>;
}

/// Runs commands as real child processes, blocking until they exit
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &ToolCommand, failure: &str) -> Result<String> {
        ui::command(&command.to_string());
        tracing::debug!(cwd = %command.cwd.display(), "spawning {}", command.program);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).current_dir(&command.cwd);

        let spawned = if command.interactive {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map(|status| Output {
                    status,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
        } else {
            let pb = ui::spinner(&format!("Running {}", command.program));
            let output = cmd.output();
            pb.finish_and_clear();
            output
        };
        let output = spawned.map_err(|e| spawn_error(&command.program, &e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stdout.lines() {
            tracing::debug!(target: "flutterpatch::tool", "{line}");
        }
        for line in stderr.lines() {
            tracing::debug!(target: "flutterpatch::tool", "stderr: {line}");
        }

        if !output.status.success() {
            tracing::debug!("{} exited with {}", command.program, output.status);
            return Err(PatchError::ToolExecutionFailed {
                description: format!("{failure} ({})", output.status),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

fn spawn_error(program: &str, err: &std::io::Error) -> PatchError {
    if err.kind() == IoErrorKind::NotFound {
        PatchError::ToolMissing {
            program: program.to_string(),
        }
    } else {
        PatchError::IoError {
            message: format!("Failed to start {program}: {err}"),
        }
    }
}
