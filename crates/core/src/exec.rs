//! External process execution.
//!
//! Everything that shells out (docker, buildx, git) goes through
//! [`CommandRunner`] so the lifecycle can be driven by a scripted runner in
//! tests.

use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Per-invocation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Don't echo the command and its output to the log.
    pub silent: bool,
    /// Return the output instead of failing on a non-zero exit.
    pub ignore_return_code: bool,
}

impl ExecOptions {
    /// Quiet probe whose exit code the caller inspects.
    #[must_use]
    pub const fn probe() -> Self {
        Self {
            silent: true,
            ignore_return_code: true,
        }
    }

    /// Visible command whose exit code the caller inspects.
    #[must_use]
    pub const fn visible() -> Self {
        Self {
            silent: false,
            ignore_return_code: true,
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit code (`-1` when killed by a signal).
    pub exit_code: i32,
}

impl ExecOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Failed output with the given stderr.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code,
            ..Self::default()
        }
    }

    /// Exit code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// A failure worth reporting: non-zero exit with something on stderr.
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.success() && !self.stderr.trim().is_empty()
    }

    /// Last non-empty stderr line, which is where buildx puts its error.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("unknown error")
            .to_string()
    }

    /// Turn a reportable failure into [`Error::ExternalCommand`].
    pub fn check(self, command_line: &str) -> Result<Self> {
        if self.failed() {
            return Err(Error::external_command(command_line, self.error_message()));
        }
        Ok(self)
    }
}

/// Render a command line for logs and error messages.
#[must_use]
pub fn command_line(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs external processes to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `args`, capturing its output.
    ///
    /// A process that can't be spawned yields exit code 127 with the spawn
    /// error on stderr. Unless `ignore_return_code` is set, a non-zero exit
    /// is returned as [`Error::ExternalCommand`].
    async fn exec(&self, command: &str, args: &[String], options: ExecOptions)
    -> Result<ExecOutput>;

    /// Locate a program on the search path.
    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// [`CommandRunner`] backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn exec(
        &self,
        command: &str,
        args: &[String],
        options: ExecOptions,
    ) -> Result<ExecOutput> {
        let line = command_line(command, args);
        if options.silent {
            debug!(command = %line, "Running");
        } else {
            info!("[command]{line}");
        }

        let output = match Command::new(command).args(args).output().await {
            Ok(output) => ExecOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Err(e) => ExecOutput::failure(127, format!("Failed to run {command}: {e}")),
        };

        if !options.silent {
            for out in output.stdout.lines().chain(output.stderr.lines()) {
                info!("{out}");
            }
        }
        debug!(command = %line, exit_code = output.exit_code, "Finished");

        if !options.ignore_return_code && !output.success() {
            return Err(Error::external_command(line, output.error_message()));
        }
        Ok(output)
    }
}
