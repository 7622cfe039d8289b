//! The buildx CLI, invoked either as a docker plugin or as a standalone binary.

use crate::builder::Builder;
use crate::exec::{CommandRunner, ExecOptions, ExecOutput, command_line};
use crate::inspect::parse_inspect;
use crate::version::parse_version;
use crate::Result;
use std::path::PathBuf;
use tracing::debug;

/// How buildx is invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buildx {
    standalone: bool,
    binary: Option<PathBuf>,
}

impl Buildx {
    /// `docker buildx ...`.
    #[must_use]
    pub fn plugin() -> Self {
        Self::default()
    }

    /// `buildx ...` resolved from the search path.
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            standalone: true,
            binary: None,
        }
    }

    /// `<binary> ...` for a freshly installed standalone binary.
    #[must_use]
    pub fn standalone_at(binary: impl Into<PathBuf>) -> Self {
        Self {
            standalone: true,
            binary: Some(binary.into()),
        }
    }

    /// Whether buildx runs without the docker CLI.
    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Program and full argument list for a buildx subcommand.
    #[must_use]
    pub fn command(&self, args: &[String]) -> (String, Vec<String>) {
        if self.standalone {
            let program = self
                .binary
                .as_ref()
                .map_or_else(|| "buildx".to_string(), |p| p.display().to_string());
            (program, args.to_vec())
        } else {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push("buildx".to_string());
            full.extend_from_slice(args);
            ("docker".to_string(), full)
        }
    }

    /// Run a buildx subcommand; a non-zero exit with stderr is an error.
    pub async fn run(
        &self,
        runner: &dyn CommandRunner,
        args: &[String],
        options: ExecOptions,
    ) -> Result<ExecOutput> {
        let (program, full) = self.command(args);
        let output = runner
            .exec(
                &program,
                &full,
                ExecOptions {
                    ignore_return_code: true,
                    ..options
                },
            )
            .await?;
        output.check(&command_line(&program, &full))
    }

    /// Whether buildx answers at all.
    pub async fn is_available(&self, runner: &dyn CommandRunner) -> bool {
        let (program, full) = self.command(&["version".to_string()]);
        match runner.exec(&program, &full, ExecOptions::probe()).await {
            Ok(output) => output.success(),
            Err(e) => {
                debug!(error = %e, "buildx probe failed");
                false
            }
        }
    }

    /// Parsed version token (`0.11.2` or a short commit).
    pub async fn version(&self, runner: &dyn CommandRunner) -> Result<String> {
        let output = self
            .run(runner, &["version".to_string()], ExecOptions::probe())
            .await?;
        parse_version(&output.stdout)
    }

    /// Print the `buildx version` banner.
    pub async fn print_version(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.run(runner, &["version".to_string()], ExecOptions::visible())
            .await?;
        Ok(())
    }

    /// Inspect a builder.
    pub async fn inspect(&self, runner: &dyn CommandRunner, name: &str) -> Result<Builder> {
        let output = self
            .run(runner, &inspect_by_name(name), ExecOptions::probe())
            .await?;
        Ok(parse_inspect(&output.stdout))
    }

    /// Whether a builder with this name exists.
    pub async fn exists(&self, runner: &dyn CommandRunner, name: &str) -> bool {
        let (program, full) = self.command(&inspect_by_name(name));
        runner
            .exec(&program, &full, ExecOptions::probe())
            .await
            .is_ok_and(|output| output.success())
    }
}

fn inspect_by_name(name: &str) -> Vec<String> {
    vec!["inspect".to_string(), name.to_string()]
}

/// `rm [--keep-state] <name>`.
#[must_use]
pub fn rm_args(name: &str, keep_state: bool) -> Vec<String> {
    let mut args = vec!["rm".to_string()];
    if keep_state {
        args.push("--keep-state".to_string());
    }
    args.push(name.to_string());
    args
}

/// `install`: make buildx the default `docker build`.
#[must_use]
pub fn install_args() -> Vec<String> {
    vec!["install".to_string()]
}
