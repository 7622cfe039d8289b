//! Thin wrapper over the docker CLI.

use crate::exec::{CommandRunner, ExecOptions, ExecOutput, command_line};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Subset of `docker context inspect --format=json` we rely on.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContextInfo {
    /// Context name.
    #[serde(default)]
    pub name: String,
    /// Endpoints keyed by type (`docker`).
    #[serde(default)]
    pub endpoints: HashMap<String, ContextEndpoint>,
    /// TLS material keyed by endpoint type; empty without TLS.
    #[serde(default, rename = "TLSMaterial")]
    pub tls_material: HashMap<String, serde_json::Value>,
}

/// One endpoint of a docker context.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ContextEndpoint {
    /// Daemon address, e.g. `tcp://docker:2376`.
    #[serde(default)]
    pub host: String,
}

impl ContextInfo {
    /// Host of the `docker` endpoint.
    #[must_use]
    pub fn docker_host(&self) -> Option<&str> {
        self.endpoints
            .get("docker")
            .map(|e| e.host.as_str())
            .filter(|h| !h.is_empty())
    }

    /// Whether the context carries client TLS material.
    #[must_use]
    pub fn has_tls_material(&self) -> bool {
        !self.tls_material.is_empty()
    }
}

/// The docker CLI.
#[derive(Debug, Clone)]
pub struct Docker {
    program: String,
}

impl Default for Docker {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

impl Docker {
    /// Program name used for every invocation.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the docker CLI is on the search path.
    pub fn is_available(&self, runner: &dyn CommandRunner) -> bool {
        runner.which(&self.program).is_some()
    }

    async fn run(
        &self,
        runner: &dyn CommandRunner,
        args: &[&str],
        options: ExecOptions,
    ) -> Result<ExecOutput> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let output = runner.exec(&self.program, &args, options).await?;
        output.check(&command_line(&self.program, &args))
    }

    /// Print `docker version`.
    pub async fn print_version(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.run(runner, &["version"], ExecOptions::visible()).await?;
        Ok(())
    }

    /// Print `docker info`.
    pub async fn print_info(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.run(runner, &["info"], ExecOptions::visible()).await?;
        Ok(())
    }

    /// Name of the current docker context.
    pub async fn context_name(&self, runner: &dyn CommandRunner) -> Result<String> {
        let output = self
            .run(
                runner,
                &["context", "inspect", "--format", "{{.Name}}"],
                ExecOptions::probe(),
            )
            .await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Inspect a context by name.
    pub async fn inspect_context(
        &self,
        runner: &dyn CommandRunner,
        name: &str,
    ) -> Result<ContextInfo> {
        let output = self
            .run(
                runner,
                &["context", "inspect", "--format=json", name],
                ExecOptions::probe(),
            )
            .await?;
        let contexts: Vec<ContextInfo> = serde_json::from_str(output.stdout.trim())?;
        contexts
            .into_iter()
            .next()
            .ok_or_else(|| Error::parse("docker context inspect", output.stdout.trim()))
    }

    /// Create a context pointing at `host`.
    pub async fn create_context(
        &self,
        runner: &dyn CommandRunner,
        name: &str,
        host: &str,
    ) -> Result<()> {
        let docker_opt = format!("host={host}");
        self.run(
            runner,
            &["context", "create", name, "--docker", &docker_opt],
            ExecOptions::visible(),
        )
        .await?;
        Ok(())
    }

    /// Force-remove a context.
    pub async fn remove_context(&self, runner: &dyn CommandRunner, name: &str) -> Result<()> {
        self.run(
            runner,
            &["context", "rm", "-f", name],
            ExecOptions::visible(),
        )
        .await?;
        Ok(())
    }

    /// Print a container's logs.
    pub async fn print_logs(&self, runner: &dyn CommandRunner, container: &str) -> Result<()> {
        self.run(runner, &["logs", container], ExecOptions::visible())
            .await?;
        Ok(())
    }

    /// Run a command in a running container and return its stdout.
    pub async fn exec_in(
        &self,
        runner: &dyn CommandRunner,
        container: &str,
        command: &[&str],
    ) -> Result<String> {
        let mut args = vec!["exec", container];
        args.extend_from_slice(command);
        let output = self.run(runner, &args, ExecOptions::probe()).await?;
        Ok(output.stdout)
    }
}
