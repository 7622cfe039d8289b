//! Scripted [`CommandRunner`] for tests.
//!
//! Responses are matched against the rendered command line by prefix.
//! One-shot responses are consumed on first match and take precedence over
//! persistent ones, so a test can script "fails once, then succeeds".
//! Unmatched commands succeed with empty output.

use crate::exec::{CommandRunner, ExecOptions, ExecOutput, command_line};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
struct Response {
    prefix: String,
    output: ExecOutput,
}

/// Records every invocation and replays scripted outputs.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    once: Mutex<Vec<Response>>,
    always: Vec<Response>,
    programs: HashMap<String, PathBuf>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Runner with no scripted responses and no programs on the path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to every command line starting with `prefix`.
    #[must_use]
    pub fn on(mut self, prefix: &str, output: ExecOutput) -> Self {
        self.always.push(Response {
            prefix: prefix.to_string(),
            output,
        });
        self
    }

    /// Reply with `output` to the next command line starting with `prefix` only.
    #[must_use]
    pub fn once(self, prefix: &str, output: ExecOutput) -> Self {
        self.once
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Response {
                prefix: prefix.to_string(),
                output,
            });
        self
    }

    /// Make `which(name)` resolve to `/usr/bin/<name>`.
    #[must_use]
    pub fn with_program(mut self, name: &str) -> Self {
        self.programs
            .insert(name.to_string(), PathBuf::from("/usr/bin").join(name));
        self
    }

    /// Every command line run so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command lines starting with `prefix`, in order.
    #[must_use]
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    /// Whether any command line starting with `prefix` was run.
    #[must_use]
    pub fn called(&self, prefix: &str) -> bool {
        !self.calls_matching(prefix).is_empty()
    }

    fn respond(&self, line: &str) -> ExecOutput {
        let mut once = self.once.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = once.iter().position(|r| line.starts_with(&r.prefix)) {
            return once.remove(pos).output;
        }
        self.always
            .iter()
            .find(|r| line.starts_with(&r.prefix))
            .map(|r| r.output.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn exec(
        &self,
        command: &str,
        args: &[String],
        options: ExecOptions,
    ) -> Result<ExecOutput> {
        let line = command_line(command, args);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());
        let output = self.respond(&line);
        if !options.ignore_return_code && !output.success() {
            return Err(Error::external_command(line, output.error_message()));
        }
        Ok(output)
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_once_takes_precedence_then_falls_back() {
        let runner = ScriptedRunner::new()
            .on("docker buildx inspect", ExecOutput::ok("Name: b"))
            .once("docker buildx inspect", ExecOutput::failure(1, "no builder"));
        let args = vec!["buildx".to_string(), "inspect".to_string()];

        let first = runner.exec("docker", &args, ExecOptions::probe()).await.unwrap();
        assert_eq!(first.exit_code, 1);
        let second = runner.exec("docker", &args, ExecOptions::probe()).await.unwrap();
        assert_eq!(second.stdout, "Name: b");
        assert_eq!(runner.calls_matching("docker buildx inspect").len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_succeeds_and_failures_propagate() {
        let runner = ScriptedRunner::new().on("git", ExecOutput::failure(128, "fatal: nope"));
        assert!(runner.exec("true", &[], ExecOptions::default()).await.is_ok());
        assert!(runner.exec("git", &[], ExecOptions::default()).await.is_err());
        assert!(runner.called("true"));
    }

    #[test]
    fn test_which() {
        let runner = ScriptedRunner::new().with_program("docker");
        assert!(runner.which("docker").is_some());
        assert!(runner.which("buildx").is_none());
    }
}
