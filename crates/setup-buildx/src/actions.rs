//! GitHub Actions runner commands.
//!
//! Outputs, state and path entries go to the files named by `GITHUB_OUTPUT`,
//! `GITHUB_STATE` and `GITHUB_PATH`. Without those files the legacy
//! `::set-output`/`::save-state`/`::add-path` workflow commands are printed.

use setup_buildx_core::{Error, Result, RunState};
use std::fs::OpenOptions;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Writes runner commands for one phase.
pub struct Actions {
    output_file: Option<PathBuf>,
    state_file: Option<PathBuf>,
    path_file: Option<PathBuf>,
    debug: bool,
    stdout: Mutex<Box<dyn Write + Send>>,
}

impl Default for Actions {
    fn default() -> Self {
        Self {
            output_file: None,
            state_file: None,
            path_file: None,
            debug: false,
            stdout: Mutex::new(Box::new(std::io::stdout())),
        }
    }
}

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actions")
            .field("output_file", &self.output_file)
            .field("state_file", &self.state_file)
            .field("path_file", &self.path_file)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

fn env_file(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Actions {
    /// Command files and debug flag from the runner environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            output_file: env_file("GITHUB_OUTPUT"),
            state_file: env_file("GITHUB_STATE"),
            path_file: env_file("GITHUB_PATH"),
            debug: std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1"),
            ..Self::default()
        }
    }

    /// Write outputs to `path`.
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Write state to `path`.
    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Write path entries to `path`.
    #[must_use]
    pub fn with_path_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path_file = Some(path.into());
        self
    }

    /// Force step debug logging on or off.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Send workflow commands to `writer` instead of stdout.
    #[must_use]
    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.stdout = Mutex::new(Box::new(writer));
        self
    }

    /// Whether the runner has step debug logging enabled.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Set a step output.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        debug!(name, value, "set output");
        match &self.output_file {
            Some(file) => append_file_command(file, name, value),
            None => self.command("set-output", &[("name", name)], value),
        }
    }

    /// Save a value for the post phase.
    pub fn save_state(&self, name: &str, value: &str) -> Result<()> {
        debug!(name, value, "save state");
        match &self.state_file {
            Some(file) => append_file_command(file, name, value),
            None => self.command("save-state", &[("name", name)], value),
        }
    }

    /// Save every entry of the run state.
    pub fn save_run_state(&self, state: &RunState) -> Result<()> {
        for (name, value) in state.entries() {
            self.save_state(name, &value)?;
        }
        Ok(())
    }

    /// Prepend `dir` to the search path of later steps.
    pub fn add_path(&self, dir: &Path) -> Result<()> {
        let dir = dir.display().to_string();
        match &self.path_file {
            Some(file) => append_line(file, &dir),
            None => self.command("add-path", &[], &dir),
        }
    }

    /// Open a collapsible log group.
    pub fn start_group(&self, title: &str) -> Result<()> {
        self.command("group", &[], title)
    }

    /// Close the current log group.
    pub fn end_group(&self) -> Result<()> {
        self.command("endgroup", &[], "")
    }

    /// Run `fut` inside a log group. The group is closed even when `fut` fails.
    pub async fn group<T, F>(&self, title: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.start_group(title)?;
        let result = fut.await;
        self.end_group()?;
        result
    }

    /// Annotate the run with a warning.
    pub fn warning(&self, message: &str) -> Result<()> {
        self.command("warning", &[], message)
    }

    /// Annotate the run with an error.
    pub fn error(&self, message: &str) -> Result<()> {
        self.command("error", &[], message)
    }

    /// Print a plain line to the runner log.
    pub fn info(&self, message: &str) -> Result<()> {
        self.write_line(message)
    }

    fn command(&self, command: &str, properties: &[(&str, &str)], message: &str) -> Result<()> {
        let mut line = format!("::{command}");
        if !properties.is_empty() {
            let props: Vec<String> = properties
                .iter()
                .map(|(k, v)| format!("{k}={}", escape_property(v)))
                .collect();
            line.push(' ');
            line.push_str(&props.join(","));
        }
        line.push_str("::");
        line.push_str(&escape_data(message));
        self.write_line(&line)
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut out = self.stdout.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// `name<<delimiter` block understood by the runner for multi-line values.
fn file_command(name: &str, value: &str) -> String {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
    format!("{name}<<{delimiter}\n{value}\n{delimiter}")
}

fn append_file_command(file: &Path, name: &str, value: &str) -> Result<()> {
    append_line(file, &file_command(name, value))
}

fn append_line(file: &Path, line: &str) -> Result<()> {
    let mut handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .map_err(|e| Error::io(e, file))?;
    writeln!(handle, "{line}").map_err(|e| Error::io(e, file))
}
