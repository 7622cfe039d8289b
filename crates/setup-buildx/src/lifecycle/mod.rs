//! Main and post phases of the action.
//!
//! Both phases share a [`Context`] holding the collaborators they drive, so
//! tests can swap in a scripted runner, a fake release feed and temporary
//! directories.

mod setup;
mod teardown;

pub use setup::{SetupReport, setup};
pub use teardown::teardown;

use crate::actions::Actions;
use setup_buildx_core::{CommandRunner, CredentialSource, Docker, Result, paths};
use setup_buildx_install::Installer;
use std::path::PathBuf;
use std::sync::Arc;

/// Directories used by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Docker CLI configuration directory; plugins go to `cli-plugins/` below it.
    pub docker_config_dir: PathBuf,
    /// Directory receiving node TLS material.
    pub certs_dir: PathBuf,
    /// Per-run scratch directory for downloads, builds and the buildkitd config.
    pub scratch_dir: PathBuf,
}

impl Layout {
    /// Layout derived from `DOCKER_CONFIG`, `HOME` and `RUNNER_TEMP`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            docker_config_dir: paths::docker_config_dir()?,
            certs_dir: paths::certs_dir()?,
            scratch_dir: paths::scratch_dir(),
        })
    }

    /// Where a standalone binary is installed; its `bin/` goes on the path.
    #[must_use]
    pub fn standalone_dir(&self) -> PathBuf {
        self.scratch_dir.join("standalone")
    }
}

/// Collaborators shared by both phases.
pub struct Context {
    /// Process runner for every external command.
    pub runner: Arc<dyn CommandRunner>,
    /// Runner command writer.
    pub actions: Actions,
    /// Release download, source build and install.
    pub installer: Installer,
    /// Docker CLI wrapper.
    pub docker: Docker,
    /// Directories used by the run.
    pub layout: Layout,
    /// TLS material for builder nodes.
    pub credentials: CredentialSource,
}

impl Context {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Log a warning locally and annotate the run with it.
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        if let Err(e) = self.actions.warning(message) {
            tracing::debug!(error = %e, "Failed to write warning annotation");
        }
    }
}
