//! Filesystem layout used by setup-buildx.
//!
//! | Path | Resolution |
//! |------|------------|
//! | Docker config home | `DOCKER_CONFIG`, else `~/.docker` |
//! | CLI plugins | `<docker config>/cli-plugins` |
//! | Certificates | `<docker config>/buildx/certs` |
//! | Scratch dir | `RUNNER_TEMP/docker-setup-buildx`, else `<system temp>/docker-setup-buildx` |
//! | Tool cache | `RUNNER_TOOL_CACHE`, else `<user cache>/setup-buildx/tool-cache` |
//!
//! Empty variables are treated as unset.

use crate::{Error, Result};
use std::path::PathBuf;

const SCRATCH_DIR_NAME: &str = "docker-setup-buildx";

fn non_empty_var(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Docker CLI configuration directory.
///
/// # Errors
///
/// Returns an error if `DOCKER_CONFIG` is unset and the home directory cannot
/// be determined.
pub fn docker_config_dir() -> Result<PathBuf> {
    if let Some(dir) = non_empty_var("DOCKER_CONFIG") {
        return Ok(dir);
    }
    let home = dirs::home_dir()
        .ok_or_else(|| Error::configuration("Could not determine home directory"))?;
    Ok(home.join(".docker"))
}

/// Directory holding TLS material written for builder nodes.
pub fn certs_dir() -> Result<PathBuf> {
    Ok(docker_config_dir()?.join("buildx").join("certs"))
}

/// Per-job scratch directory (buildkitd config, standalone binaries, source builds).
#[must_use]
pub fn scratch_dir() -> PathBuf {
    non_empty_var("RUNNER_TEMP")
        .unwrap_or_else(std::env::temp_dir)
        .join(SCRATCH_DIR_NAME)
}

/// Root of the tool cache shared between jobs on the same runner.
///
/// # Errors
///
/// Returns an error if `RUNNER_TOOL_CACHE` is unset and no user cache
/// directory exists on this platform.
pub fn tool_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = non_empty_var("RUNNER_TOOL_CACHE") {
        return Ok(dir);
    }
    let base = dirs::cache_dir()
        .ok_or_else(|| Error::configuration("Could not determine cache directory"))?;
    Ok(base.join("setup-buildx").join("tool-cache"))
}
