//! Acquire and install buildx.
//!
//! A binary comes either from a GitHub release (optionally cached in the
//! runner tool cache) or from a source build of a git context, and is then
//! installed as a docker CLI plugin or as a standalone binary.
//!
//! # Example
//!
//! ```ignore
//! use setup_buildx_install::{HttpReleaseClient, Installer, ToolCache};
//!
//! let installer = Installer::new(
//!     Box::new(HttpReleaseClient::new()?),
//!     ToolCache::from_env()?,
//!     setup_buildx_core::paths::scratch_dir(),
//! );
//! let binary = installer.download("latest", true).await?;
//! let plugin = installer.install_plugin(&binary, &paths::docker_config_dir()?)?;
//! ```

#![warn(missing_docs)]

mod cache;
mod platform;
mod release;

pub use cache::ToolCache;
pub use platform::{Platform, current_platform};
pub use release::{
    BUILDX_LAB_RELEASES_URL, BUILDX_RELEASES_URL, Channel, HttpReleaseClient, Release,
    ReleaseClient, parse_selector, resolve_release,
};

use setup_buildx_core::exec::ExecOptions;
use setup_buildx_core::{Buildx, CommandRunner, Error, Result, git};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cache key for binaries built from source.
const SOURCE_TOOL_NAME: &str = "buildx-source";

/// Downloads, builds and installs buildx binaries.
pub struct Installer {
    client: Box<dyn ReleaseClient>,
    cache: ToolCache,
    scratch_dir: PathBuf,
    platform: Platform,
}

impl Installer {
    /// Create an installer for the current platform.
    #[must_use]
    pub fn new(client: Box<dyn ReleaseClient>, cache: ToolCache, scratch_dir: PathBuf) -> Self {
        Self {
            client,
            cache,
            scratch_dir,
            platform: current_platform(),
        }
    }

    /// Override the target platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Target platform.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Download the release matching `selector` and return the binary path.
    ///
    /// `selector` is `latest`, a tag with or without `v`, or either of those
    /// prefixed with `cloud:`/`lab:`. With `cache_binary` the binary is kept in
    /// the tool cache and a cached copy is reused.
    pub async fn download(&self, selector: &str, cache_binary: bool) -> Result<PathBuf> {
        let (channel, tag) = parse_selector(selector);
        let release = resolve_release(self.client.as_ref(), channel, tag).await?;
        debug!(tag = %release.tag_name, url = %release.html_url, "Release found");

        let version = release.version();
        if semver::Version::parse(version).is_err() {
            return Err(Error::invalid_version(version));
        }

        let tool = channel.tool_name();
        let file_name = self.platform.plugin_file_name();
        if cache_binary
            && let Some(cached) = self.cache.find(tool, version, &self.platform.arch, &file_name)
        {
            info!("Buildx {version} found in tool cache: {}", cached.display());
            return Ok(cached);
        }

        let asset = self.platform.asset_name(version);
        let url = channel.download_url(version, &asset);
        let dest = self.scratch_dir.join("downloads").join(&asset);
        info!("Downloading {url}");
        self.client.download(&url, &dest).await?;

        if cache_binary {
            return self
                .cache
                .store(tool, version, &self.platform.arch, &file_name, &dest);
        }
        Ok(dest)
    }

    /// Build buildx from a git context (`repo#ref`) and return the binary path.
    ///
    /// The build runs with an existing buildx, preferring the standalone
    /// binary when `standalone` is set and the docker plugin otherwise.
    pub async fn build(
        &self,
        runner: &dyn CommandRunner,
        git_context: &str,
        standalone: bool,
        cache_binary: bool,
    ) -> Result<PathBuf> {
        let commit = git::resolve_commit(runner, git_context).await?;
        let file_name = self.platform.plugin_file_name();
        if cache_binary
            && let Some(cached) =
                self.cache
                    .find(SOURCE_TOOL_NAME, &commit, &self.platform.arch, &file_name)
        {
            info!("Buildx {commit} found in tool cache: {}", cached.display());
            return Ok(cached);
        }

        let buildx = select_build_tool(runner, standalone).await?;
        let out_dir = self.scratch_dir.join("buildx-build-cache");
        let with_git_auth = std::env::var_os("GIT_AUTH_TOKEN").is_some();
        let args = build_args(git_context, &out_dir, with_git_auth);
        info!("Building buildx from {git_context} ({commit})");
        buildx.run(runner, &args, ExecOptions::visible()).await?;

        let built = out_dir.join(self.platform.standalone_file_name());
        if !built.is_file() {
            return Err(Error::not_found("buildx binary", built));
        }
        if cache_binary {
            return self
                .cache
                .store(SOURCE_TOOL_NAME, &commit, &self.platform.arch, &file_name, &built);
        }
        Ok(built)
    }

    /// Install `binary` as `<docker config>/cli-plugins/docker-buildx`.
    pub fn install_plugin(&self, binary: &Path, docker_config_dir: &Path) -> Result<PathBuf> {
        let dest = docker_config_dir
            .join("cli-plugins")
            .join(self.platform.plugin_file_name());
        install_file(binary, &dest)?;
        info!("Docker plugin installed to {}", dest.display());
        Ok(dest)
    }

    /// Install `binary` as `<dest_dir>/bin/buildx`. The caller puts the
    /// returned path's directory on the search path.
    pub fn install_standalone(&self, binary: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let dest = dest_dir
            .join("bin")
            .join(self.platform.standalone_file_name());
        install_file(binary, &dest)?;
        info!("Standalone binary installed to {}", dest.display());
        Ok(dest)
    }
}

/// Arguments building the buildx binaries target into `out_dir`.
#[must_use]
pub fn build_args(git_context: &str, out_dir: &Path, with_git_auth: bool) -> Vec<String> {
    let mut args: Vec<String> = [
        "build",
        "--target",
        "binaries",
        "--build-arg",
        "BUILDKIT_CONTEXT_KEEP_GIT_DIR=1",
        "--output",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.push(format!("type=local,dest={}", out_dir.display()));
    if with_git_auth {
        args.push("--secret".to_string());
        args.push("id=GIT_AUTH_TOKEN".to_string());
    }
    args.push(git_context.to_string());
    args
}

async fn select_build_tool(runner: &dyn CommandRunner, standalone: bool) -> Result<Buildx> {
    let candidates = if standalone {
        [Buildx::standalone(), Buildx::plugin()]
    } else {
        [Buildx::plugin(), Buildx::standalone()]
    };
    for candidate in candidates {
        if candidate.is_available(runner).await {
            debug!(standalone = candidate.is_standalone(), "Building with existing buildx");
            return Ok(candidate);
        }
    }
    Err(Error::unsupported_mode_with_help(
        "Cannot build buildx from source: no buildx found to build with",
        "Install buildx first or use a release version",
    ))
}

fn install_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent))?;
    }
    std::fs::copy(source, dest).map_err(|e| Error::io(e, dest))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(dest)
            .map_err(|e| Error::io(e, dest))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(dest, perms).map_err(|e| Error::io(e, dest))?;
    }
    Ok(())
}
