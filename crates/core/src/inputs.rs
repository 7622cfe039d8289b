//! Action inputs after normalization.

use crate::Result;
use crate::docker::Docker;
use crate::exec::CommandRunner;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Buildx driver selected by the `driver` input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Driver {
    /// Builder backed by the docker daemon itself.
    Docker,
    /// BuildKit running in a container.
    DockerContainer,
    /// BuildKit pods in a Kubernetes cluster.
    Kubernetes,
    /// An already running BuildKit daemon.
    Remote,
    /// Docker Build Cloud.
    Cloud,
    /// Anything buildx knows and we don't; passed through untouched.
    Other(String),
}

impl Driver {
    /// Parse the `driver` input. Empty means buildx's default, `docker-container`.
    #[must_use]
    pub fn from_input(value: &str) -> Self {
        match value.trim() {
            "" | "docker-container" => Self::DockerContainer,
            "docker" => Self::Docker,
            "kubernetes" => Self::Kubernetes,
            "remote" => Self::Remote,
            "cloud" => Self::Cloud,
            other => Self::Other(other.to_string()),
        }
    }

    /// Driver name as buildx spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Docker => "docker",
            Self::DockerContainer => "docker-container",
            Self::Kubernetes => "kubernetes",
            Self::Remote => "remote",
            Self::Cloud => "cloud",
            Self::Other(name) => name,
        }
    }

    /// Drivers that run buildkitd themselves and so get default flags and `--config`.
    #[must_use]
    pub fn supports_buildkitd_flags(&self) -> bool {
        matches!(self, Self::Docker | Self::DockerContainer | Self::Kubernetes)
    }

    /// Whether explicit `--buildkitd-flags` may be passed at all.
    #[must_use]
    pub fn accepts_buildkitd_flags(&self) -> bool {
        !matches!(self, Self::Remote)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the buildkitd configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A TOML file on disk.
    File(PathBuf),
    /// Literal TOML text.
    Inline(String),
}

/// Normalized action inputs, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    /// Version selector: semver tag, `latest`, git `repo#ref`, or empty.
    pub version: String,
    /// Builder name.
    pub name: String,
    /// Selected driver.
    pub driver: Driver,
    /// Driver options in input order.
    pub driver_opts: Vec<String>,
    /// Flags passed to buildkitd.
    pub buildkitd_flags: String,
    /// Path to a buildkitd TOML config.
    pub buildkitd_config: String,
    /// Inline buildkitd TOML config.
    pub buildkitd_config_inline: String,
    /// Fixed platforms for the first node.
    pub platforms: Vec<String>,
    /// Run `buildx install` to make buildx the default `docker build`.
    pub install: bool,
    /// Switch to the new builder (`--use`).
    pub use_builder: bool,
    /// Endpoint or docker context for the first node.
    pub endpoint: String,
    /// YAML list of nodes to append.
    pub append: String,
    /// Keep downloaded binaries in the tool cache.
    pub cache_binary: bool,
    /// Remove the builder during teardown.
    pub cleanup: bool,
    /// Keep BuildKit state when removing the builder.
    pub keep_state: bool,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            version: String::new(),
            name: String::new(),
            driver: Driver::DockerContainer,
            driver_opts: Vec::new(),
            buildkitd_flags: String::new(),
            buildkitd_config: String::new(),
            buildkitd_config_inline: String::new(),
            platforms: Vec::new(),
            install: false,
            use_builder: true,
            endpoint: String::new(),
            append: String::new(),
            cache_binary: true,
            cleanup: true,
            keep_state: false,
        }
    }
}

impl Inputs {
    /// The buildkitd config to materialize; the file form wins over inline text.
    #[must_use]
    pub fn config_source(&self) -> Option<ConfigSource> {
        if !self.buildkitd_config.is_empty() {
            Some(ConfigSource::File(PathBuf::from(&self.buildkitd_config)))
        } else if !self.buildkitd_config_inline.is_empty() {
            Some(ConfigSource::Inline(self.buildkitd_config_inline.clone()))
        } else {
            None
        }
    }

    /// Version selector handed to the installer.
    ///
    /// The cloud driver needs the Docker Build Cloud flavour of buildx, so
    /// its selectors are namespaced with `cloud:`.
    #[must_use]
    pub fn version_selector(&self) -> String {
        let version = self.version.trim();
        if self.driver != Driver::Cloud {
            return version.to_string();
        }
        if version.is_empty() || version == "latest" {
            "cloud:latest".to_string()
        } else if version.starts_with("cloud:") || version.starts_with("lab:") {
            version.to_string()
        } else {
            format!("cloud:{version}")
        }
    }
}

/// Split a list input on newlines (and commas unless `ignore_comma`), trimming
/// entries and dropping empty ones.
#[must_use]
pub fn input_list(raw: &str, ignore_comma: bool) -> Vec<String> {
    raw.lines()
        .flat_map(|line| {
            if ignore_comma {
                vec![line]
            } else {
                line.split(',').collect()
            }
        })
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// A fresh `builder-<uuid>` name.
#[must_use]
pub fn generated_builder_name() -> String {
    format!("builder-{}", Uuid::new_v4())
}

/// Resolve the builder name: explicit input, else the current docker context
/// for the docker driver, else a generated name.
pub async fn resolve_builder_name(
    explicit: &str,
    driver: &Driver,
    docker: &Docker,
    runner: &dyn CommandRunner,
) -> Result<String> {
    let explicit = explicit.trim();
    if !explicit.is_empty() {
        return Ok(explicit.to_string());
    }
    if *driver == Driver::Docker {
        return docker.context_name(runner).await;
    }
    Ok(generated_builder_name())
}
