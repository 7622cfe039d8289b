//! Buildx version parsing and capability gates.
//!
//! Buildx reports its version in a free-form banner such as
//! `github.com/docker/buildx v0.11.2 9872040b6626fb7d87ef7296fd5b832e8cc2ad17`.
//! Binaries built from source report a 7-character short commit instead of a
//! release number; those can't be range-checked and are treated as
//! satisfying every range.

use crate::{Error, Result};
use regex::Regex;
use semver::{Version, VersionReq};
use std::sync::LazyLock;

static BANNER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\sv?([0-9a-f]{7}\b|[0-9]+(?:\.[0-9]+)*)").unwrap()
});

static SHORT_HASH: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[0-9a-f]{7}$").unwrap()
});

/// Extract the version token from a `buildx version` (or `buildkitd --version`) banner.
///
/// # Errors
///
/// Returns [`Error::Parse`] carrying the raw banner when no token is found.
pub fn parse_version(banner: &str) -> Result<String> {
    BANNER_VERSION
        .captures(banner)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::parse("buildx version", banner.trim()))
}

/// Whether `version` is a 7-character hex short hash.
#[must_use]
pub fn is_short_hash(version: &str) -> bool {
    SHORT_HASH.is_match(version)
}

/// Check `version` against a semver range such as `>=0.3.0`.
///
/// Short hashes always satisfy. Anything that isn't valid semver (after
/// padding missing minor/patch components) never does.
#[must_use]
pub fn satisfies(version: &str, range: &str) -> bool {
    if is_short_hash(version) {
        return true;
    }
    let Ok(req) = VersionReq::parse(range) else {
        return false;
    };
    coerce(version).is_some_and(|v| req.matches(&v))
}

/// Lenient semver parse: strips a leading `v` and pads `0.10` to `0.10.0`.
fn coerce(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }
    let mut padded = parts.clone();
    padded.resize(3, "0");
    Version::parse(&padded.join(".")).ok()
}

/// Feature gates tied to the buildx release that introduced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `--driver-opt` and `--buildkitd-flags` on `create` (buildx 0.3.0).
    pub supports_driver_opts: bool,
    /// `inspect --builder <name>` (buildx 0.4.0).
    pub supports_builder_flag: bool,
    /// The kubernetes driver needs `--node` on append before buildx 0.11.0.
    pub requires_explicit_append_node_name: bool,
}

impl Capabilities {
    /// Resolve the gates for a parsed buildx version token.
    #[must_use]
    pub fn for_version(version: &str) -> Self {
        Self {
            supports_driver_opts: satisfies(version, ">=0.3.0"),
            supports_builder_flag: satisfies(version, ">=0.4.0"),
            requires_explicit_append_node_name: satisfies(version, "<0.11.0"),
        }
    }
}
