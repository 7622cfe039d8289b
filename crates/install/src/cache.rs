//! Tool cache for buildx binaries.
//!
//! Mirrors the hosted runner tool cache layout so binaries are shared with
//! other actions on the same runner:
//!
//! ```text
//! $RUNNER_TOOL_CACHE/
//! └── buildx/
//!     └── 0.11.2/
//!         └── amd64/
//!             └── docker-buildx
//! ```

use setup_buildx_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Versioned binary cache keyed by `(tool, version, arch)`.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Cache rooted at the runner tool cache.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(setup_buildx_core::paths::tool_cache_dir()?))
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one cached tool version.
    #[must_use]
    pub fn tool_dir(&self, tool: &str, version: &str, arch: &str) -> PathBuf {
        self.root.join(tool).join(version).join(arch)
    }

    /// Cached binary, if present.
    #[must_use]
    pub fn find(&self, tool: &str, version: &str, arch: &str, file_name: &str) -> Option<PathBuf> {
        let path = self.tool_dir(tool, version, arch).join(file_name);
        if path.is_file() {
            trace!(tool, version, ?path, "Cache hit");
            Some(path)
        } else {
            trace!(tool, version, "Cache miss");
            None
        }
    }

    /// Copy `source` into the cache as `file_name`.
    pub fn store(
        &self,
        tool: &str,
        version: &str,
        arch: &str,
        file_name: &str,
        source: &Path,
    ) -> Result<PathBuf> {
        let dir = self.tool_dir(tool, version, arch);
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir))?;
        let dest = dir.join(file_name);
        std::fs::copy(source, &dest).map_err(|e| Error::io(e, &dest))?;
        debug!(tool, version, ?dest, "Stored binary in cache");
        Ok(dest)
    }
}
