//! State handed from the main phase to the post phase.
//!
//! The runner persists each entry as a string and exposes it to the post
//! phase as `STATE_<key>`.

use std::path::PathBuf;

/// Scalars recorded during setup and consumed during teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Builder name.
    pub builder_name: String,
    /// Builder driver.
    pub builder_driver: String,
    /// Buildx ran without the docker CLI.
    pub standalone: bool,
    /// BuildKit container of the first node, for `docker-container` builders.
    pub container_name: String,
    /// Directory holding node TLS material.
    pub certs_dir: Option<PathBuf>,
    /// Docker context created for this run.
    pub tmp_docker_context: String,
    /// Print BuildKit logs on teardown.
    pub debug: bool,
    /// Remove the builder on teardown.
    pub cleanup: bool,
    /// Keep BuildKit state when removing the builder.
    pub keep_state: bool,
}

const BUILDER_NAME: &str = "builderName";
const BUILDER_DRIVER: &str = "builderDriver";
const STANDALONE: &str = "standalone";
const CONTAINER_NAME: &str = "containerName";
const CERTS_DIR: &str = "certsDir";
const TMP_DOCKER_CONTEXT: &str = "tmpDockerContext";
const IS_DEBUG: &str = "isDebug";
const CLEANUP: &str = "cleanup";
const KEEP_STATE: &str = "keepState";

impl RunState {
    /// Entries to persist. Unset strings and false debug are left out.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            (STANDALONE, self.standalone.to_string()),
            (CLEANUP, self.cleanup.to_string()),
            (KEEP_STATE, self.keep_state.to_string()),
        ];
        let strings = [
            (BUILDER_NAME, self.builder_name.clone()),
            (BUILDER_DRIVER, self.builder_driver.clone()),
            (CONTAINER_NAME, self.container_name.clone()),
            (
                CERTS_DIR,
                self.certs_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            (TMP_DOCKER_CONTEXT, self.tmp_docker_context.clone()),
        ];
        entries.extend(strings.into_iter().filter(|(_, v)| !v.is_empty()));
        if self.debug {
            entries.push((IS_DEBUG, "true".to_string()));
        }
        entries
    }

    /// Load from `STATE_<key>` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(format!("STATE_{key}")).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Booleans match `true` case-insensitively; `isDebug` is on when set at all.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str| lookup(key).unwrap_or_default();
        let flag = |key: &str| string(key).trim().eq_ignore_ascii_case("true");
        Self {
            builder_name: string(BUILDER_NAME),
            builder_driver: string(BUILDER_DRIVER),
            standalone: flag(STANDALONE),
            container_name: string(CONTAINER_NAME),
            certs_dir: Some(string(CERTS_DIR))
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            tmp_docker_context: string(TMP_DOCKER_CONTEXT),
            debug: !string(IS_DEBUG).is_empty(),
            cleanup: flag(CLEANUP),
            keep_state: flag(KEEP_STATE),
        }
    }
}
