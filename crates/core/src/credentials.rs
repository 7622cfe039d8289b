//! TLS client material for remote BuildKit nodes.
//!
//! Material is supplied per node index through
//! `BUILDER_NODE_<index>_AUTH_TLS_{CACERT,CERT,KEY}`; index 0 is the node
//! created with the builder, appended nodes count from 1.

use crate::inputs::Driver;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Prefix of the per-node credential variables.
pub const ENV_PREFIX: &str = "BUILDER_NODE";

/// PEM blobs for one node. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// CA certificate.
    pub cacert: String,
    /// Client certificate.
    pub cert: String,
    /// Client key.
    pub key: String,
}

impl TlsMaterial {
    /// No material at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cacert.is_empty() && self.cert.is_empty() && self.key.is_empty()
    }

    fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("cacert", self.cacert.as_str()),
            ("cert", self.cert.as_str()),
            ("key", self.key.as_str()),
        ]
    }
}

/// TLS material keyed by node index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSource {
    nodes: HashMap<usize, TlsMaterial>,
}

impl CredentialSource {
    /// Read material for nodes `0..=max_index` from the process environment.
    #[must_use]
    pub fn from_env(max_index: usize) -> Self {
        Self::from_lookup(max_index, |name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(max_index: usize, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |index: usize, kind: &str| {
            lookup(&format!("{ENV_PREFIX}_{index}_AUTH_TLS_{kind}")).unwrap_or_default()
        };
        let nodes = (0..=max_index)
            .map(|index| {
                (
                    index,
                    TlsMaterial {
                        cacert: var(index, "CACERT"),
                        cert: var(index, "CERT"),
                        key: var(index, "KEY"),
                    },
                )
            })
            .filter(|(_, material)| !material.is_empty())
            .collect();
        Self { nodes }
    }

    /// Set material for one node.
    #[must_use]
    pub fn with_node(mut self, index: usize, material: TlsMaterial) -> Self {
        self.nodes.insert(index, material);
        self
    }

    /// Material for a node, if any was provided.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TlsMaterial> {
        self.nodes.get(&index).filter(|m| !m.is_empty())
    }
}

/// Write the TLS material for `node_index` under `creds_dir` and return the
/// matching driver options.
///
/// Only `tcp://` endpoints are eligible; anything else (including an
/// unparseable endpoint) yields no options and writes nothing. Files are
/// named `<kind>_<host>[-<port>].pem`. The options are returned only for the
/// `remote` driver; other drivers get the files but no options.
///
/// # Errors
///
/// Returns [`Error::Io`] if a file cannot be written.
pub fn set_credentials(
    creds_dir: &Path,
    node_index: usize,
    driver: &Driver,
    endpoint: &str,
    source: &CredentialSource,
) -> Result<Vec<String>> {
    let Ok(url) = Url::parse(endpoint) else {
        return Ok(Vec::new());
    };
    if url.scheme() != "tcp" {
        return Ok(Vec::new());
    }
    let Some(material) = source.get(node_index) else {
        return Ok(Vec::new());
    };

    let mut host = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        host = format!("{host}-{port}");
    }

    std::fs::create_dir_all(creds_dir).map_err(|e| Error::io(e, creds_dir))?;
    let mut driver_opts = Vec::new();
    for (kind, pem) in material.entries() {
        if pem.is_empty() {
            continue;
        }
        let path = creds_dir.join(format!("{kind}_{host}.pem"));
        std::fs::write(&path, pem).map_err(|e| Error::io(e, &path))?;
        debug!(path = %path.display(), "Wrote {kind}");
        driver_opts.push(format!("{kind}={}", path.display()));
    }

    if *driver != Driver::Remote {
        return Ok(Vec::new());
    }
    Ok(driver_opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_material() -> TlsMaterial {
        TlsMaterial {
            cacert: "moby/buildkit:master cacert".into(),
            cert: "moby/buildkit:master cert".into(),
            key: "moby/buildkit:master key".into(),
        }
    }

    #[test]
    fn test_non_tcp_endpoint_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = CredentialSource::default().with_node(0, full_material());
        for endpoint in ["mycontext", "docker-container://foo", "unix:///var/run/docker.sock"] {
            let opts = set_credentials(tmp.path(), 0, &Driver::Remote, endpoint, &source).unwrap();
            assert!(opts.is_empty(), "{endpoint}");
        }
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_tcp_non_remote_writes_files_but_returns_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = CredentialSource::default().with_node(1, full_material());
        let opts = set_credentials(
            tmp.path(),
            1,
            &Driver::DockerContainer,
            "tcp://graviton2:1234",
            &source,
        )
        .unwrap();
        assert!(opts.is_empty());
        for kind in ["cacert", "cert", "key"] {
            let path = tmp.path().join(format!("{kind}_graviton2-1234.pem"));
            assert_eq!(
                std::fs::read_to_string(&path).unwrap(),
                format!("moby/buildkit:master {kind}")
            );
        }
    }

    #[test]
    fn test_tcp_remote_returns_options() {
        let tmp = tempfile::tempdir().unwrap();
        let source = CredentialSource::default().with_node(
            0,
            TlsMaterial {
                cacert: "ca".into(),
                ..TlsMaterial::default()
            },
        );
        let opts =
            set_credentials(tmp.path(), 0, &Driver::Remote, "tcp://graviton2", &source).unwrap();
        let expected = tmp.path().join("cacert_graviton2.pem");
        assert_eq!(opts, vec![format!("cacert={}", expected.display())]);
    }

    #[test]
    fn test_no_material_for_index() {
        let tmp = tempfile::tempdir().unwrap();
        let source = CredentialSource::default().with_node(0, full_material());
        let opts =
            set_credentials(tmp.path(), 3, &Driver::Remote, "tcp://graviton2:1234", &source)
                .unwrap();
        assert!(opts.is_empty());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<String, String> = [
            ("BUILDER_NODE_0_AUTH_TLS_CACERT", "ca0"),
            ("BUILDER_NODE_2_AUTH_TLS_KEY", "key2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let source = CredentialSource::from_lookup(3, |name| vars.get(name).cloned());
        assert_eq!(source.get(0).map(|m| m.cacert.as_str()), Some("ca0"));
        assert!(source.get(1).is_none());
        assert_eq!(source.get(2).map(|m| m.key.as_str()), Some("key2"));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("BUILDER_NODE_1_AUTH_TLS_CERT", Some("cert1")),
                ("BUILDER_NODE_1_AUTH_TLS_KEY", Some("key1")),
            ],
            || {
                let source = CredentialSource::from_env(1);
                let material = source.get(1).unwrap();
                assert_eq!(material.cert, "cert1");
                assert_eq!(material.key, "key1");
                assert!(material.cacert.is_empty());
            },
        );
    }
}
