//! Builder and node model.
//!
//! The same [`Node`] shape is used for nodes parsed from `buildx inspect`
//! and for nodes requested through the `append` input, so serialization uses
//! the kebab-case keys of the action's YAML/JSON surface.

use serde::{Deserialize, Serialize};

/// One worker attached to a builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Node {
    /// Node name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Endpoint URL or docker context name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Driver options as `key=value` strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_opts: Option<Vec<String>>,
    /// Node status reported by buildx (e.g. `running`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Flags passed to buildkitd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildkitd_flags: Option<String>,
    /// BuildKit version running on the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildkit: Option<String>,
    /// Comma-separated platform list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<String>,
}

impl Node {
    /// Create a node with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether any field has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Platforms as a list, empty when unset.
    #[must_use]
    pub fn platform_list(&self) -> Vec<&str> {
        self.platforms
            .as_deref()
            .map(|p| p.split(',').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// A builder instance as reported by `buildx inspect`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Builder {
    /// Builder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Driver shared by every node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Nodes in creation order.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Builder {
    /// The primary node, used for the single-value outputs.
    #[must_use]
    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Union of every node's platforms, first-seen order, no duplicates.
    #[must_use]
    pub fn platforms(&self) -> Vec<String> {
        let mut reduced: Vec<String> = Vec::new();
        for platform in self.nodes.iter().flat_map(Node::platform_list) {
            if !reduced.iter().any(|p| p == platform) {
                reduced.push(platform.to_string());
            }
        }
        reduced
    }
}

/// Parse the `append` input: a YAML list of nodes.
///
/// An empty or whitespace-only descriptor yields no nodes.
///
/// # Errors
///
/// Returns [`crate::Error::Yaml`] when the descriptor is not a list of nodes.
pub fn parse_append_nodes(descriptor: &str) -> crate::Result<Vec<Node>> {
    if descriptor.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(descriptor)?)
}
