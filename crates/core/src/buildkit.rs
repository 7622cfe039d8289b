//! BuildKit daemons behind `docker-container` builder nodes.

use crate::builder::Node;
use crate::docker::Docker;
use crate::exec::CommandRunner;
use crate::version::parse_version;
use crate::Result;

/// Prefix buildx gives the containers running buildkitd.
pub const CONTAINER_PREFIX: &str = "buildx_buildkit_";

/// Container running buildkitd for a node.
#[must_use]
pub fn container_name(node_name: &str) -> String {
    format!("{CONTAINER_PREFIX}{node_name}")
}

/// BuildKit version of a node.
///
/// Uses the version reported by `buildx inspect` when present and asks the
/// node's container otherwise. `Ok(None)` for a node without a name.
pub async fn node_version(
    docker: &Docker,
    runner: &dyn CommandRunner,
    node: &Node,
) -> Result<Option<String>> {
    if let Some(version) = node.buildkit.as_deref().filter(|v| !v.is_empty()) {
        return Ok(Some(version.to_string()));
    }
    let Some(name) = node.name.as_deref() else {
        return Ok(None);
    };
    let banner = docker
        .exec_in(runner, &container_name(name), &["buildkitd", "--version"])
        .await?;
    parse_version(&banner).map(|v| Some(format!("v{v}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExecOutput;
    use crate::test_utils::ScriptedRunner;

    #[tokio::test]
    async fn test_version_from_inspect() {
        let runner = ScriptedRunner::new();
        let node = Node {
            buildkit: Some("v0.11.6".into()),
            ..Node::named("b0")
        };
        let version = node_version(&Docker::default(), &runner, &node).await.unwrap();
        assert_eq!(version.as_deref(), Some("v0.11.6"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_version_from_container() {
        let runner = ScriptedRunner::new().on(
            "docker exec buildx_buildkit_b0 buildkitd --version",
            ExecOutput::ok(
                "buildkitd github.com/moby/buildkit v0.12.2 567a99433ca23402d5e9b9f9124005d2e59b8861\n",
            ),
        );
        let version = node_version(&Docker::default(), &runner, &Node::named("b0"))
            .await
            .unwrap();
        assert_eq!(version.as_deref(), Some("v0.12.2"));
    }

    #[tokio::test]
    async fn test_unnamed_node() {
        let version = node_version(&Docker::default(), &ScriptedRunner::new(), &Node::default())
            .await
            .unwrap();
        assert!(version.is_none());
    }

    #[test]
    fn test_container_name() {
        assert_eq!(container_name("builder-1230"), "buildx_buildkit_builder-1230");
    }
}
