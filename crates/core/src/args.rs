//! Argument vectors for `buildx create`, `create --append` and `inspect`.
//!
//! Every vector is a pure function of the inputs and the buildx version,
//! except for the kubernetes node name generated for old buildx releases.

use crate::builder::Node;
use crate::inputs::{ConfigSource, Driver, Inputs};
use crate::version::Capabilities;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Flags given to buildkitd when the user passes none.
pub const DEFAULT_BUILDKITD_FLAGS: &str =
    "--allow-insecure-entitlement security.insecure --allow-insecure-entitlement network.host";

/// File name the buildkitd config is materialized to.
pub const BUILDKITD_CONFIG_FILE: &str = "buildkitd.toml";

/// Resolve the `--buildkitd-flags` value for a driver.
///
/// `remote` never gets flags. Explicit flags pass through for every other
/// driver; the defaults are only injected for drivers that run buildkitd.
#[must_use]
pub fn buildkitd_flags(driver: &Driver, explicit: Option<&str>) -> Option<String> {
    if !driver.accepts_buildkitd_flags() {
        return None;
    }
    match explicit.map(str::trim).filter(|f| !f.is_empty()) {
        Some(flags) => Some(flags.to_string()),
        None if driver.supports_buildkitd_flags() => Some(DEFAULT_BUILDKITD_FLAGS.to_string()),
        None => None,
    }
}

/// Write the buildkitd config to `<dir>/buildkitd.toml` and return its path.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when the file form points at a missing file,
/// or an I/O error when the copy cannot be written.
pub fn materialize_config(source: &ConfigSource, dir: &Path) -> Result<PathBuf> {
    let content = match source {
        ConfigSource::File(path) => {
            if !path.is_file() {
                return Err(Error::not_found("buildkitd config file", path.clone()));
            }
            std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?
        }
        ConfigSource::Inline(text) => text.clone(),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))?;
    let target = dir.join(BUILDKITD_CONFIG_FILE);
    std::fs::write(&target, content).map_err(|e| Error::io(e, &target))?;
    debug!(path = %target.display(), "Materialized buildkitd config");
    Ok(target)
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

/// Arguments creating the builder and its first node.
///
/// A buildkitd config, when given, is written under `scratch_dir`.
///
/// # Errors
///
/// Fails only while materializing the buildkitd config.
pub fn create_args(inputs: &Inputs, version: &str, scratch_dir: &Path) -> Result<Vec<String>> {
    let caps = Capabilities::for_version(version);
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        inputs.name.clone(),
        "--driver".to_string(),
        inputs.driver.to_string(),
    ];

    if caps.supports_driver_opts {
        for opt in &inputs.driver_opts {
            push_pair(&mut args, "--driver-opt", opt);
        }
        if let Some(flags) = buildkitd_flags(&inputs.driver, Some(&inputs.buildkitd_flags)) {
            push_pair(&mut args, "--buildkitd-flags", flags);
        }
    }
    if !inputs.platforms.is_empty() {
        push_pair(&mut args, "--platform", inputs.platforms.join(","));
    }
    if inputs.use_builder {
        args.push("--use".to_string());
    }
    if inputs.driver.supports_buildkitd_flags()
        && let Some(source) = inputs.config_source()
    {
        let path = materialize_config(&source, scratch_dir)?;
        push_pair(&mut args, "--config", path.display().to_string());
    }
    if !inputs.endpoint.is_empty() {
        args.push(inputs.endpoint.clone());
    }
    Ok(args)
}

/// Arguments appending `node` to the builder.
#[must_use]
pub fn append_args(inputs: &Inputs, node: &Node, version: &str) -> Vec<String> {
    let caps = Capabilities::for_version(version);
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        inputs.name.clone(),
        "--append".to_string(),
    ];

    if let Some(name) = &node.name {
        push_pair(&mut args, "--node", name);
    } else if inputs.driver == Driver::Kubernetes && caps.requires_explicit_append_node_name {
        push_pair(&mut args, "--node", format!("node-{}", Uuid::new_v4()));
    }
    if let Some(opts) = &node.driver_opts
        && caps.supports_driver_opts
    {
        for opt in opts {
            push_pair(&mut args, "--driver-opt", opt);
        }
        if let Some(flags) = buildkitd_flags(&inputs.driver, node.buildkitd_flags.as_deref()) {
            push_pair(&mut args, "--buildkitd-flags", flags);
        }
    }
    if let Some(platforms) = &node.platforms {
        push_pair(&mut args, "--platform", platforms);
    }
    if let Some(endpoint) = &node.endpoint {
        args.push(endpoint.clone());
    }
    args
}

/// Arguments bootstrapping and inspecting the builder.
#[must_use]
pub fn inspect_args(inputs: &Inputs, version: &str) -> Vec<String> {
    let mut args = vec!["inspect".to_string(), "--bootstrap".to_string()];
    if Capabilities::for_version(version).supports_builder_flag {
        push_pair(&mut args, "--builder", inputs.name.clone());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    fn inputs(driver: Driver) -> Inputs {
        Inputs {
            name: "mybuilder".into(),
            driver,
            ..Inputs::default()
        }
    }

    #[test]
    fn test_buildkitd_flags_policy() {
        assert_eq!(buildkitd_flags(&Driver::Remote, Some("--debug")), None);
        assert_eq!(buildkitd_flags(&Driver::Remote, None), None);
        assert_eq!(
            buildkitd_flags(&Driver::Cloud, Some("--debug")).as_deref(),
            Some("--debug")
        );
        assert_eq!(buildkitd_flags(&Driver::Cloud, Some("")), None);
        assert_eq!(
            buildkitd_flags(&Driver::Kubernetes, Some("  ")).as_deref(),
            Some(DEFAULT_BUILDKITD_FLAGS)
        );
        assert_eq!(
            buildkitd_flags(&Driver::Other("custom".into()), Some("--debug")).as_deref(),
            Some("--debug")
        );
    }

    #[test]
    fn test_create_driver_opts_gated_on_version() {
        let mut inputs = inputs(Driver::DockerContainer);
        inputs.driver_opts = vec!["image=moby/buildkit:master".into()];
        let tmp = tempfile::tempdir().unwrap();

        let old = create_args(&inputs, "0.2.2", tmp.path()).unwrap();
        assert_eq!(
            old,
            s(&["create", "--name", "mybuilder", "--driver", "docker-container", "--use"])
        );

        let new = create_args(&inputs, "0.3.0", tmp.path()).unwrap();
        assert!(new.contains(&"--driver-opt".to_string()));
        assert!(new.contains(&"--buildkitd-flags".to_string()));
    }

    #[test]
    fn test_create_config_skipped_for_remote() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = inputs(Driver::Remote);
        inputs.buildkitd_config_inline = "debug = true".into();
        inputs.endpoint = "tls://foo:1234".into();
        let args = create_args(&inputs, "0.12.0", tmp.path()).unwrap();
        assert!(!args.contains(&"--config".to_string()));
        assert!(!tmp.path().join(BUILDKITD_CONFIG_FILE).exists());
    }

    #[test]
    fn test_create_missing_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = inputs(Driver::DockerContainer);
        inputs.buildkitd_config = tmp.path().join("nope.toml").display().to_string();
        let err = create_args(&inputs, "0.12.0", tmp.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_create_copies_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("my.toml");
        std::fs::write(&src, "debug = true\n").unwrap();
        let scratch = tmp.path().join("scratch");
        let mut inputs = inputs(Driver::DockerContainer);
        inputs.buildkitd_config = src.display().to_string();
        inputs.buildkitd_config_inline = "ignored = true".into();

        let args = create_args(&inputs, "0.12.0", &scratch).unwrap();
        let target = scratch.join(BUILDKITD_CONFIG_FILE);
        assert_eq!(args[args.len() - 1], target.display().to_string());
        assert_eq!(std::fs::read_to_string(target).unwrap(), "debug = true\n");
    }

    #[test]
    fn test_append_named_node() {
        let inputs = inputs(Driver::DockerContainer);
        let node = Node {
            endpoint: Some("tcp://graviton2:1234".into()),
            platforms: Some("linux/arm64".into()),
            ..Node::named("aws_graviton2")
        };
        assert_eq!(
            append_args(&inputs, &node, "0.10.0"),
            s(&[
                "create",
                "--name",
                "mybuilder",
                "--append",
                "--node",
                "aws_graviton2",
                "--platform",
                "linux/arm64",
                "tcp://graviton2:1234",
            ])
        );
    }

    #[test]
    fn test_append_kubernetes_generates_node_name_before_0_11() {
        let inputs = inputs(Driver::Kubernetes);
        let old = append_args(&inputs, &Node::default(), "0.10.5");
        assert_eq!(old[4], "--node");
        assert!(old[5].starts_with("node-"));

        let new = append_args(&inputs, &Node::default(), "0.11.0");
        assert_eq!(new, s(&["create", "--name", "mybuilder", "--append"]));

        let other = append_args(&self::inputs(Driver::DockerContainer), &Node::default(), "0.10.5");
        assert!(!other.contains(&"--node".to_string()));
    }

    #[test]
    fn test_append_flags_need_driver_opts() {
        let inputs = inputs(Driver::DockerContainer);
        let without = Node {
            buildkitd_flags: Some("--debug".into()),
            ..Node::named("n1")
        };
        assert!(!append_args(&inputs, &without, "0.12.0").contains(&"--debug".to_string()));

        let with = Node {
            driver_opts: Some(vec!["network=host".into()]),
            ..without
        };
        let args = append_args(&inputs, &with, "0.12.0");
        assert!(args.ends_with(&s(&["--driver-opt", "network=host", "--buildkitd-flags", "--debug"])));
        assert!(!append_args(&inputs, &with, "0.2.0").contains(&"--driver-opt".to_string()));
    }

    #[test]
    fn test_inspect_args() {
        let inputs = inputs(Driver::DockerContainer);
        assert_eq!(inspect_args(&inputs, "0.3.1"), s(&["inspect", "--bootstrap"]));
        assert_eq!(
            inspect_args(&inputs, "0.4.0"),
            s(&["inspect", "--bootstrap", "--builder", "mybuilder"])
        );
        assert_eq!(
            inspect_args(&inputs, "f117971"),
            s(&["inspect", "--bootstrap", "--builder", "mybuilder"])
        );
    }
}
