//! Main then post phase against a scripted docker CLI and an in-memory
//! release feed, passing state through the runner's state file.

use async_trait::async_trait;
use setup_buildx::actions::Actions;
use setup_buildx::{Context, Layout, setup, teardown};
use setup_buildx_core::test_utils::ScriptedRunner;
use setup_buildx_core::{CredentialSource, Docker, ExecOutput, Inputs, Result, RunState};
use setup_buildx_install::{Installer, Platform, Release, ReleaseClient, ToolCache};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const BANNER: &str = "github.com/docker/buildx v0.11.2 9872040b6626fb7d87ef7296fd5b832e8cc2ad17\n";

const INSPECT: &str = "Name:          builder-it
Driver:        docker-container
Last Activity: 2023-06-13 13:37:00 +0000 UTC

Nodes:
Name:                  builder-it0
Endpoint:              unix:///var/run/docker.sock
Driver Options:        image=\"moby/buildkit:master\" network=\"host\"
Status:                running
BuildKit daemon flags: --allow-insecure-entitlement=network.host
BuildKit version:      v0.11.6
Platforms:             linux/amd64, linux/amd64/v2, linux/386

Name:                  aws_graviton2
Endpoint:              tcp://graviton2:1234
Status:                running
BuildKit version:      v0.11.6
Platforms:             linux/arm64*, linux/arm/v7
";

struct Feed;

#[async_trait]
impl ReleaseClient for Feed {
    async fn releases(&self, _feed_url: &str) -> Result<HashMap<String, Release>> {
        let release = Release {
            id: 115_224_371,
            tag_name: "v0.11.2".into(),
            html_url: "https://github.com/docker/buildx/releases/tag/v0.11.2".into(),
        };
        Ok(HashMap::from([("latest".to_string(), release)]))
    }

    async fn download(&self, _url: &str, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest.parent().expect("download has a parent"))?;
        std::fs::write(dest, b"#!/bin/sh\n")?;
        Ok(())
    }
}

fn context(runner: Arc<ScriptedRunner>, root: &Path) -> Context {
    Context {
        runner,
        actions: Actions::default()
            .with_output_file(root.join("github/output"))
            .with_state_file(root.join("github/state"))
            .with_writer(std::io::sink()),
        installer: Installer::new(
            Box::new(Feed),
            ToolCache::new(root.join("toolcache")),
            root.join("tmp"),
        )
        .with_platform(Platform::from_rust("linux", "x86_64", None)),
        docker: Docker::default(),
        layout: Layout {
            docker_config_dir: root.join(".docker"),
            certs_dir: root.join(".docker/buildx/certs"),
            scratch_dir: root.join("tmp"),
        },
        credentials: CredentialSource::default(),
    }
}

/// Read a `name<<delimiter` command file; later entries win.
fn read_command_file(path: &Path) -> HashMap<String, String> {
    let content = std::fs::read_to_string(path).expect("command file exists");
    let mut entries = HashMap::new();
    let mut lines = content.lines();
    while let Some(header) = lines.next() {
        let (name, delimiter) = header.split_once("<<").expect("delimited entry");
        let value: Vec<&str> = lines.by_ref().take_while(|l| *l != delimiter).collect();
        entries.insert(name.to_string(), value.join("\n"));
    }
    entries
}

#[tokio::test]
async fn test_main_then_post() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let runner = Arc::new(
        ScriptedRunner::new()
            .with_program("docker")
            .once(
                "docker buildx version",
                ExecOutput::failure(1, "docker: 'buildx' is not a docker command."),
            )
            .on("docker buildx version", ExecOutput::ok(BANNER))
            .on("docker buildx inspect builder-it", ExecOutput::ok(INSPECT)),
    );
    let ctx = context(runner.clone(), root);
    let inputs = Inputs {
        name: "builder-it".into(),
        driver_opts: vec!["image=moby/buildkit:master".into(), "network=host".into()],
        append: "- name: aws_graviton2\n  endpoint: tcp://graviton2:1234\n  platforms: linux/arm64\n"
            .into(),
        keep_state: true,
        ..Inputs::default()
    };

    let report = setup(&ctx, inputs).await.expect("main phase succeeds");

    let plugin = root.join(".docker/cli-plugins/docker-buildx");
    assert!(plugin.is_file(), "buildx installed as docker plugin");
    assert!(root.join("toolcache/buildx/0.11.2/amd64/docker-buildx").is_file());
    assert_eq!(report.builder.nodes.len(), 2);

    assert!(runner.called(
        "docker buildx create --name builder-it --driver docker-container \
--driver-opt image=moby/buildkit:master --driver-opt network=host"
    ));
    assert!(runner.called(
        "docker buildx create --name builder-it --append --node aws_graviton2 \
--platform linux/arm64 tcp://graviton2:1234"
    ));

    let outputs = read_command_file(&root.join("github/output"));
    assert_eq!(outputs["name"], "builder-it");
    assert_eq!(outputs["driver"], "docker-container");
    assert_eq!(
        outputs["platforms"],
        "linux/amd64,linux/amd64/v2,linux/386,linux/arm64"
    );
    assert_eq!(outputs["endpoint"], "unix:///var/run/docker.sock");
    assert_eq!(outputs["status"], "running");
    assert_eq!(outputs["flags"], "--allow-insecure-entitlement=network.host");
    let nodes: serde_json::Value = serde_json::from_str(&outputs["nodes"]).expect("nodes json");
    assert_eq!(nodes[0]["driver-opts"][1], "network=host");
    assert_eq!(nodes[1]["platforms"], "linux/arm64");
    assert!(nodes[1].get("driver-opts").is_none());

    let saved = read_command_file(&root.join("github/state"));
    let state = RunState::from_lookup(|key| saved.get(key).cloned());
    assert_eq!(state, report.state);
    assert_eq!(state.container_name, "buildx_buildkit_builder-it0");
    assert!(state.keep_state);

    teardown(&ctx, &state).await;
    assert!(runner.called("docker buildx rm --keep-state builder-it"));
    assert!(!root.join(".docker/buildx/certs").exists());
}

#[tokio::test]
async fn test_post_without_main_state_does_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let runner = Arc::new(ScriptedRunner::new().with_program("docker"));
    let ctx = context(runner.clone(), tmp.path());

    teardown(&ctx, &RunState::from_lookup(|_| None)).await;
    assert!(runner.calls().is_empty());
}
