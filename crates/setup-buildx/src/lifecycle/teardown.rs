//! Post phase: remove what the main phase left behind.
//!
//! Every step logs a warning on failure and the next one still runs.

use super::Context;
use setup_buildx_core::buildx::rm_args;
use setup_buildx_core::{Buildx, Error, ExecOptions, RunState};
use tracing::info;

/// Run the post phase for the state saved by the main phase.
pub async fn teardown(ctx: &Context, state: &RunState) {
    let runner = ctx.runner();

    if state.debug && !state.container_name.is_empty() {
        let logs = ctx
            .actions
            .group(
                "BuildKit container logs",
                ctx.docker.print_logs(runner, &state.container_name),
            )
            .await;
        if let Err(e) = logs {
            ctx.warn(&format!("Failed to print BuildKit logs: {e}"));
        }
    }

    let buildx = if state.standalone {
        Buildx::standalone()
    } else {
        Buildx::plugin()
    };

    let name = state.builder_name.as_str();
    if !state.cleanup {
        info!("Cleanup disabled, keeping builder");
    } else if state.builder_driver != "docker" && !name.is_empty() {
        if buildx.exists(runner, name).await {
            let removed = ctx
                .actions
                .group(
                    "Removing builder",
                    buildx.run(runner, &rm_args(name, state.keep_state), ExecOptions::visible()),
                )
                .await;
            if let Err(e) = removed {
                ctx.warn(&e.to_string());
            }
        } else {
            info!("Builder {name} does not exist, nothing to remove");
        }
    }

    if !state.tmp_docker_context.is_empty() {
        let removed = ctx
            .actions
            .group(
                "Removing temp docker context",
                ctx.docker.remove_context(runner, &state.tmp_docker_context),
            )
            .await;
        if let Err(e) = removed {
            ctx.warn(&e.to_string());
        }
    }

    if let Some(certs_dir) = &state.certs_dir
        && certs_dir.exists()
    {
        let removed = ctx
            .actions
            .group("Removing builder certs", async {
                tokio::fs::remove_dir_all(certs_dir)
                    .await
                    .map_err(|e| Error::io(e, certs_dir))
            })
            .await;
        if let Err(e) = removed {
            ctx.warn(&e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Actions;
    use crate::lifecycle::Layout;
    use setup_buildx_core::test_utils::ScriptedRunner;
    use setup_buildx_core::{CredentialSource, Docker, ExecOutput, Result};
    use setup_buildx_install::{HttpReleaseClient, Installer, ToolCache};
    use std::path::Path;
    use std::sync::Arc;

    fn context(runner: Arc<ScriptedRunner>, root: &Path) -> Result<Context> {
        Ok(Context {
            runner,
            actions: Actions::default().with_writer(std::io::sink()),
            installer: Installer::new(
                Box::new(HttpReleaseClient::new()?),
                ToolCache::new(root.join("cache")),
                root.join("scratch"),
            ),
            docker: Docker::default(),
            layout: Layout {
                docker_config_dir: root.join(".docker"),
                certs_dir: root.join("certs"),
                scratch_dir: root.join("scratch"),
            },
            credentials: CredentialSource::default(),
        })
    }

    fn builder_state(root: &Path) -> RunState {
        RunState {
            builder_name: "builder-1".into(),
            builder_driver: "docker-container".into(),
            container_name: "buildx_buildkit_builder-10".into(),
            certs_dir: Some(root.join("certs")),
            cleanup: true,
            ..RunState::default()
        }
    }

    #[tokio::test]
    async fn test_removes_builder_and_certs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("certs")).unwrap();
        std::fs::write(tmp.path().join("certs/cert_foo.pem"), "pem").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(runner.clone(), tmp.path()).unwrap();
        let state = RunState {
            keep_state: true,
            ..builder_state(tmp.path())
        };

        teardown(&ctx, &state).await;

        assert_eq!(
            runner.calls(),
            vec![
                "docker buildx inspect builder-1",
                "docker buildx rm --keep-state builder-1",
            ]
        );
        assert!(!tmp.path().join("certs").exists());
    }

    #[tokio::test]
    async fn test_missing_builder_is_not_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().on(
            "docker buildx inspect builder-1",
            ExecOutput::failure(1, "ERROR: no builder \"builder-1\" found"),
        ));
        let ctx = context(runner.clone(), tmp.path()).unwrap();

        teardown(&ctx, &builder_state(tmp.path())).await;
        assert!(!runner.called("docker buildx rm"));
    }

    #[tokio::test]
    async fn test_cleanup_disabled_keeps_builder_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("certs")).unwrap();
        std::fs::write(tmp.path().join("certs/key_graviton2-1234.pem"), "key").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(runner.clone(), tmp.path()).unwrap();
        let state = RunState {
            debug: true,
            cleanup: false,
            tmp_docker_context: "builder-ctx".into(),
            ..builder_state(tmp.path())
        };

        teardown(&ctx, &state).await;
        assert_eq!(
            runner.calls(),
            vec![
                "docker logs buildx_buildkit_builder-10",
                "docker context rm -f builder-ctx",
            ]
        );
        assert!(!tmp.path().join("certs").exists(), "TLS keys are always removed");
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_steps() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("certs")).unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("docker buildx rm", ExecOutput::failure(1, "ERROR: device busy"))
                .on("docker context rm", ExecOutput::failure(1, "context in use")),
        );
        let ctx = context(runner.clone(), tmp.path()).unwrap();
        let state = RunState {
            tmp_docker_context: "builder-ctx".into(),
            ..builder_state(tmp.path())
        };

        teardown(&ctx, &state).await;
        assert!(runner.called("docker buildx rm builder-1"));
        assert!(runner.called("docker context rm -f builder-ctx"));
        assert!(!tmp.path().join("certs").exists());
    }

    #[tokio::test]
    async fn test_docker_driver_and_standalone() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(runner.clone(), tmp.path()).unwrap();

        let docker_driver = RunState {
            builder_driver: "docker".into(),
            ..builder_state(tmp.path())
        };
        teardown(&ctx, &docker_driver).await;
        assert!(runner.calls().is_empty());

        let standalone = RunState {
            standalone: true,
            ..builder_state(tmp.path())
        };
        teardown(&ctx, &standalone).await;
        assert_eq!(
            runner.calls(),
            vec!["buildx inspect builder-1", "buildx rm builder-1"]
        );
    }
}
