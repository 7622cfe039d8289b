//! Main phase: acquire buildx, create and bootstrap the builder, report it.

use super::Context;
use setup_buildx_core::args::{append_args, create_args, inspect_args};
use setup_buildx_core::buildkit::{container_name, node_version};
use setup_buildx_core::buildx::install_args;
use setup_buildx_core::inputs::{generated_builder_name, resolve_builder_name};
use setup_buildx_core::{
    Builder, Buildx, Driver, Error, ExecOptions, Inputs, Node, Result, RunState, git,
    parse_append_nodes, set_credentials,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Outcome of the main phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    /// Parsed buildx version.
    pub buildx_version: String,
    /// The builder after bootstrap.
    pub builder: Builder,
    /// State handed to the post phase.
    pub state: RunState,
}

/// Run the main phase.
///
/// State is saved after every step that produces something the post phase
/// has to clean up, so a failure halfway still leaves enough for teardown.
pub async fn setup(ctx: &Context, mut inputs: Inputs) -> Result<SetupReport> {
    let runner = ctx.runner();
    let standalone = !ctx.docker.is_available(runner);
    let mut state = RunState {
        standalone,
        cleanup: inputs.cleanup,
        keep_state: inputs.keep_state,
        ..RunState::default()
    };
    ctx.actions.save_run_state(&state)?;

    if standalone {
        info!("Docker CLI not found, buildx will run standalone");
    } else {
        let printed = ctx
            .actions
            .group("Docker info", async {
                ctx.docker.print_version(runner).await?;
                ctx.docker.print_info(runner).await
            })
            .await;
        if let Err(e) = printed {
            warn!(error = %e, "Failed to print docker info");
        }
    }

    let buildx = acquire_buildx(ctx, &inputs, standalone).await?;
    ctx.actions
        .group("Buildx version", buildx.print_version(runner))
        .await?;
    let buildx_version = buildx.version(runner).await?;
    info!(version = %buildx_version, standalone, "Using buildx");

    inputs.name = resolve_builder_name(&inputs.name, &inputs.driver, &ctx.docker, runner).await?;
    ctx.actions.set_output("name", &inputs.name)?;
    state.builder_name = inputs.name.clone();
    state.builder_driver = inputs.driver.to_string();
    ctx.actions.save_run_state(&state)?;

    let certs_dir = &ctx.layout.certs_dir;
    std::fs::create_dir_all(certs_dir).map_err(|e| Error::io(e, certs_dir))?;
    state.certs_dir = Some(certs_dir.clone());
    ctx.actions.save_run_state(&state)?;

    if inputs.driver == Driver::DockerContainer
        && inputs.endpoint.is_empty()
        && !standalone
        && let Some(context) = create_tls_context(ctx).await?
    {
        inputs.endpoint.clone_from(&context);
        state.tmp_docker_context = context;
        ctx.actions.save_run_state(&state)?;
    }

    if inputs.driver != Driver::Docker {
        ctx.actions
            .group("Creating a new builder instance", async {
                let cert_opts = set_credentials(
                    certs_dir,
                    0,
                    &inputs.driver,
                    &inputs.endpoint,
                    &ctx.credentials,
                )?;
                let mut create = inputs.clone();
                create.driver_opts.extend(cert_opts);
                let args = create_args(&create, &buildx_version, &ctx.layout.scratch_dir)?;
                buildx.run(runner, &args, ExecOptions::visible()).await?;
                Ok(())
            })
            .await?;
    }

    if !inputs.append.trim().is_empty() {
        let nodes = parse_append_nodes(&inputs.append)?;
        ctx.actions
            .group("Appending node(s) to builder", async {
                for (i, node) in nodes.into_iter().enumerate() {
                    let node = with_credentials(ctx, node, i + 1, &inputs.driver)?;
                    let args = append_args(&inputs, &node, &buildx_version);
                    buildx.run(runner, &args, ExecOptions::visible()).await?;
                }
                Ok(())
            })
            .await?;
    }

    ctx.actions
        .group(
            "Booting builder",
            buildx.run(
                runner,
                &inspect_args(&inputs, &buildx_version),
                ExecOptions::visible(),
            ),
        )
        .await?;

    if inputs.install {
        if standalone {
            return Err(Error::unsupported_mode_with_help(
                "Cannot set buildx as default builder without the Docker CLI",
                "Set `install: false` or make the docker CLI available",
            ));
        }
        ctx.actions
            .group(
                "Setting buildx as default builder",
                buildx.run(runner, &install_args(), ExecOptions::visible()),
            )
            .await?;
    }

    let builder = buildx.inspect(runner, &inputs.name).await?;
    report_outputs(ctx, &builder)?;

    if !standalone && inputs.driver == Driver::DockerContainer {
        if let Some(name) = builder.first_node().and_then(|n| n.name.as_deref()) {
            state.container_name = container_name(name);
        }
        log_buildkit_versions(ctx, &builder).await;
    }

    state.debug = ctx.actions.is_debug()
        || builder
            .first_node()
            .and_then(|n| n.buildkitd_flags.as_deref())
            .is_some_and(|flags| flags.contains("--debug"));
    ctx.actions.save_run_state(&state)?;

    Ok(SetupReport {
        buildx_version,
        builder,
        state,
    })
}

/// Install buildx when needed and return how to invoke it.
///
/// A git context is built from source. Otherwise a release is downloaded when
/// a version was requested or no buildx is available.
async fn acquire_buildx(ctx: &Context, inputs: &Inputs, standalone: bool) -> Result<Buildx> {
    let runner = ctx.runner();
    let selector = inputs.version_selector();
    let existing = if standalone {
        Buildx::standalone()
    } else {
        Buildx::plugin()
    };

    let binary: PathBuf = if git::is_valid_ref(&selector) {
        if standalone {
            return Err(Error::unsupported_mode_with_help(
                "Cannot build from source without the Docker CLI",
                "Use a release version or make the docker CLI available",
            ));
        }
        ctx.actions
            .group(
                "Build and install buildx",
                ctx.installer
                    .build(runner, &selector, standalone, inputs.cache_binary),
            )
            .await?
    } else if !selector.is_empty() || !existing.is_available(runner).await {
        let selector = if selector.is_empty() {
            "latest"
        } else {
            selector.as_str()
        };
        ctx.actions
            .group(
                "Download and install buildx",
                ctx.installer.download(selector, inputs.cache_binary),
            )
            .await?
    } else {
        debug!("Using buildx found on the runner");
        return Ok(existing);
    };

    // The process PATH is left alone: this phase runs every later command
    // through the returned absolute path, and GITHUB_PATH serves later steps
    // and the post phase.
    if standalone {
        let installed = ctx
            .installer
            .install_standalone(&binary, &ctx.layout.standalone_dir())?;
        if let Some(bin_dir) = installed.parent() {
            ctx.actions.add_path(bin_dir)?;
        }
        Ok(Buildx::standalone_at(installed))
    } else {
        ctx.installer
            .install_plugin(&binary, &ctx.layout.docker_config_dir)?;
        Ok(Buildx::plugin())
    }
}

/// Create a temporary context pointing at the default context's host when
/// that context carries TLS material. Inspect failures are not fatal.
async fn create_tls_context(ctx: &Context) -> Result<Option<String>> {
    let runner = ctx.runner();
    let default = match ctx.docker.inspect_context(runner, "default").await {
        Ok(info) => info,
        Err(e) => {
            debug!(error = %e, "Cannot inspect default docker context");
            return Ok(None);
        }
    };
    let Some(host) = default.docker_host().filter(|_| default.has_tls_material()) else {
        return Ok(None);
    };
    let name = generated_builder_name();
    ctx.docker.create_context(runner, &name, host).await?;
    info!("Created docker context {name} for the TLS-enabled default context");
    Ok(Some(name))
}

fn with_credentials(ctx: &Context, mut node: Node, index: usize, driver: &Driver) -> Result<Node> {
    let Some(endpoint) = node.endpoint.as_deref() else {
        return Ok(node);
    };
    let opts = set_credentials(&ctx.layout.certs_dir, index, driver, endpoint, &ctx.credentials)?;
    if !opts.is_empty() {
        node.driver_opts.get_or_insert_with(Vec::new).extend(opts);
    }
    Ok(node)
}

fn report_outputs(ctx: &Context, builder: &Builder) -> Result<()> {
    let actions = &ctx.actions;
    actions.set_output("driver", builder.driver.as_deref().unwrap_or_default())?;
    actions.set_output("platforms", &builder.platforms().join(","))?;
    actions.set_output("nodes", &serde_json::to_string_pretty(&builder.nodes)?)?;

    // Deprecated single-value outputs, taken from the first node.
    let first = builder.first_node();
    let endpoint = first.and_then(|n| n.endpoint.as_deref());
    let status = first.and_then(|n| n.status.as_deref());
    let flags = first.and_then(|n| n.buildkitd_flags.as_deref());
    actions.set_output("endpoint", endpoint.unwrap_or_default())?;
    actions.set_output("status", status.unwrap_or_default())?;
    actions.set_output("flags", flags.unwrap_or_default())?;
    Ok(())
}

async fn log_buildkit_versions(ctx: &Context, builder: &Builder) {
    let runner = ctx.runner();
    for node in &builder.nodes {
        let name = node.name.as_deref().unwrap_or("<unnamed>");
        match node_version(&ctx.docker, runner, node).await {
            Ok(Some(version)) => info!("{name}: BuildKit {version}"),
            Ok(None) => {}
            Err(e) => warn!(node = name, error = %e, "Cannot get BuildKit version"),
        }
    }
}
