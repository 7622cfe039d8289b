//! setup-buildx: provision a buildx builder for a CI job.
//!
//! The action runs twice per job. `main` installs buildx when needed, creates
//! the builder (plus any appended nodes), bootstraps it and reports its
//! driver, platforms and nodes as step outputs. `post` removes the builder,
//! the temporary docker context and the node TLS material.
//!
//! ```ignore
//! let cli = setup_buildx::Cli::parse();
//! setup_buildx::run(cli.command).await?;
//! ```

#![warn(missing_docs)]

pub mod actions;
pub mod cli;
pub mod lifecycle;
pub mod tracing;

pub use cli::{Cli, Commands, InputArgs};
pub use lifecycle::{Context, Layout, SetupReport, setup, teardown};

use actions::Actions;
use setup_buildx_core::{
    CredentialSource, Docker, ProcessRunner, Result, RunState, parse_append_nodes,
};
use setup_buildx_install::{HttpReleaseClient, Installer, ToolCache};
use std::sync::Arc;

/// Context wired to real processes, the runner environment and GitHub.
pub fn context_from_env(credentials: CredentialSource) -> Result<Context> {
    let layout = Layout::from_env()?;
    let installer = Installer::new(
        Box::new(HttpReleaseClient::new()?),
        ToolCache::from_env()?,
        layout.scratch_dir.clone(),
    );
    Ok(Context {
        runner: Arc::new(ProcessRunner),
        actions: Actions::from_env(),
        installer,
        docker: Docker::default(),
        layout,
        credentials,
    })
}

/// Run one phase of the action.
pub async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Main(args) => {
            let inputs = args.into_inputs()?;
            // Node 0 is created with the builder; appended nodes count from 1.
            let appended = parse_append_nodes(&inputs.append).map_or(0, |nodes| nodes.len());
            let ctx = context_from_env(CredentialSource::from_env(appended))?;
            let report = setup(&ctx, inputs).await?;
            ::tracing::info!(
                builder = %report.state.builder_name,
                driver = report.builder.driver.as_deref().unwrap_or_default(),
                nodes = report.builder.nodes.len(),
                "Builder ready"
            );
            Ok(())
        }
        Commands::Post => {
            let ctx = context_from_env(CredentialSource::default())?;
            teardown(&ctx, &RunState::from_env()).await;
            Ok(())
        }
    }
}
