//! setup-buildx binary: `setup-buildx main` and `setup-buildx post`.

#![allow(clippy::print_stderr)]

use clap::Parser;
use setup_buildx::actions::Actions;
use setup_buildx::tracing::{TracingConfig, init_tracing};
use setup_buildx::{Cli, run};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    }) {
        eprintln!("{e:?}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli.command)) {
        if let Err(write_err) = Actions::from_env().error(&e.to_string()) {
            eprintln!("Failed to annotate error: {write_err}");
        }
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}
