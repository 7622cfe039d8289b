//! Core of setup-buildx: the builder model, the `buildx inspect` parser, the
//! argument synthesizer and thin wrappers over the docker, buildx and git CLIs.
//!
//! # Example
//!
//! ```ignore
//! use setup_buildx_core::{Buildx, Inputs, ProcessRunner, args};
//!
//! let runner = ProcessRunner;
//! let buildx = Buildx::plugin();
//! let version = buildx.version(&runner).await?;
//! let create = args::create_args(&inputs, &version, &paths::scratch_dir())?;
//! buildx.run(&runner, &create, ExecOptions::visible()).await?;
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod builder;
pub mod buildkit;
pub mod buildx;
pub mod credentials;
pub mod docker;
mod error;
pub mod exec;
pub mod git;
pub mod inputs;
mod inspect;
pub mod paths;
pub mod state;
mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use builder::{Builder, Node, parse_append_nodes};
pub use buildx::Buildx;
pub use credentials::{CredentialSource, TlsMaterial, set_credentials};
pub use docker::Docker;
pub use error::{Error, Result};
pub use exec::{CommandRunner, ExecOptions, ExecOutput, ProcessRunner};
pub use inputs::{ConfigSource, Driver, Inputs};
pub use inspect::parse_inspect;
pub use state::RunState;
pub use version::{Capabilities, is_short_hash, parse_version, satisfies};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
