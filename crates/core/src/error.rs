//! Error types for builder provisioning.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for setup-buildx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning or tearing down a builder.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Tool output did not have a recognizable shape.
    #[error("Cannot parse {what}: {raw}")]
    #[diagnostic(
        code(setup_buildx::parse),
        help("The buildx output format is not recognized; check the installed buildx version")
    )]
    Parse {
        /// What was being parsed (e.g. "buildx version")
        what: String,
        /// The offending raw text
        raw: String,
    },

    /// Requested release tag is absent from the release feed.
    #[error("Cannot find buildx release {tag} in {url}")]
    #[diagnostic(
        code(setup_buildx::release_not_found),
        help("Use \"latest\" or an existing release tag such as v0.11.2")
    )]
    ReleaseNotFound {
        /// The requested tag
        tag: String,
        /// The release feed that was queried
        url: String,
    },

    /// A resolved version is not valid semver.
    #[error("Invalid buildx version \"{version}\"")]
    #[diagnostic(code(setup_buildx::invalid_version))]
    InvalidVersion {
        /// The rejected version string
        version: String,
    },

    /// A referenced file does not exist.
    #[error("{what} {} not found", path.display())]
    #[diagnostic(code(setup_buildx::not_found))]
    NotFound {
        /// What kind of file was expected
        what: String,
        /// The missing path
        path: PathBuf,
    },

    /// An external process exited non-zero with stderr content.
    #[error("{command} failed: {message}")]
    #[diagnostic(
        code(setup_buildx::external_command),
        help("See the command output above for details")
    )]
    ExternalCommand {
        /// The command line that was run
        command: String,
        /// Last meaningful line of stderr
        message: String,
    },

    /// The requested operation is not possible in the current mode.
    #[error("{message}")]
    #[diagnostic(code(setup_buildx::unsupported_mode))]
    UnsupportedMode {
        /// Explanation naming the unsupported combination
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Invalid action input or environment.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(setup_buildx::config))]
    Configuration {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// HTTP request failed.
    #[error("HTTP error: {message}")]
    #[diagnostic(code(setup_buildx::http))]
    Http {
        /// The error message
        message: String,
    },

    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" on {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(setup_buildx::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying error
        #[source]
        source: std::io::Error,
        /// The path involved, if known
        path: Option<PathBuf>,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(setup_buildx::json))]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    #[diagnostic(
        code(setup_buildx::yaml),
        help("The append input must be a YAML list of nodes")
    )]
    Yaml(#[from] serde_yaml::Error),
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}

impl Error {
    /// Create a parse error carrying the raw offending text.
    #[must_use]
    pub fn parse(what: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            raw: raw.into(),
        }
    }

    /// Create a release-not-found error.
    #[must_use]
    pub fn release_not_found(tag: impl Into<String>, url: impl Into<String>) -> Self {
        Self::ReleaseNotFound {
            tag: tag.into(),
            url: url.into(),
        }
    }

    /// Create an invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a not-found error for a path.
    #[must_use]
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Create an external command error.
    #[must_use]
    pub fn external_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported mode error.
    #[must_use]
    pub fn unsupported_mode(message: impl Into<String>) -> Self {
        Self::UnsupportedMode {
            message: message.into(),
            help: None,
        }
    }

    /// Create an unsupported mode error with help text.
    #[must_use]
    pub fn unsupported_mode_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::UnsupportedMode {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text.
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an HTTP error.
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Attach a path to an I/O error.
    #[must_use]
    pub fn io(source: std::io::Error, path: &Path) -> Self {
        Self::Io {
            source,
            path: Some(path.to_path_buf()),
        }
    }
}
