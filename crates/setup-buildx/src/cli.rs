//! Command line and action inputs.
//!
//! Every input can be given as a flag or through the `INPUT_<NAME>` variable
//! the runner exports for it.

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use setup_buildx_core::inputs::input_list;
use setup_buildx_core::{Driver, Error, Inputs, Result};

/// Set up a buildx builder for the current job.
#[derive(Parser, Debug)]
#[command(name = "setup-buildx")]
#[command(about = "Provision a buildx builder and tear it down after the job")]
#[command(version)]
pub struct Cli {
    /// The phase to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        long = "log-level",
        global = true,
        env = "SETUP_BUILDX_LOG_LEVEL",
        default_value = "info",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(
        long = "log-format",
        global = true,
        env = "SETUP_BUILDX_LOG_FORMAT",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

/// Action phases.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install buildx, create and bootstrap the builder.
    Main(InputArgs),
    /// Remove the builder and the files created by `main`.
    Post,
}

/// Raw action inputs.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Buildx version (`latest`, `v0.11.2`, `cloud:latest`) or git context.
    #[arg(long, env = "INPUT_VERSION", default_value = "")]
    pub version: String,

    /// Builder name; generated when empty.
    #[arg(long, env = "INPUT_NAME", default_value = "")]
    pub name: String,

    /// Buildx driver.
    #[arg(long, env = "INPUT_DRIVER", default_value = "docker-container")]
    pub driver: String,

    /// Driver options, one per line.
    #[arg(long = "driver-opts", env = "INPUT_DRIVER-OPTS", default_value = "")]
    pub driver_opts: String,

    /// Flags for buildkitd.
    #[arg(long = "buildkitd-flags", env = "INPUT_BUILDKITD-FLAGS", default_value = "")]
    pub buildkitd_flags: String,

    /// Path to a buildkitd TOML config.
    #[arg(long = "buildkitd-config", env = "INPUT_BUILDKITD-CONFIG", default_value = "")]
    pub buildkitd_config: String,

    /// Inline buildkitd TOML config.
    #[arg(
        long = "buildkitd-config-inline",
        env = "INPUT_BUILDKITD-CONFIG-INLINE",
        default_value = ""
    )]
    pub buildkitd_config_inline: String,

    /// Deprecated alias of `--buildkitd-config`.
    #[arg(long, env = "INPUT_CONFIG", default_value = "", hide = true)]
    pub config: String,

    /// Deprecated alias of `--buildkitd-config-inline`.
    #[arg(
        long = "config-inline",
        env = "INPUT_CONFIG-INLINE",
        default_value = "",
        hide = true
    )]
    pub config_inline: String,

    /// Fixed platforms for the first node, comma or newline separated.
    #[arg(long, env = "INPUT_PLATFORMS", default_value = "")]
    pub platforms: String,

    /// Make buildx the default `docker build`.
    #[arg(long, env = "INPUT_INSTALL", default_value = "false")]
    pub install: String,

    /// Switch to the new builder.
    #[arg(long = "use", env = "INPUT_USE", default_value = "true")]
    pub use_builder: String,

    /// Endpoint or docker context for the first node.
    #[arg(long, env = "INPUT_ENDPOINT", default_value = "")]
    pub endpoint: String,

    /// YAML list of nodes to append.
    #[arg(long, env = "INPUT_APPEND", default_value = "")]
    pub append: String,

    /// Keep downloaded binaries in the tool cache.
    #[arg(long = "cache-binary", env = "INPUT_CACHE-BINARY", default_value = "true")]
    pub cache_binary: String,

    /// Remove the builder in the post phase.
    #[arg(long, env = "INPUT_CLEANUP", default_value = "true")]
    pub cleanup: String,

    /// Keep BuildKit state when removing the builder.
    #[arg(long = "keep-state", env = "INPUT_KEEP-STATE", default_value = "false")]
    pub keep_state: String,
}

/// Parse a boolean input the way the runner toolkit does.
///
/// Only `true`, `True`, `TRUE`, `false`, `False` and `FALSE` are accepted;
/// an empty value falls back to `default`.
pub fn parse_bool(name: &str, value: &str, default: bool) -> Result<bool> {
    match value.trim() {
        "" => Ok(default),
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(Error::configuration_with_help(
            format!("Input does not meet YAML 1.2 \"Core Schema\" specification: {name} ({other})"),
            "Support boolean input list: `true | True | TRUE | false | False | FALSE`",
        )),
    }
}

fn first_non_empty(primary: &str, legacy: &str) -> String {
    if primary.is_empty() {
        legacy.to_string()
    } else {
        primary.to_string()
    }
}

impl InputArgs {
    /// Normalize the raw inputs.
    pub fn into_inputs(self) -> Result<Inputs> {
        Ok(Inputs {
            install: parse_bool("install", &self.install, false)?,
            use_builder: parse_bool("use", &self.use_builder, true)?,
            cache_binary: parse_bool("cache-binary", &self.cache_binary, true)?,
            cleanup: parse_bool("cleanup", &self.cleanup, true)?,
            keep_state: parse_bool("keep-state", &self.keep_state, false)?,
            version: self.version.trim().to_string(),
            name: self.name.trim().to_string(),
            driver: Driver::from_input(&self.driver),
            driver_opts: input_list(&self.driver_opts, true),
            buildkitd_flags: self.buildkitd_flags.trim().to_string(),
            buildkitd_config: first_non_empty(self.buildkitd_config.trim(), self.config.trim()),
            buildkitd_config_inline: first_non_empty(
                &self.buildkitd_config_inline,
                &self.config_inline,
            ),
            platforms: input_list(&self.platforms, false),
            endpoint: self.endpoint.trim().to_string(),
            append: self.append,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT_VARS: [&str; 17] = [
        "INPUT_VERSION",
        "INPUT_NAME",
        "INPUT_DRIVER",
        "INPUT_DRIVER-OPTS",
        "INPUT_BUILDKITD-FLAGS",
        "INPUT_BUILDKITD-CONFIG",
        "INPUT_BUILDKITD-CONFIG-INLINE",
        "INPUT_CONFIG",
        "INPUT_CONFIG-INLINE",
        "INPUT_PLATFORMS",
        "INPUT_INSTALL",
        "INPUT_USE",
        "INPUT_ENDPOINT",
        "INPUT_APPEND",
        "INPUT_CACHE-BINARY",
        "INPUT_CLEANUP",
        "INPUT_KEEP-STATE",
    ];

    fn parse_main(vars: &[(&str, &str)], args: &[&str]) -> Result<Inputs> {
        let env: Vec<(&str, Option<&str>)> = INPUT_VARS
            .iter()
            .map(|key| (*key, vars.iter().find(|(k, _)| k == key).map(|(_, v)| *v)))
            .collect();
        temp_env::with_vars(env, || {
            let mut argv = vec!["setup-buildx", "main"];
            argv.extend_from_slice(args);
            let cli = Cli::try_parse_from(argv).expect("cli should parse");
            match cli.command {
                Commands::Main(inputs) => inputs.into_inputs(),
                Commands::Post => panic!("expected main"),
            }
        })
    }

    #[test]
    fn test_defaults() {
        let inputs = parse_main(&[], &[]).unwrap();
        assert_eq!(inputs, Inputs::default());
    }

    #[test]
    fn test_inputs_from_env() {
        let inputs = parse_main(
            &[
                ("INPUT_NAME", "foo"),
                ("INPUT_DRIVER", "remote"),
                ("INPUT_DRIVER-OPTS", "image=moby/buildkit:master\nenv.http_proxy=a,b"),
                ("INPUT_PLATFORMS", "linux/amd64,linux/arm64\nlinux/riscv64"),
                ("INPUT_INSTALL", "True"),
                ("INPUT_USE", "FALSE"),
                ("INPUT_ENDPOINT", "tls://foo:1234"),
                ("INPUT_CONFIG-INLINE", "debug = true"),
            ],
            &[],
        )
        .unwrap();
        assert_eq!(inputs.name, "foo");
        assert_eq!(inputs.driver, Driver::Remote);
        assert_eq!(
            inputs.driver_opts,
            vec!["image=moby/buildkit:master", "env.http_proxy=a,b"]
        );
        assert_eq!(
            inputs.platforms,
            vec!["linux/amd64", "linux/arm64", "linux/riscv64"]
        );
        assert!(inputs.install);
        assert!(!inputs.use_builder);
        assert_eq!(inputs.endpoint, "tls://foo:1234");
        assert_eq!(inputs.buildkitd_config_inline, "debug = true");
    }

    #[test]
    fn test_flags_override_env() {
        let inputs = parse_main(
            &[("INPUT_VERSION", "v0.10.0")],
            &["--version", "latest", "--keep-state", "true"],
        )
        .unwrap();
        assert_eq!(inputs.version, "latest");
        assert!(inputs.keep_state);
    }

    #[test]
    fn test_buildkitd_config_wins_over_legacy_alias() {
        let inputs = parse_main(
            &[
                ("INPUT_BUILDKITD-CONFIG", "/etc/buildkitd.toml"),
                ("INPUT_CONFIG", "/tmp/old.toml"),
            ],
            &[],
        )
        .unwrap();
        assert_eq!(inputs.buildkitd_config, "/etc/buildkitd.toml");

        let legacy = parse_main(&[("INPUT_CONFIG", "/tmp/old.toml")], &[]).unwrap();
        assert_eq!(legacy.buildkitd_config, "/tmp/old.toml");
    }

    #[test]
    fn test_invalid_boolean_rejected() {
        let err = parse_main(&[("INPUT_CLEANUP", "yes")], &[]).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("cleanup (yes)"));
    }

    #[test]
    fn test_parse_bool() {
        for value in ["true", "True", "TRUE"] {
            assert!(parse_bool("x", value, false).unwrap());
        }
        for value in ["false", "False", "FALSE"] {
            assert!(!parse_bool("x", value, true).unwrap());
        }
        assert!(parse_bool("x", "", true).unwrap());
        assert!(parse_bool("x", "tRuE", false).is_err());
    }

    #[test]
    fn test_post_subcommand() {
        let cli = Cli::try_parse_from(["setup-buildx", "--log-format", "json", "post"]).unwrap();
        assert!(matches!(cli.command, Commands::Post));
        assert_eq!(cli.log_format, TracingFormat::Json);
    }
}
