//! Parser for the text dump of `buildx inspect`.
//!
//! The output is a flat list of `Key: Value` lines. The first `Name` is the
//! builder; every later `Name` opens a new node:
//!
//! ```text
//! Name:   builder-5cb467f7
//! Driver: docker-container
//!
//! Nodes:
//! Name:      builder-5cb467f70
//! Endpoint:  unix:///var/run/docker.sock
//! Status:    running
//! Buildkit:  v0.10.4
//! Platforms: linux/amd64, linux/arm64
//! ```

use crate::builder::{Builder, Node};
use regex::Regex;
use std::sync::LazyLock;

static DRIVER_OPT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"([\w.]+)="([^"]*)""#).unwrap()
});

/// Parse `buildx inspect` output into a [`Builder`].
///
/// Unknown keys and lines with an empty key or value are ignored, so this
/// never fails; a text with no `Name` line yields an empty builder.
#[must_use]
pub fn parse_inspect(raw: &str) -> Builder {
    let mut builder = Builder::default();
    let mut node = Node::default();

    for line in raw.trim().lines() {
        let mut segments = line.split(':');
        let key = segments.next().unwrap_or_default().trim();
        let value = segments.map(str::trim).collect::<Vec<_>>().join(":");
        if key.is_empty() || value.is_empty() {
            continue;
        }

        match key.to_lowercase().as_str() {
            "name" => {
                if builder.name.is_none() {
                    builder.name = Some(value);
                } else {
                    if !node.is_empty() {
                        builder.nodes.push(std::mem::take(&mut node));
                    }
                    node = Node::named(value);
                }
            }
            "driver" => {
                if builder.driver.is_none() {
                    builder.driver = Some(value);
                }
            }
            "endpoint" => node.endpoint = Some(value),
            "driver options" => {
                let opts = parse_driver_opts(&value);
                if !opts.is_empty() {
                    node.driver_opts = Some(opts);
                }
            }
            "status" => node.status = Some(value),
            "flags" | "buildkit daemon flags" => node.buildkitd_flags = Some(value),
            "buildkit" | "buildkit version" => node.buildkit = Some(value),
            "platforms" => node.platforms = Some(parse_platforms(&value)),
            _ => {}
        }
    }

    if !node.is_empty() {
        builder.nodes.push(node);
    }
    builder
}

/// `image="moby/buildkit:master" network="host"` → `["image=moby/buildkit:master", "network=host"]`
fn parse_driver_opts(value: &str) -> Vec<String> {
    DRIVER_OPT
        .captures_iter(value)
        .map(|caps| format!("{}={}", &caps[1], &caps[2]))
        .collect()
}

/// Keep only the preferred (`*`-marked) platforms when any are marked.
fn parse_platforms(value: &str) -> String {
    let entries: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let preferred: Vec<String> = entries
        .iter()
        .filter(|p| p.contains('*'))
        .map(|p| p.replace('*', ""))
        .collect();
    if preferred.is_empty() {
        entries.join(",")
    } else {
        preferred.join(",")
    }
}
