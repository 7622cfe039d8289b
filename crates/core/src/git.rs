//! Git references for building buildx from source.

use crate::exec::{CommandRunner, ExecOptions, command_line};
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static FULL_SHA: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[0-9a-f]{40}$").unwrap()
});

const REF_PREFIXES: [&str; 3] = ["git://", "github.com/", "git@"];

/// Whether a version input names a git context rather than a release.
///
/// Accepts URLs with a host (`https://github.com/docker/buildx.git#v0.11.2`)
/// and the `git://`, `github.com/` and `git@` shorthands.
#[must_use]
pub fn is_valid_ref(value: &str) -> bool {
    if Url::parse(value).is_ok_and(|url| url.has_host()) {
        return true;
    }
    REF_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
}

/// Split `repo#ref`; a missing or empty ref means `master`.
#[must_use]
pub fn split_context(context: &str) -> (&str, &str) {
    match context.split_once('#') {
        Some((repo, git_ref)) if !git_ref.is_empty() => (repo, git_ref),
        Some((repo, _)) => (repo, "master"),
        None => (context, "master"),
    }
}

/// Whether `git_ref` is already a full commit SHA.
#[must_use]
pub fn is_full_sha(git_ref: &str) -> bool {
    FULL_SHA.is_match(git_ref)
}

/// Resolve `git_ref` in `repo` to a commit with `git ls-remote`.
///
/// # Errors
///
/// Fails when git reports an error or the ref does not exist.
pub async fn remote_sha(runner: &dyn CommandRunner, repo: &str, git_ref: &str) -> Result<String> {
    let args = vec!["ls-remote".to_string(), repo.to_string(), git_ref.to_string()];
    let output = runner.exec("git", &args, ExecOptions::probe()).await?;
    let output = output.check(&command_line("git", &args))?;
    output
        .stdout
        .split_whitespace()
        .next()
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::configuration(format!("Cannot find remote ref for {repo}#{git_ref}"))
        })
}

/// Resolve a git context to the commit to build.
pub async fn resolve_commit(runner: &dyn CommandRunner, context: &str) -> Result<String> {
    let (repo, git_ref) = split_context(context);
    if is_full_sha(git_ref) {
        return Ok(git_ref.to_string());
    }
    remote_sha(runner, repo, git_ref).await
}
