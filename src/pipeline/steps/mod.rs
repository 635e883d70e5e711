//! Step implementations
//!
//! Each step module exposes `verify` (read-only) and `publish` functions.
//! `execute` dispatches on the step variant and phase.

mod changelog;
mod exec;
mod git;
mod github;
mod manifest;

pub use github::{announce_failure, announce_success};

use super::{Phase, Step, StepOutcome};
use crate::core::config::GitIdentity;
use crate::core::context::ReleaseContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::vcs::SystemGit;
use crate::release::NextRelease;
use crate::utils::{encode_userinfo, is_local_path, render_template, url_with_credentials};

/// Everything a step can read
pub struct StepContext<'a> {
  pub release: &'a ReleaseContext,
  pub git: &'a SystemGit,
  pub package_name: &'a str,
  /// `repository` field of the manifest, if any
  pub repository_url: Option<&'a str>,
  /// Set for the publish phase only
  pub next: Option<&'a NextRelease>,
}

impl StepContext<'_> {
  pub fn branch(&self) -> &str {
    &self.release.config.branch
  }

  /// The release being published; publish steps can rely on it
  pub fn require_next(&self, step: &str) -> ReleaseResult<&NextRelease> {
    self
      .next
      .ok_or_else(|| ReleaseError::step(step, "no release has been computed for this run"))
  }

  /// Substitute `{branch}` and `{name}`, plus `{version}` and `{tag}` once known
  pub fn render(&self, template: &str) -> String {
    let version = self.next.map(|n| n.version.to_string());
    let mut vars = vec![("branch", self.branch()), ("name", self.package_name)];
    if let (Some(next), Some(version)) = (self.next, version.as_deref()) {
      vars.push(("version", version));
      vars.push(("tag", next.tag.as_str()));
    }
    render_template(template, &vars)
  }

  /// Where the release branch and tag are pushed
  ///
  /// The manifest `repository` URL wins; `origin` is the fallback.
  pub fn push_target(&self) -> ReleaseResult<String> {
    if let Some(url) = self.repository_url {
      return Ok(normalize_repository_url(url));
    }

    match self.git.get_remote_url("origin")? {
      Some(url) => Ok(url),
      None => Err(ReleaseError::with_help(
        "No repository to push to",
        "Set \"repository\" in package.json or add an 'origin' remote.",
      )),
    }
  }

  /// Push target with credentials for http(s) remotes
  ///
  /// `GIT_CREDENTIALS` (`user:password`) wins over a GitHub token, which is
  /// sent as `x-access-token`. The result must never be printed or logged.
  pub fn push_url(&self) -> ReleaseResult<String> {
    let target = self.push_target()?;
    Ok(match self.credentials() {
      Some(credentials) => url_with_credentials(&target, &credentials),
      None => target,
    })
  }

  fn credentials(&self) -> Option<String> {
    let env = &self.release.env;
    if let Some(raw) = env.non_empty("GIT_CREDENTIALS") {
      return Some(match raw.split_once(':') {
        Some((user, password)) => format!("{}:{}", encode_userinfo(user), encode_userinfo(password)),
        None => encode_userinfo(raw),
      });
    }
    env
      .first_non_empty(&["GH_TOKEN", "GITHUB_TOKEN"])
      .map(|token| format!("x-access-token:{}", encode_userinfo(token)))
  }

  /// Release commit identity: config, overridden by GIT_AUTHOR_* / GIT_COMMITTER_*
  pub fn identity(&self) -> GitIdentity {
    let env = &self.release.env;
    let configured = &self.release.config.git_identity;
    GitIdentity {
      name: env
        .first_non_empty(&["GIT_AUTHOR_NAME", "GIT_COMMITTER_NAME"])
        .unwrap_or(&configured.name)
        .to_string(),
      email: env
        .first_non_empty(&["GIT_AUTHOR_EMAIL", "GIT_COMMITTER_EMAIL"])
        .unwrap_or(&configured.email)
        .to_string(),
    }
  }
}

/// Expand npm shorthands (`owner/repo`, `github:owner/repo`) and drop `git+`
fn normalize_repository_url(url: &str) -> String {
  let url = url.trim();
  let url = url.strip_prefix("git+").unwrap_or(url);

  if url.contains("://") || is_local_path(url) || url.contains('@') {
    return url.to_string();
  }

  let shorthand = url.strip_prefix("github:").unwrap_or(url);
  match shorthand.split_once('/') {
    Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
      format!("https://github.com/{}/{}.git", owner, repo.trim_end_matches(".git"))
    }
    _ => url.to_string(),
  }
}

/// Run one step in one phase
pub fn execute(step: &Step, phase: Phase, ctx: &StepContext<'_>) -> ReleaseResult<StepOutcome> {
  let detail = match (step, phase) {
    (Step::Changelog { file }, Phase::Verify) => changelog::verify(file, ctx)?,
    (Step::Changelog { file }, Phase::Publish) => changelog::publish(file, ctx)?,
    (Step::Manifest { publish }, Phase::Verify) => manifest::verify(*publish, ctx)?,
    (Step::Manifest { publish }, Phase::Publish) => manifest::publish(*publish, ctx)?,
    (Step::Git { .. }, Phase::Verify) => git::verify(ctx)?,
    (Step::Git { message, assets }, Phase::Publish) => git::publish(message, assets, ctx)?,
    (Step::Exec { cmd }, _) => exec::run(cmd, ctx)?,
    (Step::Github, Phase::Verify) => github::verify(ctx)?,
    (Step::Github, Phase::Publish) => github::publish(ctx)?,
  };

  Ok(StepOutcome {
    step: step.name().to_string(),
    phase: phase.to_string(),
    detail,
  })
}
