//! CLI commands for apm-release
//!
//! - **run**: preconditions, verify phase, analysis, publish phase
//! - **verify**: preconditions and verify phase only
//! - **plan**: analysis only, no checks and no side effects
//! - **preset**: print the resolved pipeline declaration
//!
//! All commands accept `&ReleaseContext`, built once in `main`.

pub mod plan;
pub mod preset;
pub mod run;
pub mod verify;

pub use plan::run_plan;
pub use preset::run_preset;
pub use run::run_release;
pub use verify::run_verify;

use crate::checks::CheckRunner;
use crate::core::ci::CiContext;
use crate::core::context::ReleaseContext;
use crate::core::error::ReleaseResult;
use crate::core::vcs::SystemGit;
use crate::pipeline::steps::StepContext;
use crate::release::{Manifest, NextRelease};

/// Repository and manifest of the package being released
///
/// Loaded only after the preconditions pass, so a missing tool or token is
/// reported before anything about the package itself.
pub(crate) struct Package {
  pub git: SystemGit,
  pub manifest: Manifest,
  pub name: String,
}

impl Package {
  pub fn load(ctx: &ReleaseContext, git: SystemGit) -> ReleaseResult<Self> {
    let manifest = Manifest::load(&ctx.manifest_path())?;
    let name = manifest.require_name()?.to_string();
    Ok(Self { git, manifest, name })
  }

  pub fn step_context<'a>(&'a self, ctx: &'a ReleaseContext, next: Option<&'a NextRelease>) -> StepContext<'a> {
    StepContext {
      release: ctx,
      git: &self.git,
      package_name: &self.name,
      repository_url: self.manifest.repository_url(),
      next,
    }
  }
}

pub(crate) fn open_repository(ctx: &ReleaseContext) -> ReleaseResult<SystemGit> {
  let git = SystemGit::open(&ctx.root, &ctx.env)?;
  tracing::debug!(work_tree = %git.work_tree().display(), "opened repository");
  Ok(git)
}

/// Why this build must not release, if it must not
///
/// Pull request builds never release. The branch comes from the CI service
/// when one is detected, since CI checkouts are often a detached HEAD.
pub(crate) fn skip_reason(ctx: &ReleaseContext, git: &SystemGit) -> ReleaseResult<Option<String>> {
  let ci = CiContext::detect(&ctx.env);
  tracing::debug!(service = ci.service.unwrap_or("<none>"), branch = ?ci.branch, pull_request = ci.pull_request, "ci context");

  if ci.pull_request {
    return Ok(Some(
      "This run was triggered by a pull request and therefore a new version won't be published".to_string(),
    ));
  }

  let current = match ci.branch {
    Some(branch) => branch,
    None => git.current_branch()?,
  };
  if current == ctx.config.branch {
    Ok(None)
  } else {
    Ok(Some(format!(
      "This run was triggered on branch '{}', releases are only published from '{}'",
      current, ctx.config.branch
    )))
  }
}

/// Run the declared preconditions; the first failure aborts
pub(crate) fn run_preconditions(ctx: &ReleaseContext) -> ReleaseResult<Vec<String>> {
  let runner = CheckRunner::from_preconditions(&ctx.pipeline.checks);
  tracing::debug!(count = runner.checks().len(), "running preconditions");
  let passed = runner.run_all(&ctx.env)?;
  for name in &passed {
    println!("✅ {}", name);
  }
  Ok(passed.into_iter().map(str::to_string).collect())
}
