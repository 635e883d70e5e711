//! `apm-release run`: the full release workflow
//!
//! 1. Branch gate: pull request build or off the release branch → nothing to do, exit 0
//! 2. Preconditions, fail-fast
//! 3. Verify phase
//! 4. Analysis: no qualifying commit → nothing to do, exit 0
//! 5. Publish phase (skipped with `--dry-run`)
//! 6. Success report on GitHub
//!
//! A failure after the preconditions is reported on the GitHub failure
//! issue when the pipeline uses GitHub. The original error is still
//! returned.

use super::{Package, open_repository, run_preconditions, skip_reason};
use crate::core::context::ReleaseContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::pipeline::steps::{announce_failure, announce_success};
use crate::pipeline::{Phase, PipelineRunner, RunReport};
use crate::release::ReleasePlan;

/// Run the release command
pub fn run_release(ctx: &ReleaseContext, dry_run: bool) -> ReleaseResult<RunReport> {
  let git = open_repository(ctx)?;
  let mut report = RunReport {
    branch: ctx.config.branch.clone(),
    dry_run,
    ..Default::default()
  };

  if let Some(reason) = skip_reason(ctx, &git)? {
    println!("⏭️  {}", reason);
    report.skipped = Some(reason);
    return Ok(report);
  }

  report.checks = run_preconditions(ctx)?;

  let package = Package::load(ctx, git)?;
  report.package = package.name.clone();

  let result = release(ctx, &package, dry_run, &mut report);
  if let Err(err) = &result
    && !dry_run
  {
    report_failure(ctx, &package, err);
  }
  result.map(|()| report)
}

fn release(ctx: &ReleaseContext, package: &Package, dry_run: bool, report: &mut RunReport) -> ReleaseResult<()> {
  let runner = PipelineRunner::new(&ctx.pipeline);
  report
    .steps
    .extend(runner.run_phase(Phase::Verify, &package.step_context(ctx, None))?);
  println!("✅ Verified {} step(s)", ctx.pipeline.verify.len());

  let plan = ReleasePlan::analyze(&package.git, &ctx.tag_format())?;
  report.last_release = plan.last_release.as_ref().map(|l| l.tag.clone());
  report.bump = Some(plan.bump);

  match &plan.last_release {
    Some(last) => println!("🔖 Last release: {} ({})", last.tag, last.version),
    None => println!("🔖 No previous release found"),
  }
  println!("📋 {} commit(s) since the last release", plan.commits.len());

  let Some(next) = plan.next_release else {
    let reason = "There are no relevant changes, so no new version is released".to_string();
    println!("⏭️  {}", reason);
    report.skipped = Some(reason);
    return Ok(());
  };

  println!("📦 Next release: {} ({} bump)", next.version, next.bump);

  if dry_run {
    println!();
    println!("{}", next.notes.trim_end());
    println!();
    println!("🔍 Dry-run mode (publish steps skipped)");
    report.next_release = Some(next);
    return Ok(());
  }

  let publish_ctx = package.step_context(ctx, Some(&next));
  let outcomes = runner.run_phase(Phase::Publish, &publish_ctx)?;
  println!("✅ Released {}@{}", package.name, next.version);

  if ctx.pipeline.uses_github() {
    let release_url = outcomes
      .iter()
      .find(|o| o.step == "github" && o.phase == Phase::Publish.to_string())
      .and_then(|o| o.detail.as_deref());
    announce_success(&publish_ctx, package.manifest.fail_title(), release_url)?;
  }

  report.steps.extend(outcomes);
  report.next_release = Some(next);
  Ok(())
}

/// Best effort: a failure to report never replaces the release error
fn report_failure(ctx: &ReleaseContext, package: &Package, err: &ReleaseError) {
  if !ctx.pipeline.uses_github() {
    return;
  }
  if ctx.env.first_non_empty(&["GH_TOKEN", "GITHUB_TOKEN"]).is_none() {
    tracing::debug!("no GitHub token, not reporting the failure");
    return;
  }

  if let Err(report_err) = announce_failure(&package.step_context(ctx, None), package.manifest.fail_title(), err) {
    tracing::warn!(error = %report_err, "could not report the failed release on GitHub");
  }
}
