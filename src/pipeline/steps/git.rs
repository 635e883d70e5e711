//! `git` step: release commit, tag and push

use super::StepContext;
use crate::core::error::ReleaseResult;
use std::path::PathBuf;

const STEP: &str = "git";

fn branch_refspec(ctx: &StepContext<'_>) -> String {
  format!("HEAD:refs/heads/{}", ctx.branch())
}

/// The push target resolves and accepts a dry-run push of the release branch
pub fn verify(ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let target = ctx.push_target()?;

  if ctx.git.has_commits()? {
    ctx.git.push_dry_run(&ctx.push_url()?, &branch_refspec(ctx))?;
  } else {
    tracing::debug!("unborn branch, skipping push dry-run");
  }

  Ok(Some(target))
}

/// Stage assets, commit, tag, push branch then tag
pub fn publish(message: &str, assets: &[PathBuf], ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let next = ctx.require_next(STEP)?;
  let target = ctx.push_target()?;
  let url = ctx.push_url()?;

  let present: Vec<PathBuf> = assets
    .iter()
    .filter(|asset| ctx.release.root.join(asset).exists())
    .cloned()
    .collect();
  if !present.is_empty() {
    ctx.git.add(&present)?;
  }

  if ctx.git.has_staged_changes()? {
    let subject = ctx.render(message);
    let sha = ctx.git.commit(&subject, &ctx.identity())?;
    println!("✅ Committed {} ({})", subject, &sha[..sha.len().min(7)]);
  } else {
    tracing::warn!("no release assets changed, tagging HEAD without a commit");
  }

  let head = ctx.git.head_commit()?;
  ctx.git.create_tag(&next.tag, &head)?;
  println!("🏷️  Created tag {}", next.tag);

  ctx.git.push(&url, &branch_refspec(ctx))?;
  ctx.git.push(&url, &format!("refs/tags/{}", next.tag))?;
  println!("⬆️  Pushed {} and {} to {}", ctx.branch(), next.tag, target);

  Ok(Some(next.tag.clone()))
}
