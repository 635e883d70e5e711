//! `manifest` step: package.json version, optional npm publish

use super::StepContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::release::Manifest;
use std::process::Command;

const STEP: &str = "manifest";

/// Manifest must load and carry a name
pub fn verify(publish: bool, ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let manifest = Manifest::load(&ctx.release.manifest_path())?;
  let name = manifest.require_name()?;

  if publish && ctx.release.env.non_empty("NPM_TOKEN").is_none() {
    return Err(ReleaseError::step(STEP, "The environment variable NPM_TOKEN is required to publish to npm."));
  }

  Ok(Some(format!("{}@{}", name, manifest.version().unwrap_or("<unversioned>"))))
}

/// Write the next version; publish to npm when asked
pub fn publish(publish: bool, ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let next = ctx.require_next(STEP)?;

  let mut manifest = Manifest::load(&ctx.release.manifest_path())?;
  manifest.set_version(&next.version);
  manifest.save()?;
  println!("📦 Wrote version {} to {}", next.version, ctx.release.config.manifest.display());

  if publish {
    npm_publish(ctx)?;
  }

  Ok(Some(next.version.to_string()))
}

fn npm_publish(ctx: &StepContext<'_>) -> ReleaseResult<()> {
  tracing::debug!(root = %ctx.release.root.display(), "npm publish");
  let mut cmd = Command::new("npm");
  ctx.release.env.apply_all(&mut cmd);
  let status = cmd
    .arg("publish")
    .current_dir(&ctx.release.root)
    .status()
    .map_err(|e| ReleaseError::step(STEP, format!("failed to run npm publish: {}", e)))?;

  if !status.success() {
    return Err(ReleaseError::step(STEP, format!("npm publish exited with {}", status)));
  }
  Ok(())
}
