//! `changelog` step

use super::StepContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::release::changelog::prepend_entry;
use std::path::{Component, Path};

const STEP: &str = "changelog";

/// The changelog must be a non-empty path inside the package
pub fn verify(file: &Path, _ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  if file.as_os_str().is_empty() {
    return Err(ReleaseError::step(STEP, "changelog file name must not be empty"));
  }

  let escapes = file
    .components()
    .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
  if escapes {
    return Err(ReleaseError::step(
      STEP,
      format!("changelog file must be a relative path inside the package (got {})", file.display()),
    ));
  }

  Ok(None)
}

/// Prepend the release notes
pub fn publish(file: &Path, ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let next = ctx.require_next(STEP)?;
  let path = ctx.release.root.join(file);

  prepend_entry(&path, ctx.package_name, &next.notes)?;
  println!("📝 Updated {}", file.display());

  Ok(Some(file.display().to_string()))
}
