//! `exec` step: run a command template

use super::StepContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use std::process::{Command, Stdio};

const STEP: &str = "exec";

/// Render `template`, split it with shell-word rules and run it directly
///
/// The command inherits stdio and the full injected environment and runs
/// from the package root. A non-zero exit fails the step.
pub fn run(template: &str, ctx: &StepContext<'_>) -> ReleaseResult<Option<String>> {
  let rendered = ctx.render(template);
  let argv = shell_words::split(&rendered)
    .map_err(|e| ReleaseError::step(STEP, format!("cannot parse command `{}`: {}", rendered, e)))?;
  let Some((program, args)) = argv.split_first() else {
    return Err(ReleaseError::step(STEP, "command is empty"));
  };

  println!("🚀 Running `{}`", rendered);
  tracing::debug!(program, ?args, "exec");

  let mut cmd = Command::new(program);
  ctx.release.env.apply_all(&mut cmd);
  let status = cmd
    .args(args)
    .current_dir(&ctx.release.root)
    .stdin(Stdio::null())
    .status()
    .map_err(|e| ReleaseError::step(STEP, format!("failed to run `{}`: {}", rendered, e)))?;

  if !status.success() {
    return Err(ReleaseError::step(STEP, format!("`{}` exited with {}", rendered, status)));
  }

  Ok(Some(rendered))
}
