//! `apm-release verify`: preconditions and the verify phase

use super::{Package, open_repository, run_preconditions};
use crate::core::context::ReleaseContext;
use crate::core::error::ReleaseResult;
use crate::pipeline::{Phase, PipelineRunner, StepOutcome};

/// Run the verify command
pub fn run_verify(ctx: &ReleaseContext) -> ReleaseResult<Vec<StepOutcome>> {
  let git = open_repository(ctx)?;
  run_preconditions(ctx)?;
  let package = Package::load(ctx, git)?;

  let outcomes = PipelineRunner::new(&ctx.pipeline).run_phase(Phase::Verify, &package.step_context(ctx, None))?;
  for outcome in &outcomes {
    match &outcome.detail {
      Some(detail) => println!("✅ {} ({})", outcome.step, detail),
      None => println!("✅ {}", outcome.step),
    }
  }
  println!("✅ {} is ready to release", package.name);

  Ok(outcomes)
}
