//! Sequential step executor

use super::steps::{StepContext, execute};
use super::{Phase, Pipeline};
use crate::core::error::ReleaseResult;
use crate::release::plan::{NextRelease, VersionBump};
use serde::Serialize;

/// Record of one completed step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
  pub step: String,
  pub phase: String,
  /// User-facing result, e.g. the release URL
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

/// Summary of a `run` invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  pub package: String,
  pub branch: String,
  pub checks: Vec<String>,
  pub last_release: Option<String>,
  pub bump: Option<VersionBump>,
  pub next_release: Option<NextRelease>,
  pub steps: Vec<StepOutcome>,
  pub dry_run: bool,
  /// Why the run stopped without publishing, if it did
  pub skipped: Option<String>,
}

/// Interprets a pipeline one step at a time
pub struct PipelineRunner<'a> {
  pipeline: &'a Pipeline,
}

impl<'a> PipelineRunner<'a> {
  pub fn new(pipeline: &'a Pipeline) -> Self {
    Self { pipeline }
  }

  /// Run every step of `phase` in declared order; the first failure stops the phase
  pub fn run_phase(&self, phase: Phase, ctx: &StepContext<'_>) -> ReleaseResult<Vec<StepOutcome>> {
    let steps = self.pipeline.steps(phase);
    tracing::info!(%phase, steps = steps.len(), "starting phase");

    let mut outcomes = Vec::with_capacity(steps.len());
    for step in steps {
      tracing::info!(%phase, step = %step, "running step");
      let outcome = execute(step, phase, ctx)?;
      tracing::debug!(step = step.name(), detail = ?outcome.detail, "step completed");
      outcomes.push(outcome);
    }

    Ok(outcomes)
  }
}
