//! Check runner for executing preconditions

use super::trait_def::{Check, Precondition};
use crate::core::env::ReleaseEnv;
use crate::core::error::ReleaseResult;

/// Runs checks one at a time, in the order they were added
pub struct CheckRunner {
  checks: Vec<Box<dyn Check>>,
}

impl CheckRunner {
  /// Create a new check runner
  pub fn new() -> Self {
    Self { checks: Vec::new() }
  }

  /// Build a runner from declared preconditions, preserving order
  pub fn from_preconditions(preconditions: &[Precondition]) -> Self {
    let mut runner = Self::new();
    for precondition in preconditions {
      runner.add_check(precondition.to_check());
    }
    runner
  }

  /// Add a check to the runner
  pub fn add_check(&mut self, check: Box<dyn Check>) {
    self.checks.push(check);
  }

  /// Run every check; the first failure aborts and is returned unchanged.
  ///
  /// Returns the names of the checks that ran, all of which passed.
  pub fn run_all(&self, env: &ReleaseEnv) -> ReleaseResult<Vec<&str>> {
    let mut passed = Vec::with_capacity(self.checks.len());

    for check in &self.checks {
      tracing::debug!(check = check.name(), description = check.description(), "running precondition");
      check.run(env)?;
      passed.push(check.name());
    }

    Ok(passed)
  }

  /// Get all registered checks
  pub fn checks(&self) -> &[Box<dyn Check>] {
    &self.checks
  }
}

impl Default for CheckRunner {
  fn default() -> Self {
    Self::new()
  }
}
