//! Credential presence check

use super::trait_def::Check;
use crate::core::env::ReleaseEnv;
use crate::core::error::{PreconditionError, ReleaseError, ReleaseResult};

/// Verifies an environment variable is set to a non-empty value
pub struct EnvPresentCheck {
  variable: String,
  name: String,
  description: String,
}

impl EnvPresentCheck {
  pub fn new(variable: String) -> Self {
    let name = format!("{}-set", variable.to_lowercase().replace('_', "-"));
    let description = format!("{} is set and non-empty", variable);
    Self {
      variable,
      name,
      description,
    }
  }
}

impl Check for EnvPresentCheck {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn run(&self, env: &ReleaseEnv) -> ReleaseResult<()> {
    match env.non_empty(&self.variable) {
      Some(_) => Ok(()),
      None => Err(ReleaseError::Precondition(PreconditionError::MissingCredential {
        variable: self.variable.clone(),
      })),
    }
  }
}
