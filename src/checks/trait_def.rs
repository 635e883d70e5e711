//! Check trait abstraction for release preconditions
//!
//! A precondition either passes silently or fails with a
//! `PreconditionError`. Checks never touch the working tree, the
//! repository or the network; they only look at the injected environment
//! and probe external tools.

use crate::core::env::ReleaseEnv;
use crate::core::error::ReleaseResult;
use serde::{Deserialize, Serialize};

/// Declared precondition, as it appears in a pipeline definition
///
/// ```toml
/// [[pipeline.checks]]
/// check = "tool"
/// tool = "apm"
///
/// [[pipeline.checks]]
/// check = "env"
/// variable = "ATOM_ACCESS_TOKEN"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Precondition {
  /// `<tool> <probe_args...>` must exit 0
  Tool {
    tool: String,
    #[serde(default = "default_probe_args")]
    probe_args: Vec<String>,
  },
  /// Environment variable must be set and non-empty
  Env { variable: String },
}

fn default_probe_args() -> Vec<String> {
  vec!["-v".to_string()]
}

impl Precondition {
  /// Tool check with the default `-v` probe
  pub fn tool(tool: impl Into<String>) -> Self {
    Precondition::Tool {
      tool: tool.into(),
      probe_args: default_probe_args(),
    }
  }

  /// Environment variable check
  pub fn env(variable: impl Into<String>) -> Self {
    Precondition::Env {
      variable: variable.into(),
    }
  }

  /// Instantiate the check this declaration describes
  pub fn to_check(&self) -> Box<dyn Check> {
    match self {
      Precondition::Tool { tool, probe_args } => {
        Box::new(super::tool::ToolInstalledCheck::new(tool.clone(), probe_args.clone()))
      }
      Precondition::Env { variable } => Box::new(super::token::EnvPresentCheck::new(variable.clone())),
    }
  }
}

/// Precondition check trait
///
/// Each check implements this trait to provide validation logic.
/// Checks are run in declaration order by the `CheckRunner`.
pub trait Check: Send + Sync {
  /// Unique name for this check (kebab-case)
  fn name(&self) -> &str;

  /// Human-readable description of what this check validates
  fn description(&self) -> &str;

  /// Run the check. `Ok(())` means the precondition holds.
  fn run(&self, env: &ReleaseEnv) -> ReleaseResult<()>;
}
