//! CLI availability check

use super::trait_def::Check;
use crate::core::env::ReleaseEnv;
use crate::core::error::{PreconditionError, ReleaseError, ReleaseResult};
use std::process::{Command, Stdio};

/// Verifies a CLI is installed by running its version probe
///
/// Only a successful execution counts. A same-named file that is not
/// executable, a missing binary and a probe exiting non-zero all fail.
pub struct ToolInstalledCheck {
  tool: String,
  probe_args: Vec<String>,
  name: String,
  description: String,
}

impl ToolInstalledCheck {
  pub fn new(tool: String, probe_args: Vec<String>) -> Self {
    let name = format!("{}-installed", tool);
    let description = format!("`{} {}` exits successfully", tool, probe_args.join(" "));
    Self {
      tool,
      probe_args,
      name,
      description,
    }
  }

  fn not_installed(&self) -> ReleaseError {
    ReleaseError::Precondition(PreconditionError::ToolNotInstalled {
      tool: self.tool.clone(),
    })
  }
}

impl Check for ToolInstalledCheck {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn run(&self, env: &ReleaseEnv) -> ReleaseResult<()> {
    let mut cmd = Command::new(&self.tool);
    env.apply_all(&mut cmd);
    cmd
      .args(&self.probe_args)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null());

    match cmd.status() {
      Ok(status) if status.success() => Ok(()),
      Ok(status) => {
        tracing::debug!(tool = %self.tool, %status, "version probe exited non-zero");
        Err(self.not_installed())
      }
      Err(err) => {
        tracing::debug!(tool = %self.tool, error = %err, "version probe could not be spawned");
        Err(self.not_installed())
      }
    }
  }
}
