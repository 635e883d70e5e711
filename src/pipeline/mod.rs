//! Release step pipeline
//!
//! A pipeline is data: preconditions, then an ordered list of steps for the
//! verify phase and another for the publish phase. Each step is a tagged
//! variant carrying its own parameters; `runner::PipelineRunner` interprets
//! the list one step at a time.
//!
//! # Ordering rules (publish phase)
//!
//! - `changelog` runs before `git`, so the release commit captures it
//! - `manifest` runs before `git`, so the release commit captures the version
//! - `git` runs before `exec`, so the publish command sees the pushed tag
//! - `github` runs last, after the tag and the package exist
//!
//! Verify steps never change state, so `exec` is rejected there.
//!
//! Failure in any step stops the phase. Completed steps are not rolled back.

pub mod runner;
pub mod steps;

use crate::checks::Precondition;
use crate::core::config::ReleaseConfig;
use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use crate::utils::template_placeholders;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use runner::{PipelineRunner, RunReport, StepOutcome};

/// Placeholders available to publish-phase templates
pub const PUBLISH_PLACEHOLDERS: &[&str] = &["version", "tag", "branch", "name"];
/// Placeholders available to verify-phase templates
pub const VERIFY_PLACEHOLDERS: &[&str] = &["branch", "name"];

/// Lifecycle phase a step runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Verify,
  Publish,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Verify => write!(f, "verify"),
      Phase::Publish => write!(f, "publish"),
    }
  }
}

/// One declared step with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Step {
  /// Prepend release notes to the changelog file
  Changelog {
    #[serde(default = "default_changelog_file")]
    file: PathBuf,
  },

  /// Write the next version into the package manifest; optionally `npm publish`
  Manifest {
    #[serde(default)]
    publish: bool,
  },

  /// Commit assets, tag the commit and push both
  Git {
    #[serde(default = "default_commit_message")]
    message: String,
    #[serde(default = "default_assets")]
    assets: Vec<PathBuf>,
  },

  /// Run a command template
  Exec { cmd: String },

  /// Create a GitHub release for the tag
  Github,
}

fn default_changelog_file() -> PathBuf {
  ReleaseConfig::default().changelog_file
}

fn default_commit_message() -> String {
  ReleaseConfig::default().commit_message
}

fn default_assets() -> Vec<PathBuf> {
  let config = ReleaseConfig::default();
  vec![config.changelog_file, config.manifest]
}

impl Step {
  /// Step identifier, as written in the `step` tag
  pub fn name(&self) -> &'static str {
    match self {
      Step::Changelog { .. } => "changelog",
      Step::Manifest { .. } => "manifest",
      Step::Git { .. } => "git",
      Step::Exec { .. } => "exec",
      Step::Github => "github",
    }
  }

  /// Templates this step renders when run in `phase`
  ///
  /// The git step only renders its commit message when publishing.
  fn templates(&self, phase: Phase) -> Vec<&str> {
    match (self, phase) {
      (Step::Git { message, .. }, Phase::Publish) => vec![message.as_str()],
      (Step::Exec { cmd }, _) => vec![cmd.as_str()],
      _ => vec![],
    }
  }

  /// Whether the step only reads state in the verify phase
  fn is_read_only_in_verify(&self) -> bool {
    !matches!(self, Step::Exec { .. })
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Step::Exec { cmd } => write!(f, "exec `{}`", cmd),
      Step::Manifest { publish: false } => write!(f, "manifest (no registry publish)"),
      other => write!(f, "{}", other.name()),
    }
  }
}

/// Full declaration: preconditions, verify steps, publish steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
  #[serde(default)]
  pub checks: Vec<Precondition>,
  #[serde(default)]
  pub verify: Vec<Step>,
  #[serde(default)]
  pub publish: Vec<Step>,
}

impl Pipeline {
  /// The apm preset, parameterised by the configuration
  pub fn preset(config: &ReleaseConfig) -> Self {
    Self {
      checks: vec![Precondition::tool(&config.tool), Precondition::env(&config.token_env)],
      verify: vec![
        Step::Manifest { publish: false },
        Step::Changelog {
          file: config.changelog_file.clone(),
        },
        Step::Git {
          message: config.commit_message.clone(),
          assets: vec![config.changelog_file.clone(), config.manifest.clone()],
        },
        Step::Github,
      ],
      publish: vec![
        Step::Changelog {
          file: config.changelog_file.clone(),
        },
        Step::Manifest { publish: false },
        Step::Git {
          message: config.commit_message.clone(),
          assets: vec![config.changelog_file.clone(), config.manifest.clone()],
        },
        Step::Exec {
          cmd: config.publish_cmd.clone(),
        },
        Step::Github,
      ],
    }
  }

  /// Steps of one phase
  pub fn steps(&self, phase: Phase) -> &[Step] {
    match phase {
      Phase::Verify => &self.verify,
      Phase::Publish => &self.publish,
    }
  }

  /// Whether any phase talks to GitHub, which turns on the success and failure reports
  pub fn uses_github(&self) -> bool {
    self.verify.iter().chain(&self.publish).any(|step| matches!(step, Step::Github))
  }

  /// Check the ordering rules and template placeholders
  pub fn validate(&self) -> ReleaseResult<()> {
    let position = |name: &str| self.publish.iter().position(|s| s.name() == name);

    let git = position("git");
    for earlier in ["changelog", "manifest"] {
      if let (Some(step), Some(git)) = (position(earlier), git)
        && step > git
      {
        return Err(pipeline_error(format!(
          "publish step '{}' must run before 'git' so the release commit includes it",
          earlier
        )));
      }
    }

    if let (Some(git), Some(exec)) = (git, position("exec"))
      && exec < git
    {
      return Err(pipeline_error(
        "publish step 'exec' must run after 'git' so the tag exists when publishing",
      ));
    }

    if let Some(github) = position("github")
      && github != self.publish.len() - 1
    {
      return Err(pipeline_error("publish step 'github' must be the last step"));
    }

    if self.publish.iter().filter(|s| s.name() == "git").count() > 1 {
      return Err(pipeline_error("publish phase may contain at most one 'git' step"));
    }

    for step in &self.publish {
      check_placeholders(step, Phase::Publish, PUBLISH_PLACEHOLDERS)?;
    }

    for step in &self.verify {
      if !step.is_read_only_in_verify() {
        return Err(pipeline_error(format!(
          "verify step '{}' may change state; it is only allowed in the publish phase",
          step.name()
        )));
      }
      check_placeholders(step, Phase::Verify, VERIFY_PLACEHOLDERS)?;
    }

    Ok(())
  }
}

fn check_placeholders(step: &Step, phase: Phase, allowed: &[&str]) -> ReleaseResult<()> {
  for template in step.templates(phase) {
    if let Some(unknown) = template_placeholders(template)
      .into_iter()
      .find(|p| !allowed.contains(p))
    {
      return Err(pipeline_error(format!(
        "{} step '{}' uses {{{}}}, which is not available in the {} phase (available: {})",
        phase,
        step.name(),
        unknown,
        phase,
        allowed.join(", ")
      )));
    }
  }
  Ok(())
}

fn pipeline_error(reason: impl Into<String>) -> ReleaseError {
  ReleaseError::Config(ConfigError::Pipeline { reason: reason.into() })
}
