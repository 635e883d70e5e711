use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, ResultExt};
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for apm-release
///
/// Searched in order: release.toml, .release.toml, .config/release.toml.
/// Every field has a default; with no file at all the apm preset applies.
///
/// # Example
///
/// ```toml
/// branch = "main"
/// commit_message = "chore(release): {version}"
///
/// [git_identity]
/// name = "release-bot"
/// email = "release-bot@example.com"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
  /// Branch releases are cut from
  pub branch: String,

  /// Tag name template, must contain `{version}` exactly once
  pub tag_format: String,

  /// Package manifest, relative to the package root
  pub manifest: PathBuf,

  /// Changelog file, relative to the package root
  pub changelog_file: PathBuf,

  /// Release commit subject template
  pub commit_message: String,

  /// Registry publish command template
  pub publish_cmd: String,

  /// CLI that must be installed
  pub tool: String,

  /// Environment variable holding the registry token
  pub token_env: String,

  /// Author and committer of the release commit
  pub git_identity: GitIdentity,

  /// Full pipeline override. When absent the preset is built from the fields above.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pipeline: Option<Pipeline>,
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      branch: "master".to_string(),
      tag_format: "v{version}".to_string(),
      manifest: PathBuf::from("package.json"),
      changelog_file: PathBuf::from("CHANGELOG.md"),
      commit_message: "chore(release): {version} [skip ci]".to_string(),
      publish_cmd: "apm publish --tag {tag}".to_string(),
      tool: "apm".to_string(),
      token_env: "ATOM_ACCESS_TOKEN".to_string(),
      git_identity: GitIdentity::default(),
      pipeline: None,
    }
  }
}

/// Name and email used for the release commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitIdentity {
  pub name: String,
  pub email: String,
}

impl Default for GitIdentity {
  fn default() -> Self {
    Self {
      name: "apm-release-bot".to_string(),
      email: "apm-release-bot@users.noreply.github.com".to_string(),
    }
  }
}

impl ReleaseConfig {
  /// Find config file in search order: release.toml, .release.toml, .config/release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("release.toml"),
      path.join(".release.toml"),
      path.join(".config").join("release.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, falling back to the preset defaults when no file exists
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      tracing::debug!(root = %path.display(), "no release.toml found, using preset defaults");
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: ReleaseConfig = toml_edit::de::from_str(&content).map_err(|e| {
      ReleaseError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: e.to_string(),
      })
    })?;

    config.validate().map_err(|e| match e {
      ReleaseError::Message { message, .. } => ReleaseError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: message,
      }),
      other => other,
    })?;

    tracing::debug!(path = %config_path.display(), "loaded release config");
    Ok(config)
  }

  /// Validate field values and, when present, the pipeline override
  pub fn validate(&self) -> ReleaseResult<()> {
    if self.branch.trim().is_empty() {
      return Err(ReleaseError::message("'branch' must not be empty"));
    }

    if self.tag_format.matches("{version}").count() != 1 {
      return Err(ReleaseError::message(format!(
        "'tag_format' must contain {{version}} exactly once (got '{}')",
        self.tag_format
      )));
    }

    if self.tag_format.chars().any(char::is_whitespace) {
      return Err(ReleaseError::message(format!(
        "'tag_format' must not contain whitespace (got '{}')",
        self.tag_format
      )));
    }

    if self.tool.trim().is_empty() || self.token_env.trim().is_empty() {
      return Err(ReleaseError::message("'tool' and 'token_env' must not be empty"));
    }

    if let Some(pipeline) = &self.pipeline {
      pipeline.validate()?;
    }

    Ok(())
  }

  /// The pipeline to execute: the override if configured, the preset otherwise
  pub fn resolve_pipeline(&self) -> Pipeline {
    self.pipeline.clone().unwrap_or_else(|| Pipeline::preset(self))
  }
}
