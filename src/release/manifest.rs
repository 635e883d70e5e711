//! Package manifest (package.json)
//!
//! The manifest is edited as a `serde_json::Value` with `preserve_order`, so
//! rewriting the version leaves key order, unknown fields and the detected
//! indentation untouched.

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, ResultExt};
use semver::Version;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Failure issue title when the manifest doesn't set one
pub const DEFAULT_FAIL_TITLE: &str = "The automated release is failing 🚨";

/// A loaded package.json
#[derive(Debug, Clone)]
pub struct Manifest {
  path: PathBuf,
  fields: Map<String, Value>,
  indent: String,
  trailing_newline: bool,
}

impl Manifest {
  /// Load and parse the manifest at `path`
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    if !path.exists() {
      return Err(ReleaseError::Config(ConfigError::ManifestNotFound {
        path: path.to_path_buf(),
      }));
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(path, &content)
  }

  fn parse(path: &Path, content: &str) -> ReleaseResult<Self> {
    let invalid = |reason: String| {
      ReleaseError::Config(ConfigError::ManifestInvalid {
        path: path.to_path_buf(),
        reason,
      })
    };

    let value: Value = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(fields) = value else {
      return Err(invalid("top-level value must be an object".to_string()));
    };

    Ok(Self {
      path: path.to_path_buf(),
      fields,
      indent: detect_indent(content),
      trailing_newline: content.ends_with('\n'),
    })
  }

  /// Package name, if present and non-empty
  pub fn name(&self) -> Option<&str> {
    self.fields.get("name").and_then(Value::as_str).filter(|s| !s.trim().is_empty())
  }

  /// Package name, or a ManifestInvalid error
  pub fn require_name(&self) -> ReleaseResult<&str> {
    self.name().ok_or_else(|| {
      ReleaseError::Config(ConfigError::ManifestInvalid {
        path: self.path.clone(),
        reason: "missing \"name\" field".to_string(),
      })
    })
  }

  pub fn version(&self) -> Option<&str> {
    self.fields.get("version").and_then(Value::as_str)
  }

  /// Repository URL: `"repository": "<url>"` or `"repository": { "url": "<url>" }`
  pub fn repository_url(&self) -> Option<&str> {
    match self.fields.get("repository")? {
      Value::String(url) => Some(url.as_str()),
      Value::Object(repo) => repo.get("url").and_then(Value::as_str),
      _ => None,
    }
    .filter(|url| !url.trim().is_empty())
  }

  /// Title of the issue opened when a release fails: `release.failTitle`
  pub fn fail_title(&self) -> &str {
    self
      .fields
      .get("release")
      .and_then(|release| release.get("failTitle"))
      .and_then(Value::as_str)
      .filter(|title| !title.trim().is_empty())
      .unwrap_or(DEFAULT_FAIL_TITLE)
  }

  /// Set `version`, keeping its position when it already exists
  pub fn set_version(&mut self, version: &Version) {
    self
      .fields
      .insert("version".to_string(), Value::String(version.to_string()));
  }

  /// Serialize with the original indentation
  pub fn render(&self) -> ReleaseResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(self.indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    self.fields.serialize(&mut serializer)?;

    let mut out = String::from_utf8(buf)?;
    if self.trailing_newline {
      out.push('\n');
    }
    Ok(out)
  }

  /// Write the manifest back to disk
  pub fn save(&self) -> ReleaseResult<()> {
    let content = self.render()?;
    fs::write(&self.path, content).with_context(|| format!("Failed to write {}", self.path.display()))?;
    tracing::debug!(path = %self.path.display(), "manifest written");
    Ok(())
  }
}

/// Leading whitespace of the first indented line, two spaces by default
fn detect_indent(content: &str) -> String {
  content
    .lines()
    .skip(1)
    .map(|line| {
      let trimmed = line.trim_start_matches([' ', '\t']);
      &line[..line.len() - trimmed.len()]
    })
    .find(|indent| !indent.is_empty())
    .unwrap_or("  ")
    .to_string()
}
