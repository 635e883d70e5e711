//! Release tags: rendering, parsing and last-release lookup

use crate::core::error::ReleaseResult;
use crate::core::vcs::SystemGit;
use semver::Version;
use serde::Serialize;

/// Tag name template with exactly one `{version}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFormat {
  prefix: String,
  suffix: String,
}

impl TagFormat {
  /// Build from a template already checked by config validation.
  /// A template without `{version}` is treated as a pure prefix.
  pub fn new(template: &str) -> Self {
    let (prefix, suffix) = template.split_once("{version}").unwrap_or((template, ""));
    Self {
      prefix: prefix.to_string(),
      suffix: suffix.to_string(),
    }
  }

  /// Tag name for a version
  pub fn render(&self, version: &Version) -> String {
    format!("{}{}{}", self.prefix, version, self.suffix)
  }

  /// Version encoded in a tag name, if the tag matches this format.
  /// Prerelease tags are ignored: this preset releases from a single channel.
  pub fn parse(&self, tag: &str) -> Option<Version> {
    let version = tag.strip_prefix(&self.prefix)?.strip_suffix(&self.suffix)?;
    let version = Version::parse(version).ok()?;
    version.pre.is_empty().then_some(version)
  }
}

/// The most recent release reachable from HEAD
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastRelease {
  pub version: Version,
  pub tag: String,
  pub sha: String,
}

/// Highest-versioned tag matching `format` that is merged into HEAD
pub fn last_release(git: &SystemGit, format: &TagFormat) -> ReleaseResult<Option<LastRelease>> {
  let tags = git.tags_merged_into_head()?;
  let Some((version, tag)) = highest(&tags, format) else {
    tracing::debug!(tags = tags.len(), "no release tag reachable from HEAD");
    return Ok(None);
  };

  let sha = git.tag_commit(&tag)?;
  tracing::debug!(%tag, %sha, "found last release");
  Ok(Some(LastRelease { version, tag, sha }))
}

fn highest(tags: &[String], format: &TagFormat) -> Option<(Version, String)> {
  tags
    .iter()
    .filter_map(|tag| format.parse(tag).map(|v| (v, tag.clone())))
    .max_by(|(a, _), (b, _)| a.cmp(b))
}
