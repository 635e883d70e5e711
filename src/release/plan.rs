//! Release analysis: last release, commits since, bump, next version

use super::changelog::ReleaseNotes;
use super::commit::{CommitType, ConventionalCommit};
use super::tags::{LastRelease, TagFormat, last_release};
use crate::core::error::ReleaseResult;
use crate::core::vcs::{CommitInfo, SystemGit};
use semver::Version;
use serde::Serialize;

/// Version bump type based on conventional commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  /// No qualifying commits
  None,
  Patch,
  Minor,
  Major,
}

impl VersionBump {
  /// Apply bump to a semver version
  pub fn apply(&self, version: &Version) -> Version {
    match self {
      VersionBump::Major => Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => Version::new(version.major, version.minor + 1, 0),
      VersionBump::Patch => Version::new(version.major, version.minor, version.patch + 1),
      VersionBump::None => version.clone(),
    }
  }

  /// Bump a single commit asks for
  fn for_commit(commit: &ConventionalCommit) -> Self {
    if commit.is_breaking() {
      return VersionBump::Major;
    }
    match commit.commit_type {
      CommitType::Feat => VersionBump::Minor,
      CommitType::Fix | CommitType::Perf | CommitType::Revert => VersionBump::Patch,
      _ => VersionBump::None,
    }
  }
}

impl std::fmt::Display for VersionBump {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      VersionBump::Major => "major",
      VersionBump::Minor => "minor",
      VersionBump::Patch => "patch",
      VersionBump::None => "none",
    };
    write!(f, "{}", name)
  }
}

/// A commit considered for the release
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseCommit {
  pub sha: String,
  pub subject: String,
  /// `None` for commits that don't follow the convention
  pub commit_type: Option<CommitType>,
  pub breaking: bool,
  pub bump: VersionBump,
}

/// The release about to be made
#[derive(Debug, Clone, Serialize)]
pub struct NextRelease {
  pub version: Version,
  pub tag: String,
  pub bump: VersionBump,
  /// Markdown notes, also used as the GitHub release body
  pub notes: String,
  /// SHAs of every commit since the last release, oldest first
  pub commits: Vec<String>,
}

/// Everything known about the pending release
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
  pub last_release: Option<LastRelease>,
  pub commits: Vec<ReleaseCommit>,
  pub bump: VersionBump,
  /// `None` when no commit qualifies for a release
  pub next_release: Option<NextRelease>,
}

impl ReleasePlan {
  /// Analyze the repository at HEAD
  pub fn analyze(git: &SystemGit, format: &TagFormat) -> ReleaseResult<Self> {
    let last = last_release(git, format)?;
    let commits = git.commits_since(last.as_ref().map(|l| l.sha.as_str()))?;
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();

    tracing::debug!(
      last = last.as_ref().map(|l| l.tag.as_str()).unwrap_or("<none>"),
      commits = commits.len(),
      "analyzing commits"
    );

    Ok(Self::from_commits(last, &commits, format, &date))
  }

  /// Build a plan from already collected history
  pub fn from_commits(last: Option<LastRelease>, commits: &[CommitInfo], format: &TagFormat, date: &str) -> Self {
    let parsed: Vec<(ReleaseCommit, Option<ConventionalCommit>)> = commits
      .iter()
      .map(|info| {
        let conventional = ConventionalCommit::parse(&info.message);
        let commit = ReleaseCommit {
          sha: info.sha.clone(),
          subject: info.subject().to_string(),
          commit_type: conventional.as_ref().map(|c| c.commit_type),
          breaking: conventional.as_ref().is_some_and(ConventionalCommit::is_breaking),
          bump: conventional.as_ref().map(VersionBump::for_commit).unwrap_or(VersionBump::None),
        };
        (commit, conventional)
      })
      .collect();

    let bump = parsed.iter().map(|(c, _)| c.bump).max().unwrap_or(VersionBump::None);

    let next_release = (bump != VersionBump::None).then(|| {
      let version = match &last {
        Some(last) => bump.apply(&last.version),
        None => Version::new(1, 0, 0),
      };

      let mut notes = ReleaseNotes::new(version.to_string(), date.to_string());
      for conventional in parsed.iter().filter_map(|(_, c)| c.clone()) {
        notes.add_commit(conventional);
      }

      NextRelease {
        tag: format.render(&version),
        notes: notes.to_markdown(),
        commits: parsed.iter().map(|(c, _)| c.sha.clone()).collect(),
        version,
        bump,
      }
    });

    Self {
      last_release: last,
      commits: parsed.into_iter().map(|(c, _)| c).collect(),
      bump,
      next_release,
    }
  }
}
