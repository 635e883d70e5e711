//! Release notes and the changelog file
//!
//! Notes are one markdown section per release, grouped by commit type.
//! The same text is prepended to CHANGELOG.md and used as the GitHub
//! release body.

use super::commit::{CommitType, ConventionalCommit};
use crate::core::error::{ReleaseResult, ResultExt};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Section order in rendered notes
const SECTION_ORDER: &[CommitType] = &[
  CommitType::Feat,
  CommitType::Fix,
  CommitType::Perf,
  CommitType::Revert,
  CommitType::Docs,
  CommitType::Refactor,
  CommitType::Test,
  CommitType::Build,
  CommitType::Ci,
  CommitType::Chore,
  CommitType::Style,
  CommitType::Other,
];

/// Notes for a single release
#[derive(Debug, Clone)]
pub struct ReleaseNotes {
  pub version: String,
  /// Release date (YYYY-MM-DD)
  pub date: String,
  commits_by_type: BTreeMap<CommitType, Vec<ConventionalCommit>>,
}

impl ReleaseNotes {
  pub fn new(version: String, date: String) -> Self {
    Self {
      version,
      date,
      commits_by_type: BTreeMap::new(),
    }
  }

  pub fn add_commit(&mut self, commit: ConventionalCommit) {
    self.commits_by_type.entry(commit.commit_type).or_default().push(commit);
  }

  /// Render as markdown
  pub fn to_markdown(&self) -> String {
    let mut output = format!("## [{}] - {}\n\n", self.version, self.date);

    for commit_type in SECTION_ORDER {
      let Some(commits) = self.commits_by_type.get(commit_type) else {
        continue;
      };
      if commits.is_empty() {
        continue;
      }

      output.push_str(&format!("### {}\n\n", commit_type.display_name()));

      for commit in commits {
        let scope = commit.scope.as_ref().map(|s| format!("**{}**: ", s)).unwrap_or_default();
        let closes = if commit.references.is_empty() {
          String::new()
        } else {
          format!(", closes {}", commit.references.join(", "))
        };
        output.push_str(&format!("- {}{}{}\n", scope, commit.description, closes));

        match commit.breaking_change.as_deref() {
          Some("") => output.push_str("  - **BREAKING CHANGE**\n"),
          Some(breaking) => output.push_str(&format!("  - **BREAKING**: {}\n", breaking)),
          None => {}
        }
      }

      output.push('\n');
    }

    output
  }
}

/// Prepend `entry` to the changelog at `path`, creating it when missing
///
/// An existing `# Changelog` header (and the paragraph after it) stays on top.
pub fn prepend_entry(path: &Path, package_name: &str, entry: &str) -> ReleaseResult<()> {
  let existing = if path.exists() {
    fs::read_to_string(path).with_context(|| format!("Failed to read changelog {}", path.display()))?
  } else {
    format!(
      "# Changelog\n\nAll notable changes to {} will be documented in this file.\n\n",
      package_name
    )
  };

  let updated = insert_entry(&existing, entry);

  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  fs::write(path, updated).with_context(|| format!("Failed to write changelog {}", path.display()))?;

  Ok(())
}

fn insert_entry(existing: &str, entry: &str) -> String {
  if !existing.starts_with("# Changelog") {
    return format!("{}{}", entry, existing);
  }

  // Header is the title plus its intro paragraph
  let header_end = existing
    .find("\n\n")
    .map(|title_end| {
      let after_title = title_end + 2;
      if existing[after_title..].starts_with("## ") {
        after_title
      } else {
        existing[after_title..]
          .find("\n\n")
          .map(|p| after_title + p + 2)
          .unwrap_or(existing.len())
      }
    })
    .unwrap_or(existing.len());

  let (header, rest) = existing.split_at(header_end);
  let separator = if header.ends_with("\n\n") {
    ""
  } else if header.ends_with('\n') {
    "\n"
  } else {
    "\n\n"
  };
  format!("{}{}{}{}", header, separator, entry, rest)
}
