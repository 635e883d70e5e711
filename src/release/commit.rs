//! Conventional commit parsing
//!
//! Uses winnow for the header (`<type>(<scope>)!: <description>`) and a
//! line scan for the footers, which carry breaking changes and issue
//! references (`Closes #12`). Messages that don't follow the convention
//! parse to `None` and never trigger a release.

use serde::Serialize;
use std::fmt;

/// A parsed conventional commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
  pub commit_type: CommitType,
  pub scope: Option<String>,
  pub description: String,
  /// `Some("")` for a bare `!`, `Some(text)` for a `BREAKING CHANGE:` footer
  pub breaking_change: Option<String>,
  /// Issues closed by the commit, e.g. `#12` or `atom/tabs#7`
  pub references: Vec<String>,
}

/// Footer keywords that close an issue
const CLOSING_KEYWORDS: &[&str] = &[
  "close", "closes", "closed", "fix", "fixes", "fixed", "resolve", "resolves", "resolved",
];

/// Conventional commit types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
  Feat,
  Fix,
  Perf,
  Revert,
  Docs,
  Style,
  Refactor,
  Test,
  Build,
  Ci,
  Chore,
  Other,
}

impl CommitType {
  /// Parse commit type from its header keyword (case-insensitive)
  pub fn from_keyword(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "feat" | "feature" => Self::Feat,
      "fix" => Self::Fix,
      "perf" => Self::Perf,
      "revert" => Self::Revert,
      "docs" | "doc" => Self::Docs,
      "style" => Self::Style,
      "refactor" => Self::Refactor,
      "test" | "tests" => Self::Test,
      "build" => Self::Build,
      "ci" => Self::Ci,
      "chore" => Self::Chore,
      _ => Self::Other,
    }
  }

  /// Section title in release notes
  pub fn display_name(&self) -> &'static str {
    match self {
      Self::Feat => "Features",
      Self::Fix => "Bug Fixes",
      Self::Perf => "Performance Improvements",
      Self::Revert => "Reverts",
      Self::Docs => "Documentation",
      Self::Style => "Style",
      Self::Refactor => "Refactoring",
      Self::Test => "Tests",
      Self::Build => "Build",
      Self::Ci => "CI",
      Self::Chore => "Chores",
      Self::Other => "Other",
    }
  }
}

impl fmt::Display for CommitType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.display_name())
  }
}

impl ConventionalCommit {
  pub fn is_breaking(&self) -> bool {
    self.breaking_change.is_some()
  }

  /// Parse a conventional commit from a full git commit message
  pub fn parse(message: &str) -> Option<Self> {
    use winnow::ascii::{alphanumeric1, space0};
    use winnow::combinator::{opt, preceded, terminated};
    use winnow::prelude::*;
    use winnow::token::take_till;

    let (first_line, rest) = message.split_once('\n').unwrap_or((message, ""));

    let mut header = (
      alphanumeric1::<_, ()>.map(CommitType::from_keyword),
      opt(preceded('(', terminated(take_till(1.., ')'), ')'))),
      opt('!'),
      ':',
      space0,
      take_till(0.., ['\n', '\r']),
    );

    let Ok((commit_type, scope, bang, _, _, description)) = header.parse(first_line.trim_end()) else {
      return None;
    };

    let description = description.trim();
    if description.is_empty() {
      return None;
    }

    let mut breaking_change = None;
    let mut references = Vec::new();
    let mut seen_empty_line = false;

    for line in rest.lines() {
      let trimmed = line.trim();
      if trimmed.is_empty() {
        seen_empty_line = true;
        continue;
      }
      // Footers only after a blank line
      if !seen_empty_line {
        continue;
      }

      if let Some((key, value)) = trimmed.split_once(':')
        && (key.trim().eq_ignore_ascii_case("BREAKING CHANGE") || key.trim().eq_ignore_ascii_case("BREAKING-CHANGE"))
      {
        breaking_change = Some(value.trim().to_string());
        continue;
      }

      references.extend(closing_references(trimmed));
    }

    if breaking_change.is_none() && bang.is_some() {
      breaking_change = Some(String::new());
    }

    Some(Self {
      commit_type,
      scope: scope.map(|s: &str| s.to_string()),
      description: description.to_string(),
      breaking_change,
      references,
    })
  }
}

/// Issue references of a `Closes #1, #2` or `Fixes: owner/repo#3` footer line
fn closing_references(line: &str) -> Vec<String> {
  let (keyword, rest) = line.split_once([' ', ':']).unwrap_or((line, ""));
  if !CLOSING_KEYWORDS.contains(&keyword.to_ascii_lowercase().as_str()) {
    return Vec::new();
  }

  rest
    .split(|c: char| c == ',' || c.is_whitespace())
    .map(|token| token.trim_matches(|c: char| c == ':' || c == '.'))
    .filter(|token| is_issue_reference(token))
    .map(str::to_string)
    .collect()
}

fn is_issue_reference(token: &str) -> bool {
  match token.rsplit_once('#') {
    Some((repo, number)) => {
      !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && (repo.is_empty() || (repo.split('/').count() == 2 && !repo.contains(char::is_whitespace)))
    }
    None => false,
  }
}
