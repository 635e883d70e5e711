//! `apm-release plan` reports the next release without side effects

use crate::helpers::{TestPackage, git, run_release};
use anyhow::Result;
use serde_json::Value;

fn plan_json(pkg: &TestPackage) -> Result<Value> {
  // No credentials and no apm: plan must not need either
  let env = vec![("PATH".to_string(), pkg.path_var()?), ("HOME".to_string(), pkg.home.display().to_string())];
  pkg.remove_apm()?;

  let result = run_release(&pkg.path, &["plan", "--json"], &env)?;
  assert!(result.success(), "{}", result.dump());
  Ok(serde_json::from_str(&result.stdout)?)
}

#[test]
fn test_plan_first_release() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.commit_empty("fix: handle empty tabs")?;

  let plan = plan_json(&pkg)?;

  assert!(plan["last_release"].is_null());
  assert_eq!(plan["bump"], "patch");
  assert_eq!(plan["next_release"]["version"], "1.0.0");
  assert_eq!(plan["next_release"]["tag"], "v1.0.0");
  assert_eq!(plan["commits"].as_array().map(Vec::len), Some(2));
  assert!(pkg.head_tags()?.is_empty());
  Ok(())
}

#[test]
fn test_plan_after_existing_tag() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.commit_empty("feat: first feature")?;
  git(&pkg.path, &["tag", "v1.2.3"])?;
  pkg.commit_empty("feat(tabs): drag between panes")?;
  pkg.commit_empty("docs: readme")?;

  let plan = plan_json(&pkg)?;

  assert_eq!(plan["last_release"]["tag"], "v1.2.3");
  assert_eq!(plan["last_release"]["version"], "1.2.3");
  assert_eq!(plan["bump"], "minor");
  assert_eq!(plan["next_release"]["version"], "1.3.0");
  assert_eq!(plan["commits"].as_array().map(Vec::len), Some(2));

  let notes = plan["next_release"]["notes"].as_str().unwrap_or_default();
  assert!(notes.starts_with("## [1.3.0] - "), "{}", notes);
  assert!(notes.contains("- **tabs**: drag between panes"), "{}", notes);
  Ok(())
}

#[test]
fn test_plan_without_relevant_commits() -> Result<()> {
  let pkg = TestPackage::new()?;
  pkg.commit_empty("chore: bump dev dependencies")?;

  let plan = plan_json(&pkg)?;

  assert_eq!(plan["bump"], "none");
  assert!(plan["next_release"].is_null());
  Ok(())
}
