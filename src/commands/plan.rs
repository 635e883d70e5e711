//! `apm-release plan`: what the next release would be

use crate::core::context::ReleaseContext;
use crate::core::error::ReleaseResult;
use crate::core::vcs::SystemGit;
use crate::release::{ReleasePlan, VersionBump};

/// Run the plan command
pub fn run_plan(ctx: &ReleaseContext, json: bool) -> ReleaseResult<()> {
  let git = SystemGit::open(&ctx.root, &ctx.env)?;
  let plan = ReleasePlan::analyze(&git, &ctx.tag_format())?;

  if json {
    println!("{}", serde_json::to_string_pretty(&plan)?);
  } else {
    print_plan(&plan);
  }

  Ok(())
}

fn print_plan(plan: &ReleasePlan) {
  println!("📋 Release Plan");
  println!();

  match &plan.last_release {
    Some(last) => println!("   Last release: {} ({})", last.version, last.tag),
    None => println!("   Last release: none (first release)"),
  }

  let Some(next) = &plan.next_release else {
    println!("   Next release: none ({} commit(s), none relevant)", plan.commits.len());
    return;
  };

  let icon = match next.bump {
    VersionBump::Major => "🔴",
    VersionBump::Minor => "🟡",
    VersionBump::Patch | VersionBump::None => "🟢",
  };
  println!("   Next release: {} {} ({}, tag {})", icon, next.version, next.bump, next.tag);
  println!("   Changes:      {} commit(s)", plan.commits.len());
  println!();

  for commit in &plan.commits {
    let short = &commit.sha[..commit.sha.len().min(7)];
    let breaking = if commit.breaking { " [BREAKING]" } else { "" };
    println!("   {} {}{}", short, commit.subject, breaking);
  }
}
