mod checks;
mod commands;
mod core;
mod logging;
mod pipeline;
mod release;
mod utils;

use clap::{Parser, Subcommand};
use core::context::ReleaseContext;
use core::env::ReleaseEnv;
use core::error::{ReleaseError, print_error};
use std::path::PathBuf;

/// Release Atom packages: check, changelog, version, tag, apm publish, GitHub release
#[derive(Parser)]
#[command(name = "apm-release")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Package directory (defaults to the current directory)
  #[arg(long, global = true, value_name = "DIR")]
  cwd: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the full release: preconditions, verify, analyze, publish
  Run {
    /// Stop after analysis and print the release notes
    #[arg(long)]
    dry_run: bool,
  },

  /// Run preconditions and verify steps only
  Verify,

  /// Show the next release without checking or changing anything
  Plan {
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the resolved pipeline (TOML, pasteable into release.toml)
  Preset {
    /// Output the pipeline in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  logging::init();

  // The only place the process environment is read
  let env = ReleaseEnv::capture();

  let root = match cli.cwd {
    Some(dir) => dir,
    None => match std::env::current_dir() {
      Ok(dir) => dir,
      Err(e) => handle_error(ReleaseError::message(format!("Failed to get current directory: {}", e))),
    },
  };

  let ctx = match ReleaseContext::build(&root, env) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Run { dry_run } => commands::run_release(&ctx, dry_run).map(|report| {
      tracing::debug!(steps = report.steps.len(), skipped = ?report.skipped, "run finished");
    }),
    Commands::Verify => commands::run_verify(&ctx).map(|_| ()),
    Commands::Plan { json } => commands::run_plan(&ctx, json),
    Commands::Preset { json } => commands::run_preset(&ctx, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
