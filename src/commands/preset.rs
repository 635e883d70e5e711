//! `apm-release preset`: print the resolved pipeline

use crate::core::context::ReleaseContext;
use crate::core::error::ReleaseResult;
use crate::pipeline::Pipeline;
use serde::Serialize;

/// Same shape as the `[pipeline]` table in release.toml
#[derive(Serialize)]
struct PresetDocument<'a> {
  pipeline: &'a Pipeline,
}

/// Render the pipeline as release.toml content, or as JSON
pub fn render_preset(pipeline: &Pipeline, json: bool) -> ReleaseResult<String> {
  let document = PresetDocument { pipeline };
  if json {
    Ok(serde_json::to_string_pretty(&document)?)
  } else {
    Ok(toml_edit::ser::to_string_pretty(&document)?)
  }
}

/// Run the preset command
pub fn run_preset(ctx: &ReleaseContext, json: bool) -> ReleaseResult<()> {
  print!("{}", render_preset(&ctx.pipeline, json)?);
  if json {
    println!();
  }
  Ok(())
}
