//! Implementation of the `buildmatrix targets` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use buildmatrix_lib::build::matrix;
use buildmatrix_lib::platform::Target;

use super::ProjectArgs;
use crate::output::{print_info, print_json, print_warning};

#[derive(Args, Debug)]
pub struct TargetsArgs {
  #[command(flatten)]
  pub project: ProjectArgs,

  /// Output as JSON
  #[arg(long)]
  pub json: bool,
}

#[derive(Serialize)]
struct BuildTargets {
  binary: String,
  targets: Vec<Target>,
}

pub fn cmd_targets(args: TargetsArgs) -> Result<()> {
  let (_, project) = args.project.load()?;

  let builds: Vec<BuildTargets> = project
    .builds
    .iter()
    .map(|build| BuildTargets {
      binary: build.binary.clone(),
      targets: matrix::expand(build),
    })
    .collect();

  if args.json {
    return print_json(&builds);
  }

  for build in &builds {
    if build.targets.is_empty() {
      print_warning(&format!("{}: no valid targets", build.binary));
      continue;
    }
    print_info(&format!("{} ({} target(s))", build.binary, build.targets.len()));
    for target in &build.targets {
      println!("  {target}");
    }
  }
  Ok(())
}
