//! Implementation of the `buildmatrix check` command.
//!
//! Loads the config, checks every entry point and renders every name and
//! flag template. Hooks are not run and nothing is compiled.

use anyhow::{Result, bail};
use clap::Args;

use buildmatrix_lib::execute::resolve_build;

use super::{ProjectArgs, ReleaseArgs};
use crate::output::{print_error, print_stat, print_success};

#[derive(Args, Debug)]
pub struct CheckArgs {
  #[command(flatten)]
  pub project: ProjectArgs,

  #[command(flatten)]
  pub release: ReleaseArgs,

  /// Print every resolved target
  #[arg(long)]
  pub list: bool,
}

pub fn cmd_check(args: CheckArgs) -> Result<()> {
  let (root, project) = args.project.load()?;
  let ctx = args.release.context(root, &project);

  let mut failed = 0;
  for build in &project.builds {
    match resolve_build(&ctx, build) {
      Ok(targets) => {
        print_success(&format!("{}: {} target(s)", build.binary, targets.len()));
        if args.list {
          for resolved in &targets {
            print_stat(&resolved.target.to_string(), &resolved.name);
          }
        }
      }
      Err(e) => {
        failed += 1;
        print_error(&format!("{}: {}", build.binary, e));
      }
    }
  }

  if failed > 0 {
    bail!("{failed} build(s) failed validation");
  }
  Ok(())
}
