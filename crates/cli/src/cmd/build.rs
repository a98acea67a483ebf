//! Implementation of the `buildmatrix build` command.
//!
//! Runs every build in the project, writes the artifact list into the dist
//! directory and prints a per-target summary.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tracing::info;

use buildmatrix_lib::build::toolchain::Toolchain;
use buildmatrix_lib::consts::{DEFAULT_TOOLCHAIN, ENV_TOOLCHAIN};
use buildmatrix_lib::context::Artifact;
use buildmatrix_lib::execute::{BuildReport, ExecuteConfig, Stage, execute_builds};
use buildmatrix_lib::platform::Target;

use super::{ProjectArgs, ReleaseArgs};
use crate::output::{format_duration, print_artifact, print_error, print_json, print_stat, print_success};

#[derive(Args, Debug)]
pub struct BuildArgs {
  #[command(flatten)]
  pub project: ProjectArgs,

  #[command(flatten)]
  pub release: ReleaseArgs,

  /// Maximum number of targets compiled at once (default: number of CPUs)
  #[arg(short, long)]
  pub parallelism: Option<usize>,

  /// Remove the dist directory before building
  #[arg(long)]
  pub rm_dist: bool,

  /// Go toolchain to invoke
  #[arg(long, env = ENV_TOOLCHAIN, default_value = DEFAULT_TOOLCHAIN)]
  pub toolchain: PathBuf,

  /// Output as JSON
  #[arg(long)]
  pub json: bool,
}

#[derive(Serialize)]
struct BuildSummary<'a> {
  success: bool,
  elapsed_ms: u128,
  artifacts: &'a [Artifact],
  builds: Vec<BuildOutcome>,
}

#[derive(Serialize)]
struct BuildOutcome {
  binary: String,
  stage: Stage,
  failed_at: Option<Stage>,
  targets: Vec<TargetOutcome>,
  error: Option<String>,
}

#[derive(Serialize)]
struct TargetOutcome {
  target: Target,
  path: Option<PathBuf>,
  error: Option<String>,
}

fn outcomes(report: &BuildReport) -> Vec<BuildOutcome> {
  report
    .builds
    .iter()
    .map(|build| BuildOutcome {
      binary: build.binary.clone(),
      stage: build.stage,
      failed_at: build.failed_at,
      targets: build
        .targets
        .iter()
        .map(|t| TargetOutcome {
          target: t.target,
          path: t.result.as_ref().ok().map(|a| a.path.clone()),
          error: t.result.as_ref().err().map(ToString::to_string),
        })
        .collect(),
      error: build.error.as_ref().map(ToString::to_string),
    })
    .collect()
}

/// Delete the dist directory unless it is, or contains, the project root.
fn remove_dist(root: &Path, dist: &Path) -> Result<()> {
  let root = dunce::canonicalize(root).with_context(|| format!("Failed to resolve {}", root.display()))?;
  let dist = dunce::canonicalize(dist).with_context(|| format!("Failed to resolve {}", dist.display()))?;
  if root.starts_with(&dist) {
    bail!("Refusing to remove {}: it contains the project root", dist.display());
  }

  info!(dist = %dist.display(), "removing dist");
  std::fs::remove_dir_all(&dist).with_context(|| format!("Failed to remove {}", dist.display()))
}

pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let (root, project) = args.project.load()?;
  let ctx = args.release.context(root, &project);

  if args.rm_dist && ctx.dist.exists() {
    remove_dist(&ctx.root, &ctx.dist)?;
  }

  let mut config = ExecuteConfig {
    toolchain: Toolchain::new(&args.toolchain),
    ..Default::default()
  };
  if let Some(parallelism) = args.parallelism {
    config.parallelism = parallelism.max(1);
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let report = rt.block_on(async {
    let cancel = config.cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        cancel.cancel();
      }
    });
    execute_builds(&ctx, &project, &config).await
  });
  let elapsed = started.elapsed();

  let artifacts = ctx.artifacts();
  if !artifacts.is_empty() {
    let path = ctx.write_artifacts_json().context("Failed to write artifact list")?;
    info!(path = %path.display(), "artifact list written");
  }

  if args.json {
    print_json(&BuildSummary {
      success: report.is_success(),
      elapsed_ms: elapsed.as_millis(),
      artifacts: &artifacts,
      builds: outcomes(&report),
    })?;
  } else {
    for build in &report.builds {
      println!("{}", build.binary);
      for artifact in build.artifacts() {
        let shown = artifact.path.strip_prefix(&ctx.root).unwrap_or(&artifact.path);
        print_artifact(&artifact.target.to_string(), &shown.display().to_string());
      }
      for failure in build.failures() {
        print_error(&failure.to_string());
      }
    }
    if report.skipped > 0 {
      print_stat("Builds skipped", &report.skipped.to_string());
    }
  }

  let built = report.artifact_count();
  let attempted = report.target_count();
  report.into_result().context("Build failed")?;

  if !args.json {
    print_success(&format!(
      "Built {built} of {attempted} target(s) in {}",
      format_duration(elapsed)
    ));
  }
  Ok(())
}
