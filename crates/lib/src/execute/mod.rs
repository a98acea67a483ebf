//! Build execution.
//!
//! Each build declaration runs through the same stages:
//!
//! 1. pre hook
//! 2. entry point validation
//! 3. target matrix expansion
//! 4. name and flag rendering for every target
//! 5. compiles, in parallel up to [`ExecuteConfig::parallelism`]
//! 6. post hook
//!
//! A failure before compiling stops the build. A failed target does not stop
//! its siblings, and the post hook runs once every target has finished.
//! Builds run one after another; only a missing toolchain or cancellation
//! stops the builds that come after.

pub mod hooks;
pub mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::build::entrypoint::check_main;
use crate::build::matrix;
use crate::build::toolchain::{CompileJob, output_path, package_location};
use crate::config::{BuildSpec, Project};
use crate::context::BuildContext;
use crate::platform::Target;
use crate::template::{self, TemplateError};

pub use hooks::run_hook;
pub use types::{BuildError, BuildReport, BuildSpecReport, ExecuteConfig, HookPhase, Stage, TargetReport};

/// Run every build in `project` and report per-build, per-target outcomes.
///
/// Successful compiles are appended to the context's artifact log as they
/// are collected.
pub async fn execute_builds(ctx: &BuildContext, project: &Project, config: &ExecuteConfig) -> BuildReport {
  info!(
    project = %ctx.project_name,
    build_count = project.builds.len(),
    parallelism = config.parallelism,
    "starting builds"
  );

  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
  let mut report = BuildReport::default();

  for (idx, build) in project.builds.iter().enumerate() {
    let remaining = project.builds.len() - idx - 1;

    if config.cancel.is_cancelled() {
      report.builds.push(BuildSpecReport::new(&build.binary).fail(BuildError::Cancelled));
      report.skipped = remaining;
      break;
    }

    let build_report = execute_build(ctx, build, config, semaphore.clone()).await;
    let fatal = build_report.is_fatal();
    report.builds.push(build_report);

    if fatal {
      if remaining > 0 {
        warn!(skipped = remaining, "stopping: remaining builds cannot succeed");
      }
      report.skipped = remaining;
      break;
    }
  }

  info!(
    artifacts = report.artifact_count(),
    targets = report.target_count(),
    success = report.is_success(),
    "builds complete"
  );

  report
}

/// Run every build and collapse the outcome into a single result.
pub async fn run(ctx: &BuildContext, project: &Project, config: &ExecuteConfig) -> Result<(), BuildError> {
  execute_builds(ctx, project, config).await.into_result()
}

/// Run one build declaration through all of its stages.
pub async fn execute_build(
  ctx: &BuildContext,
  build: &BuildSpec,
  config: &ExecuteConfig,
  semaphore: Arc<Semaphore>,
) -> BuildSpecReport {
  let mut report = BuildSpecReport::new(&build.binary);
  let env = match build.env_pairs() {
    Ok(env) => env,
    Err(e) => return report.fail(e.into()),
  };

  report.enter(Stage::PreHook);
  if let Err(e) = run_hook(
    HookPhase::Pre,
    build.hooks.pre.as_deref(),
    &env,
    &ctx.root,
    config.shell.as_deref(),
    &config.cancel,
  )
  .await
  {
    return report.fail(e);
  }

  report.enter(Stage::Validating);
  if let Err(e) = check_main(&ctx.root, &build.main, &build.binary) {
    return report.fail(e.into());
  }

  report.enter(Stage::Expanding);
  let targets = matrix::expand(build);
  if targets.is_empty() {
    warn!(binary = %build.binary, "no valid targets to build");
  }

  report.enter(Stage::Resolving);
  let jobs = match resolve_jobs(ctx, build, &targets, &env).await {
    Ok(jobs) => jobs,
    Err(e) => return report.fail(e),
  };

  report.enter(Stage::Compiling);
  report.targets = compile_all(ctx, jobs, config, semaphore).await;

  let toolchain_missing = report
    .targets
    .iter()
    .any(|t| matches!(t.result, Err(BuildError::ToolchainUnavailable { .. })));
  if toolchain_missing || config.cancel.is_cancelled() {
    return report.finish();
  }

  report.enter(Stage::PostHook);
  if let Err(e) = run_hook(
    HookPhase::Post,
    build.hooks.post.as_deref(),
    &env,
    &ctx.root,
    config.shell.as_deref(),
    &config.cancel,
  )
  .await
  {
    return report.fail(e);
  }

  report.finish()
}

/// Render the binary name and linker flags for one target.
///
/// `{{ .Binary }}` is the project name inside the name template and the
/// rendered name inside the linker flags.
pub fn render_target(ctx: &BuildContext, build: &BuildSpec, target: &Target) -> Result<(String, String), TemplateError> {
  let name = template::render(
    &ctx.project_name,
    &build.binary,
    &ctx.render_fields(&ctx.project_name, target),
  )?;
  let ldflags = template::render("ldflags", &build.ldflags, &ctx.render_fields(&name, target))?;
  Ok((name, ldflags))
}

/// A target as it would be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
  pub target: Target,
  pub name: String,
  pub ldflags: String,
  pub output: PathBuf,
}

/// Validate a build and resolve every target without running anything.
///
/// Hooks are not run and nothing is written.
pub fn resolve_build(ctx: &BuildContext, build: &BuildSpec) -> Result<Vec<ResolvedTarget>, BuildError> {
  build.env_pairs()?;
  check_main(&ctx.root, &build.main, &build.binary)?;

  let resolved = matrix::expand(build)
    .into_iter()
    .map(|target| {
      let (name, ldflags) = render_target(ctx, build, &target)?;
      Ok(ResolvedTarget {
        output: output_path(&ctx.dist, &name, &target),
        target,
        name,
        ldflags,
      })
    })
    .collect::<Result<Vec<_>, BuildError>>()?;

  let outputs: Vec<(Target, &Path)> = resolved.iter().map(|r| (r.target, r.output.as_path())).collect();
  check_outputs(ctx, &outputs)?;
  Ok(resolved)
}

/// Render names and flags for every target.
///
/// Any template error or shared output path fails the whole build before a
/// single compile starts.
async fn resolve_jobs(
  ctx: &BuildContext,
  build: &BuildSpec,
  targets: &[Target],
  env: &[(String, String)],
) -> Result<Vec<CompileJob>, BuildError> {
  if targets.is_empty() {
    return Ok(Vec::new());
  }

  tokio::fs::create_dir_all(&ctx.dist).await?;
  let dist = dunce::canonicalize(&ctx.dist)?;
  let (workdir, package) = package_location(&ctx.root, &build.main);
  let flags = build.flag_args();

  let jobs = targets
    .iter()
    .map(|target| {
      let (name, ldflags) = render_target(ctx, build, target)?;
      debug!(platform = %target, name = %name, "resolved target");

      Ok(CompileJob {
        target: *target,
        output: output_path(&dist, &name, target),
        name,
        ldflags,
        flags: flags.clone(),
        env: env.to_vec(),
        workdir: workdir.clone(),
        package: package.clone(),
      })
    })
    .collect::<Result<Vec<_>, BuildError>>()?;

  let outputs: Vec<(Target, &Path)> = jobs.iter().map(|j| (j.target, j.output.as_path())).collect();
  check_outputs(ctx, &outputs)?;
  Ok(jobs)
}

/// Reject output paths written by more than one target, counting artifacts
/// already recorded by earlier builds.
fn check_outputs(ctx: &BuildContext, outputs: &[(Target, &Path)]) -> Result<(), BuildError> {
  let recorded = ctx.artifacts();
  let mut seen: HashSet<&Path> = recorded.iter().map(|a| a.path.as_path()).collect();

  for &(_, output) in outputs {
    if seen.insert(output) {
      continue;
    }
    let targets = recorded
      .iter()
      .filter(|a| a.path.as_path() == output)
      .map(|a| a.target)
      .chain(outputs.iter().filter(|(_, o)| *o == output).map(|(t, _)| *t))
      .collect();
    return Err(BuildError::OutputCollision {
      output: output.to_path_buf(),
      targets,
    });
  }
  Ok(())
}

/// Compile every job and return reports in job order.
///
/// A toolchain that cannot be started cancels the jobs still pending.
async fn compile_all(
  ctx: &BuildContext,
  jobs: Vec<CompileJob>,
  config: &ExecuteConfig,
  semaphore: Arc<Semaphore>,
) -> Vec<TargetReport> {
  let targets: Vec<Target> = jobs.iter().map(|job| job.target).collect();

  let abort = config.cancel.child_token();
  let mut join_set = JoinSet::new();
  for (idx, job) in jobs.into_iter().enumerate() {
    let toolchain = config.toolchain.clone();
    let abort = abort.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let result = async {
        let _permit = semaphore.acquire().await.map_err(|_| BuildError::Cancelled)?;
        if abort.is_cancelled() {
          return Err(BuildError::Cancelled);
        }
        toolchain.compile(&job, &abort).await
      }
      .await;
      if matches!(result, Err(BuildError::ToolchainUnavailable { .. })) {
        abort.cancel();
      }
      (idx, result)
    });
  }

  let mut slots: Vec<Option<TargetReport>> = targets.iter().map(|_| None).collect();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((idx, result)) => {
        let target = targets[idx];
        match &result {
          Ok(artifact) => {
            info!(platform = %target, path = %artifact.path.display(), "target built");
            ctx.record_artifact(artifact.clone());
          }
          Err(e) => error!(platform = %target, error = %e, "target failed"),
        }
        slots[idx] = Some(TargetReport { target, result });
      }
      Err(e) => error!(error = %e, "compile task panicked"),
    }
  }

  slots
    .into_iter()
    .zip(targets)
    .map(|(slot, target)| {
      slot.unwrap_or_else(|| TargetReport {
        target,
        result: Err(BuildError::Io(std::io::Error::other("compile task did not complete"))),
      })
    })
    .collect()
}
