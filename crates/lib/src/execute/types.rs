//! Types for build execution.
//!
//! This module defines the error type, the per-stage reports and the
//! configuration for running a project's builds.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::build::entrypoint::EntryPointError;
use crate::build::toolchain::Toolchain;
use crate::config::ConfigError;
use crate::context::Artifact;
use crate::platform::Target;
use crate::template::TemplateError;

/// Which side of the targets a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
  Pre,
  Post,
}

impl fmt::Display for HookPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HookPhase::Pre => write!(f, "pre"),
      HookPhase::Post => write!(f, "post"),
    }
  }
}

/// Errors that can occur while building a project.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A name or flag template failed to parse or execute.
  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  EntryPoint(#[from] EntryPointError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  /// A hook exited non-zero. `stderr` is what it wrote, unmodified.
  #[error("{phase} hook failed: {stderr}")]
  Hook { phase: HookPhase, stderr: String },

  /// The toolchain could not be started at all.
  #[error("toolchain {} is unavailable: {source}", program.display())]
  ToolchainUnavailable {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The toolchain ran and rejected the target.
  #[error("failed to build for {target}: {diagnostic}")]
  Compile { target: Target, diagnostic: String },

  /// More than one target renders to the same output file.
  #[error("{} would be written by more than one target: {}", output.display(), join_targets(targets))]
  OutputCollision { output: PathBuf, targets: Vec<Target> },

  #[error("build cancelled")]
  Cancelled,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Several independent failures, one per line.
  #[error("{}", join_lines(.0))]
  Multiple(Vec<BuildError>),
}

impl BuildError {
  /// Whether no later build can succeed after this error.
  pub fn is_fatal(&self) -> bool {
    matches!(self, BuildError::ToolchainUnavailable { .. } | BuildError::Cancelled)
  }
}

fn join_targets(targets: &[Target]) -> String {
  targets.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn join_lines(errors: &[BuildError]) -> String {
  errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// Where a build is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  #[default]
  Idle,
  PreHook,
  Validating,
  Expanding,
  Resolving,
  Compiling,
  PostHook,
  Done,
  Failed,
}

/// Outcome of compiling one target.
#[derive(Debug)]
pub struct TargetReport {
  pub target: Target,
  pub result: Result<Artifact, BuildError>,
}

/// Outcome of one build declaration.
#[derive(Debug, Default)]
pub struct BuildSpecReport {
  /// The build's binary template, as declared.
  pub binary: String,
  /// Last stage reached. `Failed` if anything went wrong.
  pub stage: Stage,
  /// Stage the build failed in, if it stopped early.
  pub failed_at: Option<Stage>,
  /// One entry per expanded target, in expansion order.
  pub targets: Vec<TargetReport>,
  /// A failure that stopped the build outside of a single target.
  pub error: Option<BuildError>,
}

impl BuildSpecReport {
  pub fn new(binary: impl Into<String>) -> Self {
    Self {
      binary: binary.into(),
      ..Default::default()
    }
  }

  pub fn enter(&mut self, stage: Stage) {
    tracing::debug!(binary = %self.binary, stage = ?stage, "entering stage");
    self.stage = stage;
  }

  /// Stop the build in its current stage.
  pub fn fail(mut self, error: BuildError) -> Self {
    tracing::error!(binary = %self.binary, stage = ?self.stage, error = %error, "build failed");
    self.failed_at = Some(self.stage);
    self.stage = Stage::Failed;
    self.error = Some(error);
    self
  }

  /// Close the build after the post hook.
  pub fn finish(mut self) -> Self {
    self.stage = if self.targets.iter().all(|t| t.result.is_ok()) {
      Stage::Done
    } else {
      Stage::Failed
    };
    self
  }

  pub fn is_success(&self) -> bool {
    self.error.is_none() && self.targets.iter().all(|t| t.result.is_ok())
  }

  /// Whether a failure in this build should stop the remaining builds.
  pub fn is_fatal(&self) -> bool {
    self.error.as_ref().is_some_and(BuildError::is_fatal)
      || self.targets.iter().any(|t| t.result.as_ref().is_err_and(BuildError::is_fatal))
  }

  pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
    self.targets.iter().filter_map(|t| t.result.as_ref().ok())
  }

  /// Failures in report order: targets first, then the build-level error.
  pub fn failures(&self) -> impl Iterator<Item = &BuildError> {
    self
      .targets
      .iter()
      .filter_map(|t| t.result.as_ref().err())
      .chain(self.error.iter())
  }

  fn into_failures(self) -> impl Iterator<Item = BuildError> {
    self
      .targets
      .into_iter()
      .filter_map(|t| t.result.err())
      .chain(self.error)
  }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct BuildReport {
  /// One entry per build that was started, in declaration order.
  pub builds: Vec<BuildSpecReport>,
  /// Builds never started because an earlier failure was fatal.
  pub skipped: usize,
}

impl BuildReport {
  /// Returns true if every build and target succeeded.
  pub fn is_success(&self) -> bool {
    self.skipped == 0 && self.builds.iter().all(BuildSpecReport::is_success)
  }

  /// Number of binaries produced.
  pub fn artifact_count(&self) -> usize {
    self.builds.iter().map(|b| b.artifacts().count()).sum()
  }

  /// Number of targets attempted.
  pub fn target_count(&self) -> usize {
    self.builds.iter().map(|b| b.targets.len()).sum()
  }

  pub fn failures(&self) -> impl Iterator<Item = &BuildError> {
    self.builds.iter().flat_map(BuildSpecReport::failures)
  }

  /// Collapse the report into a single result.
  ///
  /// One failure is returned as is; several become [`BuildError::Multiple`].
  pub fn into_result(self) -> Result<(), BuildError> {
    let mut errors: Vec<BuildError> = self.builds.into_iter().flat_map(BuildSpecReport::into_failures).collect();
    match errors.len() {
      0 => Ok(()),
      1 => Err(errors.remove(0)),
      _ => Err(BuildError::Multiple(errors)),
    }
  }
}

/// Configuration for build execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of targets compiled at once.
  pub parallelism: usize,

  /// Compiler driver used for every target.
  pub toolchain: Toolchain,

  /// Shell to use for hooks.
  /// If None, uses /bin/sh (Unix) or cmd.exe (Windows).
  pub shell: Option<String>,

  /// Cancels in-flight hooks and compiles when triggered.
  pub cancel: CancellationToken,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      toolchain: Toolchain::default(),
      shell: None,
      cancel: CancellationToken::new(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
