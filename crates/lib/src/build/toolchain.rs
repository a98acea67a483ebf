//! Toolchain invocation.
//!
//! One [`CompileJob`] is one `go build` run for one target. Jobs are fully
//! resolved before they reach here: names and linker flags are rendered and
//! the output path is absolute, so a job carries no borrowed state and can be
//! moved onto a task.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::consts::DEFAULT_TOOLCHAIN;
use crate::context::Artifact;
use crate::execute::types::BuildError;
use crate::platform::Target;

/// The compiler driver used for every target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  program: PathBuf,
}

impl Default for Toolchain {
  fn default() -> Self {
    Self::new(DEFAULT_TOOLCHAIN)
  }
}

impl Toolchain {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
    }
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  /// Build the command for a job without running it.
  pub fn command(&self, job: &CompileJob) -> Command {
    let mut command = Command::new(&self.program);
    command.arg("build").arg("-o").arg(&job.output).args(&job.flags);
    if !job.ldflags.is_empty() {
      command.arg(format!("-ldflags={}", job.ldflags));
    }
    command.arg(&job.package).current_dir(&job.workdir);

    for (key, value) in &job.env {
      command.env(key, value);
    }
    for (key, value) in job.target.env() {
      command.env(key, value);
    }

    command
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    command
  }

  /// Compile one target.
  ///
  /// A toolchain that cannot be started is [`BuildError::ToolchainUnavailable`];
  /// a non-zero exit is [`BuildError::Compile`] carrying the toolchain's
  /// diagnostics as written.
  pub async fn compile(&self, job: &CompileJob, cancel: &CancellationToken) -> Result<Artifact, BuildError> {
    info!(platform = %job.target, output = %job.output.display(), "compiling");
    debug!(
      program = %self.program.display(),
      workdir = %job.workdir.display(),
      package = %job.package,
      ldflags = %job.ldflags,
      "spawning toolchain"
    );

    let child = self
      .command(job)
      .spawn()
      .map_err(|source| BuildError::ToolchainUnavailable {
        program: self.program.clone(),
        source,
      })?;

    let output = tokio::select! {
      output = child.wait_with_output() => output?,
      _ = cancel.cancelled() => return Err(BuildError::Cancelled),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
      debug!(stdout = %stdout.trim_end(), "toolchain stdout");
    }

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      debug!(code = ?output.status.code(), stderr = %stderr.trim_end(), "toolchain failed");
      let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
      return Err(BuildError::Compile {
        target: job.target,
        diagnostic: diagnostic.trim_end_matches(['\n', '\r']).to_string(),
      });
    }

    Ok(Artifact {
      target: job.target,
      name: job.name.clone(),
      path: job.output.clone(),
    })
  }
}

/// A fully resolved compile for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
  pub target: Target,
  /// Rendered binary name.
  pub name: String,
  /// Rendered linker flags.
  pub ldflags: String,
  pub flags: Vec<String>,
  pub env: Vec<(String, String)>,
  /// Absolute path the binary is written to.
  pub output: PathBuf,
  /// Directory the toolchain runs in.
  pub workdir: PathBuf,
  /// Package argument: `.` for a directory, the file name for a single file.
  pub package: String,
}

/// Split an entry point into the toolchain's working directory and package argument.
pub fn package_location(root: &Path, main: &str) -> (PathBuf, String) {
  let path = root.join(main);
  if path.extension().is_some_and(|ext| ext == "go") {
    let workdir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    let package = path
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_else(|| main.to_string());
    (workdir, package)
  } else {
    (path, ".".to_string())
  }
}

/// Where a binary named `name` for `target` lands in `dist`.
pub fn output_path(dist: &Path, name: &str, target: &Target) -> PathBuf {
  dist.join(format!("{name}{}", target.os.executable_suffix()))
}
