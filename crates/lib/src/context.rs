//! Run-wide build state.
//!
//! A [`BuildContext`] is created once per release run and passed by reference
//! to every stage. Everything in it is read-only except the artifact log,
//! which successful compiles append to and later stages read.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::ARTIFACTS_FILE;
use crate::platform::Target;
use crate::template::Value;

/// Source control metadata exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
  pub tag: String,
  pub commit: String,
}

/// A binary produced for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub target: Target,
  /// Rendered binary name, without the platform suffix.
  pub name: String,
  /// Absolute output path.
  pub path: PathBuf,
}

#[derive(Debug)]
pub struct BuildContext {
  pub project_name: String,
  /// Directory that entry points, hooks and a relative `dist` are resolved against.
  pub root: PathBuf,
  pub dist: PathBuf,
  pub version: String,
  pub git: GitInfo,
  pub date: DateTime<Utc>,
  pub env: BTreeMap<String, String>,
  artifacts: Mutex<Vec<Artifact>>,
}

impl BuildContext {
  /// Create a context with the current time and process environment.
  pub fn new(project_name: impl Into<String>, root: impl Into<PathBuf>, dist: impl Into<PathBuf>) -> Self {
    let root = root.into();
    let dist = dist.into();
    let dist = if dist.is_absolute() { dist } else { root.join(dist) };
    Self {
      project_name: project_name.into(),
      root,
      dist,
      version: String::new(),
      git: GitInfo::default(),
      date: Utc::now(),
      env: std::env::vars().collect(),
      artifacts: Mutex::new(Vec::new()),
    }
  }

  pub fn with_version(mut self, version: impl Into<String>) -> Self {
    self.version = version.into();
    self
  }

  pub fn with_git(mut self, git: GitInfo) -> Self {
    self.git = git;
    self
  }

  pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
    self.date = date;
    self
  }

  pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
    self.env = env;
    self
  }

  /// Fields available to name and flag templates for one target.
  ///
  /// `binary` is what `{{ .Binary }}` expands to.
  pub fn render_fields(&self, binary: &str, target: &Target) -> Value {
    let env = Value::Map(
      self
        .env
        .iter()
        .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
        .collect(),
    );
    Value::map([
      ("ProjectName", Value::from(self.project_name.as_str())),
      ("Binary", Value::from(binary)),
      ("Os", Value::from(target.os.as_str())),
      ("Arch", Value::from(target.arch.as_str())),
      ("Arm", Value::from(target.arm.map(|a| a.as_str()).unwrap_or_default())),
      ("Version", Value::from(self.version.as_str())),
      ("Tag", Value::from(self.git.tag.as_str())),
      ("Commit", Value::from(self.git.commit.as_str())),
      ("Date", Value::from(self.date.to_rfc3339_opts(SecondsFormat::Secs, true))),
      ("Timestamp", Value::from(self.date.timestamp().to_string())),
      ("Env", env),
    ])
  }

  /// Append a produced binary to the artifact log.
  pub fn record_artifact(&self, artifact: Artifact) {
    debug!(platform = %artifact.target, path = %artifact.path.display(), "recording artifact");
    self
      .artifacts
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(artifact);
  }

  /// Snapshot of the artifact log in append order.
  pub fn artifacts(&self) -> Vec<Artifact> {
    self.artifacts.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Write the artifact log as JSON into the dist directory.
  pub fn write_artifacts_json(&self) -> std::io::Result<PathBuf> {
    let path = self.dist.join(ARTIFACTS_FILE);
    let json = serde_json::to_string_pretty(&self.artifacts()).map_err(std::io::Error::other)?;
    std::fs::create_dir_all(&self.dist)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
  }
}
