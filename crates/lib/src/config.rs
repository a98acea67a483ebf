//! Project configuration.
//!
//! A project file declares one or more builds. Each build is expanded into a
//! target matrix and compiled once per target:
//!
//! ```yaml
//! project_name: app
//! dist: dist
//! builds:
//!   - main: ./cmd/app
//!     binary: "{{ .ProjectName }}"
//!     ldflags: -s -w -X main.version={{.Version}}
//!     env: [CGO_ENABLED=0]
//!     goos: [linux, darwin, windows]
//!     goarch: [amd64, arm, arm64]
//!     goarm: [6, 7]
//!     hooks:
//!       pre: make generate
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_BINARY, DEFAULT_CONFIG_FILES, DEFAULT_DIST, DEFAULT_LDFLAGS, DEFAULT_MAIN};
use crate::platform::{Arch, ArmVersion, Os};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("no config file found in {0} (looked for {files})", files = DEFAULT_CONFIG_FILES.join(", "))]
  NotFound(PathBuf),

  #[error("invalid env entry {entry:?} for build {binary}: expected KEY=VALUE")]
  InvalidEnv { binary: String, entry: String },
}

/// Shell commands run around a build's targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hooks {
  pub pre: Option<String>,
  pub post: Option<String>,
}

/// One build declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSpec {
  /// Entry point: a `.go` file or a package directory, relative to the project root.
  pub main: String,
  /// Output binary name template.
  pub binary: String,
  /// Extra toolchain flags, whitespace separated.
  pub flags: String,
  /// Linker flags template.
  pub ldflags: String,
  /// `KEY=VALUE` entries added to the toolchain and hook environment.
  pub env: Vec<String>,
  pub goos: Vec<Os>,
  pub goarch: Vec<Arch>,
  pub goarm: Vec<ArmVersion>,
  pub hooks: Hooks,
}

impl BuildSpec {
  /// Parse `env` into key/value pairs.
  pub fn env_pairs(&self) -> Result<Vec<(String, String)>, ConfigError> {
    self
      .env
      .iter()
      .map(|entry| {
        entry
          .split_once('=')
          .filter(|(key, _)| !key.is_empty())
          .map(|(k, v)| (k.to_string(), v.to_string()))
          .ok_or_else(|| ConfigError::InvalidEnv {
            binary: self.binary.clone(),
            entry: entry.clone(),
          })
      })
      .collect()
  }

  /// Extra flags split the way a shell would split unquoted words.
  pub fn flag_args(&self) -> Vec<String> {
    self.flags.split_whitespace().map(str::to_string).collect()
  }
}

/// The whole project file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
  pub project_name: String,
  pub dist: PathBuf,
  pub builds: Vec<BuildSpec>,
}

impl Project {
  /// Fill in unset fields.
  ///
  /// `root` names the project when `project_name` is empty.
  pub fn with_defaults(mut self, root: &Path) -> Self {
    if self.project_name.is_empty() {
      self.project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    }
    if self.dist.as_os_str().is_empty() {
      self.dist = PathBuf::from(DEFAULT_DIST);
    }
    if self.builds.is_empty() {
      self.builds.push(BuildSpec::default());
    }
    for build in &mut self.builds {
      if build.main.is_empty() {
        build.main = DEFAULT_MAIN.to_string();
      }
      if build.binary.is_empty() {
        build.binary = DEFAULT_BINARY.to_string();
      }
      if build.ldflags.is_empty() {
        build.ldflags = DEFAULT_LDFLAGS.to_string();
      }
      if build.goos.is_empty() {
        build.goos = vec![Os::Linux, Os::Darwin];
      }
      if build.goarch.is_empty() {
        build.goarch = vec![Arch::Amd64, Arch::X86];
      }
      if build.goarm.is_empty() {
        build.goarm = vec![ArmVersion::V6];
      }
    }
    self
  }
}

/// Parse a project file without applying defaults.
pub fn parse(path: &Path, content: &str) -> Result<Project, ConfigError> {
  serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Load a project file and apply defaults relative to `root`.
pub fn load(path: &Path, root: &Path) -> Result<Project, ConfigError> {
  debug!(path = %path.display(), "loading config");
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(parse(path, &content)?.with_defaults(root))
}

/// Find the project file in `root`.
pub fn find(root: &Path) -> Result<PathBuf, ConfigError> {
  DEFAULT_CONFIG_FILES
    .iter()
    .map(|name| root.join(name))
    .find(|path| path.is_file())
    .ok_or_else(|| ConfigError::NotFound(root.to_path_buf()))
}
