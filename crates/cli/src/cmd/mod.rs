mod build;
mod check;
mod targets;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use buildmatrix_lib::config::{self, Project};
use buildmatrix_lib::consts::{ENV_COMMIT, ENV_TAG, ENV_VERSION};
use buildmatrix_lib::context::{BuildContext, GitInfo};

pub use build::{BuildArgs, cmd_build};
pub use check::{CheckArgs, cmd_check};
pub use targets::{TargetsArgs, cmd_targets};

/// Where the project lives and which config file describes it.
#[derive(Args, Debug)]
pub struct ProjectArgs {
  /// Project root
  #[arg(short = 'C', long, default_value = ".")]
  pub root: PathBuf,

  /// Config file (default: buildmatrix.yml in the project root)
  #[arg(short, long)]
  pub config: Option<PathBuf>,
}

impl ProjectArgs {
  /// Canonical project root and its config with defaults applied.
  pub fn load(&self) -> Result<(PathBuf, Project)> {
    let root = dunce::canonicalize(&self.root)
      .with_context(|| format!("Project root not found: {}", self.root.display()))?;
    let path = match &self.config {
      Some(path) => path.clone(),
      None => config::find(&root)?,
    };
    let project = config::load(&path, &root).with_context(|| format!("Failed to load config: {}", path.display()))?;
    Ok((root, project))
  }
}

/// Release metadata exposed to templates.
#[derive(Args, Debug)]
pub struct ReleaseArgs {
  /// Version for {{ .Version }} (default: the tag without a leading "v")
  #[arg(long = "release-version", env = ENV_VERSION)]
  pub version: Option<String>,

  /// Tag for {{ .Tag }}
  #[arg(long, env = ENV_TAG, default_value = "")]
  pub tag: String,

  /// Commit for {{ .Commit }}
  #[arg(long, env = ENV_COMMIT, default_value = "")]
  pub commit: String,
}

impl ReleaseArgs {
  pub fn version(&self) -> String {
    self
      .version
      .clone()
      .unwrap_or_else(|| self.tag.strip_prefix('v').unwrap_or(&self.tag).to_string())
  }

  pub fn context(&self, root: PathBuf, project: &Project) -> BuildContext {
    BuildContext::new(&project.project_name, root, &project.dist)
      .with_version(self.version())
      .with_git(GitInfo {
        tag: self.tag.clone(),
        commit: self.commit.clone(),
      })
  }
}
