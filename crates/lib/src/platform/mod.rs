//! Target platforms.
//!
//! A [`Target`] is one `(GOOS, GOARCH, GOARM)` tuple that the toolchain is
//! asked to compile for.

pub mod arch;
pub mod os;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arch::{Arch, ArmVersion};
pub use os::Os;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownPlatform {
  #[error("unknown operating system: {0}")]
  Os(String),

  #[error("unknown architecture: {0}")]
  Arch(String),

  #[error("unknown arm version: {0}")]
  ArmVersion(String),
}

/// One resolved compile target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
  pub os: Os,
  pub arch: Arch,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub arm: Option<ArmVersion>,
}

impl Target {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self { os, arch, arm: None }
  }

  pub fn with_arm(os: Os, arch: Arch, arm: ArmVersion) -> Self {
    Self { os, arch, arm: Some(arm) }
  }

  /// The target the host machine would compile for natively.
  ///
  /// Returns `None` if the host OS or architecture is not a known toolchain target
  pub fn host() -> Option<Self> {
    Some(Self::new(Os::current()?, Arch::current()?))
  }

  /// Environment variables that steer the toolchain at this target.
  pub fn env(&self) -> Vec<(&'static str, &'static str)> {
    let mut env = vec![("GOOS", self.os.as_str()), ("GOARCH", self.arch.as_str())];
    if let Some(arm) = self.arm {
      env.push(("GOARM", arm.as_str()));
    }
    env
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}", self.os, self.arch)?;
    if let Some(arm) = self.arm {
      write!(f, "_{}", arm)?;
    }
    Ok(())
  }
}
