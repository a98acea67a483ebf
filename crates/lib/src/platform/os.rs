use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownPlatform;

/// Target operating systems understood by the Go toolchain (`GOOS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Android,
  Darwin,
  Dragonfly,
  Freebsd,
  Linux,
  Netbsd,
  Openbsd,
  Plan9,
  Solaris,
  Windows,
}

impl Os {
  pub const ALL: &'static [Os] = &[
    Os::Android,
    Os::Darwin,
    Os::Dragonfly,
    Os::Freebsd,
    Os::Linux,
    Os::Netbsd,
    Os::Openbsd,
    Os::Plan9,
    Os::Solaris,
    Os::Windows,
  ];

  /// Detect the host operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Darwin),
      "windows" => Some(Self::Windows),
      "freebsd" => Some(Self::Freebsd),
      "netbsd" => Some(Self::Netbsd),
      "openbsd" => Some(Self::Openbsd),
      "dragonfly" => Some(Self::Dragonfly),
      "solaris" => Some(Self::Solaris),
      "android" => Some(Self::Android),
      _ => None,
    }
  }

  /// Returns the `GOOS` identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Android => "android",
      Self::Darwin => "darwin",
      Self::Dragonfly => "dragonfly",
      Self::Freebsd => "freebsd",
      Self::Linux => "linux",
      Self::Netbsd => "netbsd",
      Self::Openbsd => "openbsd",
      Self::Plan9 => "plan9",
      Self::Solaris => "solaris",
      Self::Windows => "windows",
    }
  }

  /// File suffix the toolchain expects on executables for this OS.
  pub fn executable_suffix(&self) -> &'static str {
    match self {
      Self::Windows => ".exe",
      _ => "",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Os {
  type Err = UnknownPlatform;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Os::ALL
      .iter()
      .copied()
      .find(|os| os.as_str() == s)
      .ok_or_else(|| UnknownPlatform::Os(s.to_string()))
  }
}
