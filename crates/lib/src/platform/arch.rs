use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownPlatform;

/// Target CPU architectures understood by the Go toolchain (`GOARCH`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arch {
  #[serde(rename = "386")]
  X86,
  #[serde(rename = "amd64")]
  Amd64,
  #[serde(rename = "arm")]
  Arm,
  #[serde(rename = "arm64")]
  Arm64,
  #[serde(rename = "mips")]
  Mips,
  #[serde(rename = "mipsle")]
  Mipsle,
  #[serde(rename = "mips64")]
  Mips64,
  #[serde(rename = "mips64le")]
  Mips64le,
  #[serde(rename = "ppc64")]
  Ppc64,
  #[serde(rename = "ppc64le")]
  Ppc64le,
  #[serde(rename = "s390x")]
  S390x,
}

impl Arch {
  pub const ALL: &'static [Arch] = &[
    Arch::X86,
    Arch::Amd64,
    Arch::Arm,
    Arch::Arm64,
    Arch::Mips,
    Arch::Mipsle,
    Arch::Mips64,
    Arch::Mips64le,
    Arch::Ppc64,
    Arch::Ppc64le,
    Arch::S390x,
  ];

  /// Detect the host CPU architecture at runtime
  pub fn current() -> Option<Self> {
    Self::from_rust_arch(std::env::consts::ARCH, cfg!(target_endian = "little"))
  }

  /// Map a Rust `target_arch` name to `GOARCH`. Go spells byte order into the
  /// name for MIPS and POWER, Rust does not.
  fn from_rust_arch(arch: &str, little_endian: bool) -> Option<Self> {
    match (arch, little_endian) {
      ("x86", _) => Some(Self::X86),
      ("x86_64", _) => Some(Self::Amd64),
      ("arm", _) => Some(Self::Arm),
      ("aarch64", _) => Some(Self::Arm64),
      ("mips", false) => Some(Self::Mips),
      ("mips", true) => Some(Self::Mipsle),
      ("mips64", false) => Some(Self::Mips64),
      ("mips64", true) => Some(Self::Mips64le),
      ("powerpc64", false) => Some(Self::Ppc64),
      ("powerpc64", true) => Some(Self::Ppc64le),
      ("s390x", _) => Some(Self::S390x),
      _ => None,
    }
  }

  /// Returns the `GOARCH` identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "386",
      Self::Amd64 => "amd64",
      Self::Arm => "arm",
      Self::Arm64 => "arm64",
      Self::Mips => "mips",
      Self::Mipsle => "mipsle",
      Self::Mips64 => "mips64",
      Self::Mips64le => "mips64le",
      Self::Ppc64 => "ppc64",
      Self::Ppc64le => "ppc64le",
      Self::S390x => "s390x",
    }
  }

  /// Whether `GOARM` variants multiply this architecture.
  pub fn has_variants(&self) -> bool {
    matches!(self, Self::Arm)
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = UnknownPlatform;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Arch::ALL
      .iter()
      .copied()
      .find(|arch| arch.as_str() == s)
      .ok_or_else(|| UnknownPlatform::Arch(s.to_string()))
  }
}

/// ARM revision passed to the toolchain as `GOARM`.
///
/// Accepts both `6` and `"6"` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawArmVersion", into = "String")]
pub enum ArmVersion {
  V5,
  V6,
  V7,
}

impl ArmVersion {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::V5 => "5",
      Self::V6 => "6",
      Self::V7 => "7",
    }
  }
}

impl fmt::Display for ArmVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ArmVersion {
  type Err = UnknownPlatform;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "5" => Ok(Self::V5),
      "6" => Ok(Self::V6),
      "7" => Ok(Self::V7),
      other => Err(UnknownPlatform::ArmVersion(other.to_string())),
    }
  }
}

impl From<ArmVersion> for String {
  fn from(version: ArmVersion) -> Self {
    version.as_str().to_string()
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawArmVersion {
  Number(u64),
  Text(String),
}

impl TryFrom<RawArmVersion> for ArmVersion {
  type Error = UnknownPlatform;

  fn try_from(raw: RawArmVersion) -> Result<Self, Self::Error> {
    match raw {
      RawArmVersion::Number(n) => n.to_string().parse(),
      RawArmVersion::Text(s) => s.parse(),
    }
  }
}
