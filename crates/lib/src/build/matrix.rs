//! Target matrix expansion.
//!
//! A build lists operating systems, architectures and ARM revisions. The
//! matrix is their cross product minus the pairs the toolchain cannot
//! produce. `GOARM` revisions only multiply `arm`; every other architecture
//! ignores them.

use std::collections::HashSet;

use tracing::debug;

use crate::config::BuildSpec;
use crate::platform::{Arch, Os, Target};

/// Whether the toolchain can produce a working binary for `os`/`arch`.
///
/// Pure and total: the same pair always gives the same answer.
pub fn is_valid(os: Os, arch: Arch) -> bool {
  use Arch::*;

  match os {
    Os::Linux => true,
    Os::Darwin => matches!(arch, Amd64 | Arm64),
    Os::Windows => matches!(arch, X86 | Amd64 | Arm64),
    Os::Android => matches!(arch, X86 | Amd64 | Arm | Arm64),
    Os::Freebsd | Os::Netbsd | Os::Openbsd => matches!(arch, X86 | Amd64 | Arm | Arm64),
    Os::Plan9 => matches!(arch, X86 | Amd64 | Arm),
    Os::Dragonfly | Os::Solaris => matches!(arch, Amd64),
  }
}

/// Expand a build into its ordered, deduplicated target list.
///
/// Order follows `goos`, then `goarch`, then `goarm` as declared. Invalid
/// pairs are dropped silently; an empty result is not an error.
pub fn expand(build: &BuildSpec) -> Vec<Target> {
  let mut seen = HashSet::new();
  let mut targets = Vec::new();

  for &os in &build.goos {
    for &arch in &build.goarch {
      if !is_valid(os, arch) {
        debug!(os = %os, arch = %arch, "skipping unsupported target");
        continue;
      }

      if arch.has_variants() && !build.goarm.is_empty() {
        for &arm in &build.goarm {
          let target = Target::with_arm(os, arch, arm);
          if seen.insert(target) {
            targets.push(target);
          }
        }
      } else {
        let target = Target::new(os, arch);
        if seen.insert(target) {
          targets.push(target);
        }
      }
    }
  }

  targets
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::ArmVersion;
  use tracing_test::traced_test;

  fn build(goos: &[Os], goarch: &[Arch], goarm: &[ArmVersion]) -> BuildSpec {
    BuildSpec {
      goos: goos.to_vec(),
      goarch: goarch.to_vec(),
      goarm: goarm.to_vec(),
      ..Default::default()
    }
  }

  #[test]
  fn arm_variant_only_multiplies_arm() {
    let targets = expand(&build(&[Os::Linux], &[Arch::Arm, Arch::Arm64], &[ArmVersion::V6]));
    assert_eq!(
      targets,
      vec![
        Target::with_arm(Os::Linux, Arch::Arm, ArmVersion::V6),
        Target::new(Os::Linux, Arch::Arm64),
      ]
    );
  }

  #[test]
  fn several_arm_versions() {
    let targets = expand(&build(
      &[Os::Linux],
      &[Arch::Amd64, Arch::Arm],
      &[ArmVersion::V5, ArmVersion::V6, ArmVersion::V7],
    ));
    let names: Vec<String> = targets.iter().map(Target::to_string).collect();
    assert_eq!(names, vec!["linux_amd64", "linux_arm_5", "linux_arm_6", "linux_arm_7"]);
  }

  #[test]
  fn arm_without_versions_has_no_goarm() {
    let targets = expand(&build(&[Os::Linux], &[Arch::Arm], &[]));
    assert_eq!(targets, vec![Target::new(Os::Linux, Arch::Arm)]);
  }

  #[test]
  #[traced_test]
  fn invalid_pairs_are_skipped() {
    let targets = expand(&build(&[Os::Windows, Os::Darwin], &[Arch::Arm], &[ArmVersion::V6]));
    assert!(targets.is_empty());
    assert!(logs_contain("skipping unsupported target"));
  }

  #[test]
  fn mixed_matrix_keeps_declaration_order() {
    let targets = expand(&build(
      &[Os::Darwin, Os::Linux, Os::Windows],
      &[Arch::Amd64, Arch::X86],
      &[],
    ));
    let names: Vec<String> = targets.iter().map(Target::to_string).collect();
    assert_eq!(
      names,
      vec!["darwin_amd64", "linux_amd64", "linux_386", "windows_amd64", "windows_386"]
    );
  }

  #[test]
  fn duplicates_are_removed() {
    let targets = expand(&build(
      &[Os::Linux, Os::Linux],
      &[Arch::Arm, Arch::Amd64, Arch::Arm],
      &[ArmVersion::V7, ArmVersion::V7],
    ));
    let names: Vec<String> = targets.iter().map(Target::to_string).collect();
    assert_eq!(names, vec!["linux_arm_7", "linux_amd64"]);
  }

  #[test]
  fn expansion_is_deterministic() {
    let spec = build(
      &[Os::Linux, Os::Freebsd, Os::Windows],
      &[Arch::Arm, Arch::Arm64, Arch::X86],
      &[ArmVersion::V6, ArmVersion::V7],
    );
    assert_eq!(expand(&spec), expand(&spec));
  }

  #[test]
  fn linux_accepts_every_arch() {
    for arch in Arch::ALL {
      assert!(is_valid(Os::Linux, *arch), "linux/{arch}");
    }
  }

  #[test]
  fn exclusion_table() {
    assert!(!is_valid(Os::Windows, Arch::Arm));
    assert!(!is_valid(Os::Darwin, Arch::X86));
    assert!(!is_valid(Os::Darwin, Arch::Arm));
    assert!(!is_valid(Os::Solaris, Arch::Arm64));
    assert!(is_valid(Os::Darwin, Arch::Arm64));
    assert!(is_valid(Os::Windows, Arch::Amd64));
    assert!(is_valid(Os::Freebsd, Arch::Arm));
  }
}
