//! Shared helpers for pipeline integration tests.

use std::path::{Path, PathBuf};

use buildmatrix_lib::build::toolchain::Toolchain;
use buildmatrix_lib::config::{BuildSpec, Project};
use buildmatrix_lib::context::BuildContext;
use buildmatrix_lib::execute::ExecuteConfig;
use buildmatrix_lib::platform::Target;
use tempfile::TempDir;

pub const GOOD_MAIN: &str = "package main\nfunc main() {println(0)}";
pub const NO_MAIN: &str = "package main\nfunc notMain() {println(0)}";

/// Stand-in for `go build`: writes the output file, or fails like the real
/// driver on a flag it doesn't know.
const FAKE_GO: &str = r#"#!/bin/sh
[ "$1" = "build" ] || exit 2
shift
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -ldflags=*|-v) shift ;;
    -*) echo "flag provided but not defined: $1" >&2
        echo "usage: go build [-o output] [build flags] [packages]" >&2
        exit 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$(dirname "$out")"
echo "GOOS=$GOOS GOARCH=$GOARCH GOARM=$GOARM" > "$out"
"#;

/// A project directory with a `main.go` and a fake toolchain.
pub struct TestProject {
  pub temp: TempDir,
  pub toolchain: PathBuf,
}

impl TestProject {
  pub fn new(main: &str) -> Self {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("main.go"), main).unwrap();

    let bin = temp.path().join(".bin");
    std::fs::create_dir_all(&bin).unwrap();
    let toolchain = bin.join("go");
    std::fs::write(&toolchain, FAKE_GO).unwrap();
    std::fs::set_permissions(&toolchain, std::fs::Permissions::from_mode(0o755)).unwrap();

    Self { temp, toolchain }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root().join(relative)
  }

  /// Context that writes binaries straight into the project directory.
  pub fn context(&self, project_name: &str) -> BuildContext {
    BuildContext::new(project_name, self.root(), self.root())
  }

  pub fn config(&self) -> ExecuteConfig {
    ExecuteConfig {
      parallelism: 2,
      toolchain: Toolchain::new(&self.toolchain),
      ..Default::default()
    }
  }
}

/// A build for the machine running the tests.
pub fn host_build(binary: &str) -> BuildSpec {
  let host = Target::host().expect("tests run on a known platform");
  BuildSpec {
    main: ".".to_string(),
    binary: binary.to_string(),
    goos: vec![host.os],
    goarch: vec![host.arch],
    ..Default::default()
  }
}

pub fn project(name: &str, builds: Vec<BuildSpec>) -> Project {
  Project {
    project_name: name.to_string(),
    dist: PathBuf::new(),
    builds,
  }
}

/// Output file name for `binary` on the host.
pub fn host_binary(binary: &str) -> String {
  let host = Target::host().expect("tests run on a known platform");
  format!("{binary}{}", host.os.executable_suffix())
}
