//! Test utilities for buildmatrix-lib.
//!
//! Compiles in unit tests go through a stand-in `go` script so they don't
//! need a real toolchain. The script understands just enough of
//! `go build -o OUT [flags] [-ldflags=..] PKG` to write OUT or fail the way
//! the real driver does on an unknown flag.

use std::path::{Path, PathBuf};

pub const GOOD_MAIN: &str = "package main\nfunc main() {println(0)}";
pub const NO_MAIN: &str = "package main\nfunc notMain() {println(0)}";

#[cfg(unix)]
const FAKE_GO: &str = r#"#!/bin/sh
[ "$1" = "build" ] || { echo "go $1: unknown command" >&2; exit 2; }
shift
out=""
ldflags=""
pkg=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -ldflags=*) ldflags="${1#-ldflags=}"; shift ;;
    -v|-trimpath|-a) shift ;;
    -*) echo "flag provided but not defined: $1" >&2; exit 2 ;;
    *) pkg="$1"; shift ;;
  esac
done
mkdir -p "$(dirname "$out")"
printf 'GOOS=%s GOARCH=%s GOARM=%s pkg=%s ldflags=%s\n' "$GOOS" "$GOARCH" "$GOARM" "$pkg" "$ldflags" > "$out"
"#;

#[cfg(unix)]
const SLOW_GO: &str = "#!/bin/sh\nexec sleep 30\n";

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let bin = dir.join("bin");
  std::fs::create_dir_all(&bin).unwrap();
  let path = bin.join(name);
  std::fs::write(&path, body).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Install a fake `go` under `dir/bin` and return its path.
#[cfg(unix)]
pub fn fake_toolchain(dir: &Path) -> PathBuf {
  write_script(dir, "go", FAKE_GO)
}

/// A toolchain that never finishes on its own.
#[cfg(unix)]
pub fn slow_toolchain(dir: &Path) -> PathBuf {
  write_script(dir, "go-slow", SLOW_GO)
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}

/// Returns a shell command that fails with `message` on stderr.
#[cfg(unix)]
pub fn failing_cmd(message: &str) -> String {
  format!("echo '{message}' >&2; exit 1")
}

#[cfg(windows)]
pub fn failing_cmd(message: &str) -> String {
  format!("(echo {message})1>&2 & exit /b 1")
}

/// Returns a shell command that creates `filename` in the working directory.
#[cfg(unix)]
pub fn touch_cmd(filename: &str) -> String {
  format!("touch {filename}")
}

#[cfg(windows)]
pub fn touch_cmd(filename: &str) -> String {
  format!("type nul > {filename}")
}
