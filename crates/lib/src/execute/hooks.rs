//! Pre and post build hooks.
//!
//! A hook is a single shell command run in the project root with the
//! inherited environment plus the build's `env` entries. Its stderr is kept
//! so a failure can be reported as the hook wrote it.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::execute::types::{BuildError, HookPhase};

/// Run a hook. An absent or blank command succeeds without spawning anything.
pub async fn run_hook(
  phase: HookPhase,
  cmd: Option<&str>,
  env: &[(String, String)],
  cwd: &Path,
  shell: Option<&str>,
  cancel: &CancellationToken,
) -> Result<(), BuildError> {
  let Some(cmd) = cmd.map(str::trim).filter(|c| !c.is_empty()) else {
    return Ok(());
  };
  info!(phase = %phase, cmd = %cmd, "running hook");

  let (shell_cmd, shell_args) = get_shell(shell);
  let mut command = Command::new(&shell_cmd);
  command
    .args(&shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
  for (key, value) in env {
    command.env(key, value);
  }

  debug!(shell = %shell_cmd, cwd = %cwd.display(), "spawning hook");
  let child = command.spawn().map_err(|e| BuildError::Hook {
    phase,
    stderr: e.to_string(),
  })?;

  let output = tokio::select! {
    output = child.wait_with_output() => output?,
    _ = cancel.cancelled() => return Err(BuildError::Cancelled),
  };

  let stdout = String::from_utf8_lossy(&output.stdout);
  if !stdout.trim().is_empty() {
    debug!(phase = %phase, stdout = %stdout.trim_end(), "hook stdout");
  }

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(phase = %phase, code = ?output.status.code(), "hook exited non-zero");
    return Err(BuildError::Hook {
      phase,
      stderr: stderr.trim_end_matches(['\n', '\r']).to_string(),
    });
  }

  Ok(())
}

/// Get the shell command and argument for the current platform.
///
/// Hooks default to `/bin/sh` (Unix) or `cmd.exe` (Windows) rather than the
/// user's login shell so profile files can't change what a hook sees.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}
