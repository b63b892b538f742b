//! External CLI helpers
//!
//! GUI apps on macOS inherit a minimal `PATH`, so binaries installed through
//! Homebrew or npm are invisible to them. The login shell's `PATH` is read once
//! per process and every lookup goes through it; results are cached by name.

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

const FALLBACK_PATH: &str = "/usr/bin:/bin:/usr/sbin:/sbin";

static SHELL_PATH: OnceCell<String> = OnceCell::new();
static RESOLVED: Lazy<Mutex<HashMap<String, Option<PathBuf>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// `PATH` as seen by `$SHELL -lc 'echo $PATH'`, falling back to the process
/// `PATH`. Blocking on first call.
pub fn shell_path() -> &'static str {
    SHELL_PATH.get_or_init(|| {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/zsh".to_string());
        let from_shell = std::process::Command::new(&shell)
            .args(["-lc", "echo $PATH"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()
            .filter(|out| out.status.success())
            .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
            .filter(|path| !path.is_empty());

        match from_shell {
            Some(path) => path,
            None => {
                tracing::debug!(shell = %shell, "login shell PATH unavailable, using process PATH");
                std::env::var("PATH").unwrap_or_else(|_| FALLBACK_PATH.to_string())
            }
        }
    })
}

/// First executable named `name` in a colon-separated search path
pub fn find_in_path(name: &str, search_path: &str) -> Option<PathBuf> {
    search_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Locate `name` on the login shell's `PATH`, once per process.
/// Blocking on first call for a given name.
pub fn locate_binary(name: &str) -> Option<PathBuf> {
    if let Some(cached) = RESOLVED.lock().get(name) {
        return cached.clone();
    }

    let found = find_in_path(name, shell_path());
    match &found {
        Some(path) => tracing::info!(binary = name, path = %path.display(), "resolved binary"),
        None => tracing::info!(binary = name, "binary not found on PATH"),
    }
    RESOLVED.lock().insert(name.to_string(), found.clone());
    found
}

/// Captured result of a finished child process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

/// Run `program args...` to completion and capture stdout.
///
/// The child is killed if the returned future is dropped. Spawn failures
/// return `None`.
pub async fn run_captured(program: &Path, args: &[String]) -> Option<CommandOutput> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match cmd.output().await {
        Ok(output) => {
            if !output.status.success() {
                tracing::debug!(
                    program = %program.display(),
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "command exited unsuccessfully"
                );
            }
            Some(CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        }
        Err(e) => {
            tracing::warn!(program = %program.display(), error = %e, "failed to spawn command");
            None
        }
    }
}
