//! Helpers for locating and running external tools (AI CLI, headless browser)

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Find a command in PATH
pub async fn find_in_path(command: &str) -> Option<PathBuf> {
    #[cfg(unix)]
    let which_cmd = "which";
    #[cfg(windows)]
    let which_cmd = "where";

    let output = Command::new(which_cmd).arg(command).output().await.ok()?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        let path = path_str.lines().next()?.trim();
        if path.is_empty() {
            return None;
        }
        Some(PathBuf::from(path))
    } else {
        None
    }
}

/// Check a binary answers `--version`
pub async fn check_version(path: &Path) -> Option<String> {
    let output = timeout(Duration::from_secs(5), async {
        Command::new(path).arg("--version").output().await
    })
    .await
    .ok()?
    .ok()?;

    if output.status.success() {
        let version = String::from_utf8_lossy(&output.stdout);
        Some(version.trim().to_string())
    } else {
        None
    }
}

/// Run a program to completion, optionally feeding `stdin`, bounded by `limit`.
///
/// Runs in the temp directory so tools that write session files do not
/// pollute the projects being analyzed.
pub async fn run<I, S>(
    program: &Path,
    args: I,
    stdin: Option<&str>,
    limit: Duration,
) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .current_dir(std::env::temp_dir())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to execute {}: {}", program.display(), e))?;

    let stdin_pipe = child.stdin.take();
    let exchange = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, stdin_pipe) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| format!("Failed to write stdin: {}", e))?;
            // Close stdin so the child sees EOF
            drop(pipe);
        }
        child
            .wait_with_output()
            .await
            .map_err(|e| format!("Failed to wait for {}: {}", program.display(), e))
    };

    // A child that never reads stdin must not outlive the limit either.
    // Dropping the future kills it.
    match timeout(limit, exchange).await {
        Ok(result) => result,
        Err(_) => Err(format!(
            "{} timed out after {} seconds",
            program.display(),
            limit.as_secs()
        )),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_pipes_stdin() {
        let output = run(Path::new("cat"), Vec::<&str>::new(), Some("hello"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello");
    }

    #[tokio::test]
    async fn test_stdin_write_is_bounded_by_timeout() {
        // More than a pipe buffer, to a child that never reads it
        let input = "x".repeat(1 << 20);
        let err = run(
            Path::new("sleep"),
            ["30"],
            Some(&input),
            Duration::from_millis(300),
        )
        .await
        .unwrap_err();
        assert!(err.contains("timed out"));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = run(
            Path::new("/nonexistent/tool"),
            ["--help"],
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(err.contains("Failed to execute"));
    }

    #[tokio::test]
    async fn test_find_in_path_unknown_command() {
        assert!(find_in_path("definitely-not-a-real-command-xyz").await.is_none());
    }
}
