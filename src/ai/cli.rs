//! Claude CLI detection and invocation
//!
//! The CLI is treated as an opaque prompt-in, text-out service: the prompt is
//! written to stdin and stdout is the response.

use crate::config::AiConfig;
use crate::error::{CoreError, Result};
use crate::subprocess;
use std::path::PathBuf;
use std::time::Duration;

const COMMAND_NAME: &str = "claude";

/// A located AI CLI binary and the arguments it is run with
#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectedCli {
    pub path: PathBuf,
    pub version: Option<String>,
    #[serde(skip)]
    args: Vec<String>,
}

impl DetectedCli {
    /// Claude CLI in print mode with plain text output
    pub fn claude(path: PathBuf, version: Option<String>) -> Self {
        DetectedCli {
            path,
            version,
            args: vec![
                "--print".to_string(),
                "--output-format".to_string(),
                "text".to_string(),
                // Prevent macOS permission dialogs
                "--strict-mcp-config".to_string(),
                "--disable-slash-commands".to_string(),
            ],
        }
    }

    /// Any command that reads a prompt on stdin and answers on stdout
    pub fn custom(path: PathBuf, args: Vec<String>) -> Self {
        DetectedCli {
            path,
            version: None,
            args,
        }
    }

    /// Send `prompt` and return the trimmed response.
    ///
    /// A non-zero exit still counts as an answer when stdout is non-empty.
    pub async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        tracing::debug!(
            "Running AI CLI {} ({} byte prompt)",
            self.path.display(),
            prompt.len()
        );

        let output = subprocess::run(&self.path, &self.args, Some(prompt), timeout)
            .await
            .map_err(CoreError::Ai)?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }
        if !stdout.is_empty() {
            tracing::warn!("AI CLI exited with {}, using partial output", output.status);
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CoreError::Ai(format!("CLI failed: {}", stderr.trim())))
    }
}

/// Locate the Claude CLI: configured command, common install paths, then PATH
pub async fn detect_cli(config: &AiConfig) -> Option<DetectedCli> {
    if !config.enabled {
        tracing::debug!("AI analysis disabled in config");
        return None;
    }

    if let Some(command) = &config.command {
        let path = crate::config::expand_path(command);
        if path.exists() {
            let version = subprocess::check_version(&path).await;
            return Some(DetectedCli::claude(path, version));
        }
        tracing::warn!("Configured AI command not found: {}", path.display());
    }

    for path in common_paths() {
        if path.exists() {
            if let Some(version) = subprocess::check_version(&path).await {
                return Some(DetectedCli::claude(path, Some(version)));
            }
        }
    }

    if let Some(path) = subprocess::find_in_path(COMMAND_NAME).await {
        if let Some(version) = subprocess::check_version(&path).await {
            return Some(DetectedCli::claude(path, Some(version)));
        }
    }

    tracing::warn!("Claude CLI not found, AI analysis will use statistics only");
    None
}

fn common_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".npm-global/bin/claude"));
        paths.push(home.join(".claude/bin/claude"));
        paths.push(home.join(".claude/local/claude"));
        paths.push(home.join(".local/bin/claude"));
    }

    paths.push(PathBuf::from("/usr/local/bin/claude"));
    paths.push(PathBuf::from("/opt/homebrew/bin/claude"));

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = dirs::data_local_dir() {
            paths.push(appdata.join("Programs/claude/claude.exe"));
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_args_use_print_mode() {
        let cli = DetectedCli::claude(PathBuf::from("claude"), None);
        assert!(cli.args.contains(&"--print".to_string()));
        assert!(cli.args.contains(&"text".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_config_detects_nothing() {
        let config = AiConfig {
            enabled: false,
            ..AiConfig::default()
        };
        assert!(detect_cli(&config).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_complete_feeds_stdin() {
        let cli = DetectedCli::custom(PathBuf::from("cat"), Vec::new());
        let out = cli
            .complete("  echo this prompt \n", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "echo this prompt");
    }

    #[tokio::test]
    async fn test_missing_binary_is_ai_error() {
        let cli = DetectedCli::custom(PathBuf::from("/nonexistent/claude"), Vec::new());
        let err = cli.complete("x", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Ai(_)));
    }
}
