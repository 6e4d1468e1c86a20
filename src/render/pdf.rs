use crate::config::RenderConfig;
use crate::error::{CoreError, Result};
use crate::subprocess;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser commands tried in PATH, most common first
const BROWSER_COMMANDS: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "microsoft-edge",
];

/// Well-known install locations outside PATH
const BROWSER_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/usr/bin/chromium",
    "/snap/bin/chromium",
];

/// Prints HTML to PDF with a headless Chromium-family browser
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    browser: PathBuf,
    timeout: Duration,
}

impl PdfRenderer {
    pub fn new(browser: PathBuf, timeout: Duration) -> Self {
        PdfRenderer { browser, timeout }
    }

    /// Find a usable browser: the configured one, then known paths, then PATH
    pub async fn detect(config: &RenderConfig) -> Option<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        if let Some(browser) = &config.browser {
            if browser.exists() {
                return Some(Self::new(browser.clone(), timeout));
            }
            tracing::warn!("Configured browser not found: {}", browser.display());
        }

        for path in BROWSER_PATHS {
            let path = Path::new(path);
            if path.exists() {
                tracing::debug!("Using browser at {}", path.display());
                return Some(Self::new(path.to_path_buf(), timeout));
            }
        }

        for command in BROWSER_COMMANDS {
            if let Some(path) = subprocess::find_in_path(command).await {
                tracing::debug!("Found {} in PATH: {}", command, path.display());
                return Some(Self::new(path, timeout));
            }
        }

        tracing::debug!("No headless browser found, PDF output unavailable");
        None
    }

    pub fn browser(&self) -> &Path {
        &self.browser
    }

    /// Print a full HTML document to `output`
    pub async fn render(&self, html: &str, output: &Path) -> Result<()> {
        let scratch = std::env::temp_dir().join(format!(
            "claude-report-{}-{}.html",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        tokio::fs::write(&scratch, html).await?;

        let result = self.print(&scratch, output).await;

        if let Err(e) = tokio::fs::remove_file(&scratch).await {
            tracing::debug!("Failed to remove {}: {}", scratch.display(), e);
        }
        result
    }

    async fn print(&self, input: &Path, output: &Path) -> Result<()> {
        let output = absolute(output)?;
        let args = [
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-pdf-header-footer".to_string(),
            format!("--print-to-pdf={}", output.display()),
            format!("file://{}", input.display()),
        ];

        let out = subprocess::run(&self.browser, &args, None, self.timeout)
            .await
            .map_err(CoreError::Render)?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(CoreError::Render(format!(
                "{} exited with {}: {}",
                self.browser.display(),
                out.status,
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(CoreError::Render(format!(
                "browser did not produce {}",
                output.display()
            )));
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_browser_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, "").unwrap();

        let config = RenderConfig {
            browser: Some(fake.clone()),
            timeout_secs: 7,
        };
        let renderer = PdfRenderer::detect(&config).await.unwrap();
        assert_eq!(renderer.browser(), fake.as_path());
        assert_eq!(renderer.timeout, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_missing_browser_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfRenderer::new(
            PathBuf::from("/nonexistent/chrome"),
            Duration::from_secs(1),
        );
        let err = renderer
            .render("<html></html>", &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Render(_)));
        assert!(!dir.path().join("out.pdf").exists());
    }
}
