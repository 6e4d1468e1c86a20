//! Report output files
//!
//! All files from one write share a `report-<timestamp>` stem. A PDF failure
//! is recorded in the outcome and never removes the JSON or Markdown output.

use super::{to_markdown, Report};
use crate::error::Result;
use crate::render::{html_document, markdown_to_html, PdfRenderer};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which files to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Markdown,
    Pdf,
    #[default]
    All,
}

impl OutputFormat {
    pub fn parse_format(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn wants_json(self) -> bool {
        matches!(self, Self::Json | Self::All)
    }

    fn wants_markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::All)
    }

    fn wants_pdf(self) -> bool {
        matches!(self, Self::Pdf | Self::All)
    }
}

/// Paths written plus any per-format failures
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub json: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
    /// `(format, error)` for outputs that could not be produced
    pub failures: Vec<(OutputFormat, String)>,
}

impl WriteOutcome {
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        [&self.json, &self.markdown, &self.pdf]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
    }
}

/// `report-YYYYMMDD-HHMMSS-mmm`
pub fn report_stem() -> String {
    format!("report-{}", Utc::now().format("%Y%m%d-%H%M%S-%3f"))
}

/// Write `report` into `dir`, creating the directory if needed.
///
/// Errors only when the directory or the JSON/Markdown files cannot be
/// written; PDF problems land in [`WriteOutcome::failures`].
pub async fn write_report(
    report: &Report,
    dir: &Path,
    format: OutputFormat,
    pdf: Option<&PdfRenderer>,
) -> Result<WriteOutcome> {
    tokio::fs::create_dir_all(dir).await?;
    let stem = report_stem();
    let mut outcome = WriteOutcome::default();

    if format.wants_json() {
        let path = dir.join(format!("{}.json", stem));
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&path, json).await?;
        tracing::info!("JSON report written: {}", path.display());
        outcome.json = Some(path);
    }

    if !format.wants_markdown() && !format.wants_pdf() {
        return Ok(outcome);
    }

    let markdown = to_markdown(report);

    if format.wants_markdown() {
        let path = dir.join(format!("{}.md", stem));
        tokio::fs::write(&path, &markdown).await?;
        tracing::info!("Markdown report written: {}", path.display());
        outcome.markdown = Some(path);
    }

    if format.wants_pdf() {
        let path = dir.join(format!("{}.pdf", stem));
        match pdf {
            Some(renderer) => {
                let html = html_document("Claude Code Session Analysis", &markdown_to_html(&markdown));
                match renderer.render(&html, &path).await {
                    Ok(()) => {
                        tracing::info!("PDF report written: {}", path.display());
                        outcome.pdf = Some(path);
                    }
                    Err(e) => {
                        tracing::warn!("PDF generation failed: {}", e);
                        outcome.failures.push((OutputFormat::Pdf, e.to_string()));
                    }
                }
            }
            None => {
                tracing::warn!("PDF requested but no headless browser is available");
                outcome
                    .failures
                    .push((OutputFormat::Pdf, "no headless browser available".to_string()));
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;
    use std::time::Duration;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse_format("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse_format("md"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::parse_format("all"), Some(OutputFormat::All));
        assert_eq!(OutputFormat::parse_format("html"), None);
    }

    #[test]
    fn test_stem_shape() {
        let stem = report_stem();
        // report-YYYYMMDD-HHMMSS-mmm
        assert_eq!(stem.len(), "report-".len() + 8 + 1 + 6 + 1 + 3);
        assert!(stem.starts_with("report-"));
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/reports");
        let report = ReportBuilder::new("/logs", 0).build();

        let outcome = write_report(&report, &out, OutputFormat::Json, None)
            .await
            .unwrap();
        let json_path = outcome.json.unwrap();
        assert!(json_path.starts_with(&out));

        let back: Report =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(back, report);
        assert!(outcome.markdown.is_none());
    }

    #[tokio::test]
    async fn test_pdf_failure_keeps_other_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportBuilder::new("/logs", 0).build();
        let broken = PdfRenderer::new(PathBuf::from("/nonexistent/chrome"), Duration::from_secs(1));

        let outcome = write_report(&report, dir.path(), OutputFormat::All, Some(&broken))
            .await
            .unwrap();

        assert!(outcome.json.as_ref().unwrap().exists());
        assert!(outcome.markdown.as_ref().unwrap().exists());
        assert!(outcome.pdf.is_none());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, OutputFormat::Pdf);
        assert_eq!(outcome.written().count(), 2);
    }

    #[tokio::test]
    async fn test_pdf_without_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportBuilder::new("/logs", 0).build();
        let outcome = write_report(&report, dir.path(), OutputFormat::Pdf, None)
            .await
            .unwrap();
        assert_eq!(outcome.written().count(), 0);
        assert_eq!(outcome.failures.len(), 1);
    }
}
