//! Export route handlers
//!
//! Each endpoint takes a Report as the request body and returns it as a
//! downloadable document.

use super::{error_response, json_error, AppState};
use crate::render::{html_document, markdown_to_html};
use crate::report::{to_markdown, writer::report_stem, Report};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

pub async fn export_json(Json(report): Json<Report>) -> Response {
    match serde_json::to_string_pretty(&report) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (header::CONTENT_DISPOSITION, attachment("claude-report.json")),
            ],
            body,
        )
            .into_response(),
        Err(e) => error_response(e.into()),
    }
}

pub async fn export_markdown(Json(report): Json<Report>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment("claude-report.md")),
        ],
        to_markdown(&report),
    )
        .into_response()
}

pub async fn export_pdf(State(state): State<AppState>, Json(report): Json<Report>) -> Response {
    let Some(renderer) = state.pdf.as_ref() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "PDF export requires a headless Chromium browser",
        );
    };

    let html = html_document(
        "Claude Code Session Analysis",
        &markdown_to_html(&to_markdown(&report)),
    );
    let output = std::env::temp_dir().join(format!(
        "claude-report-export-{}-{}.pdf",
        std::process::id(),
        report_stem()
    ));

    if let Err(e) = renderer.render(&html, &output).await {
        return error_response(e);
    }
    let bytes = tokio::fs::read(&output).await;
    if let Err(e) = tokio::fs::remove_file(&output).await {
        tracing::debug!("Could not remove {}: {}", output.display(), e);
    }

    match bytes {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_DISPOSITION, attachment("claude-report.pdf")),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_markdown_export() {
        let report = ReportBuilder::new("/logs", 0).build();
        let response = export_markdown(Json(report)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"claude-report.md\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("# Claude Code Session Analysis Report"));
    }

    #[tokio::test]
    async fn test_json_export_round_trips() {
        let report = ReportBuilder::new("/logs", 3).build();
        let response = export_json(Json(report.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let back: Report = serde_json::from_slice(&body).unwrap();
        assert_eq!(back, report);
    }
}
