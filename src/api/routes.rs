//! HTTP route handlers for stored results and on-demand analysis

use super::{error_response, json_error, AppState};
use crate::config::expand_path;
use crate::pipeline::run_analysis;
use crate::report::{write_report, OutputFormat, Report};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn api_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "claude-report",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "GET /api/results",
            "GET /api/results/latest",
            "GET /api/results/:filename",
            "POST /api/analyze",
            "POST /api/export/json",
            "POST /api/export/markdown",
            "POST /api/export/pdf",
            "GET /api/projects",
            "GET /api/projects/:id/sessions",
            "GET /api/projects/:id/sessions/date/:date",
            "POST /api/projects/:id/analyze",
            "POST /api/projects/:id/sessions/:session_id/analyze",
            "POST /api/projects/:id/analyze-date/:date",
            "GET /api/projects/:id/analysis",
            "POST /api/projects/:id/ai-analyze",
            "POST /api/projects/:id/sessions/:session_id/ai-analyze",
            "GET /api/projects/:id/ai-analysis",
            "GET /api/settings",
            "PUT /api/settings",
            "GET /api/settings/suggested-paths"
        ]
    }))
}

// ============================================================================
// Stored results
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub filename: String,
    pub created_at: String,
    pub analyzed_at: String,
    pub source_path: String,
    pub files_analyzed: usize,
    pub total_sessions: usize,
    pub total_messages: usize,
}

struct StoredFile {
    path: PathBuf,
    filename: String,
    modified: SystemTime,
}

/// JSON files directly inside the reports directory, newest first
async fn stored_files(dir: &std::path::Path) -> std::io::Result<Vec<StoredFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        files.push(StoredFile {
            filename: entry.file_name().to_string_lossy().into_owned(),
            modified: metadata.modified()?,
            path,
        });
    }
    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.filename.cmp(&a.filename)));
    Ok(files)
}

async fn read_report(path: &std::path::Path) -> crate::error::Result<Report> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

fn no_results() -> Response {
    json_error(StatusCode::NOT_FOUND, "No analysis results found")
}

pub async fn list_results(State(state): State<AppState>) -> Response {
    let dir = state.config.read().await.reports_dir();
    let files = match stored_files(&dir).await {
        Ok(files) if !files.is_empty() => files,
        Ok(_) => return no_results(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return no_results(),
        Err(e) => return error_response(e.into()),
    };

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        match read_report(&file.path).await {
            Ok(report) => results.push(ResultEntry {
                filename: file.filename,
                created_at: DateTime::<Utc>::from(file.modified).to_rfc3339(),
                analyzed_at: report.analyzed_at,
                source_path: report.source_path,
                files_analyzed: report.files_analyzed,
                total_sessions: report.summary.total_sessions,
                total_messages: report.summary.total_messages,
            }),
            Err(e) => tracing::debug!("Skipping {}: {}", file.filename, e),
        }
    }

    Json(serde_json::json!({
        "total": results.len(),
        "reports": results,
    }))
    .into_response()
}

pub async fn latest_result(State(state): State<AppState>) -> Response {
    let dir = state.config.read().await.reports_dir();
    let latest = match stored_files(&dir).await {
        Ok(files) => files.into_iter().next(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return error_response(e.into()),
    };
    let Some(latest) = latest else {
        return no_results();
    };

    match read_report(&latest.path).await {
        Ok(report) => Json(serde_json::json!({
            "filename": latest.filename,
            "report": report,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Single path component only
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains("..") && !name.contains(['/', '\\'])
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return json_error(StatusCode::BAD_REQUEST, "Invalid filename");
    }
    let path = state.config.read().await.reports_dir().join(&filename);
    match read_report(&path).await {
        Ok(report) => Json(serde_json::json!({
            "filename": filename,
            "report": report,
        }))
        .into_response(),
        Err(crate::error::CoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            json_error(StatusCode::NOT_FOUND, format!("Result not found: {}", filename))
        }
        Err(e) => error_response(e),
    }
}

// ============================================================================
// On-demand analysis
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub path: String,
    #[serde(default)]
    pub format: Option<String>,
}

pub async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> Response {
    let format = match req.format.as_deref() {
        None => OutputFormat::All,
        Some(f) => match OutputFormat::parse_format(f) {
            Some(format) => format,
            None => {
                return json_error(StatusCode::BAD_REQUEST, format!("Unknown format: {}", f))
            }
        },
    };

    let path = expand_path(std::path::Path::new(&req.path));
    if !path.exists() {
        return json_error(
            StatusCode::BAD_REQUEST,
            format!("Path does not exist: {}", path.display()),
        );
    }

    let (concurrency, reports_dir) = {
        let config = state.config.read().await;
        (config.analysis.concurrency, config.reports_dir())
    };

    tracing::info!("Analysis requested for {}", path.display());
    let report = match run_analysis(&path, concurrency).await {
        Ok(report) => report,
        Err(e) => return error_response(e),
    };

    let outcome = match write_report(&report, &reports_dir, format, state.pdf.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => return error_response(e),
    };

    let files: Vec<String> = outcome.written().map(|p| p.display().to_string()).collect();
    let failures: Vec<serde_json::Value> = outcome
        .failures
        .iter()
        .map(|(format, error)| serde_json::json!({ "format": format, "error": error }))
        .collect();

    Json(serde_json::json!({
        "success": true,
        "message": format!("Analyzed {} files", report.files_analyzed),
        "report": report,
        "files": files,
        "failures": failures,
    }))
    .into_response()
}
