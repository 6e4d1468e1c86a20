//! Settings API routes
//!
//! Reads and updates the directory settings. Changes are persisted to
//! config.toml and applied to the running server immediately.

use super::{error_response, json_error, AppState};
use crate::config::{candidate_projects_dirs, expand_path, Config};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    /// Configured projects directory, empty when probed
    pub projects_dir: String,
    /// Directory actually in use
    pub actual_projects_path: String,
    pub path_exists: bool,
    pub reports_dir: String,
    pub port: u16,
    pub config_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub projects_dir: Option<String>,
    pub reports_dir: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestedPath {
    pub path: String,
    pub label: &'static str,
    pub exists: bool,
}

fn settings_of(config: &Config, config_path: &Path) -> SettingsResponse {
    let actual = config.projects_dir();
    SettingsResponse {
        projects_dir: config
            .paths
            .projects_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        path_exists: actual.is_dir(),
        actual_projects_path: actual.display().to_string(),
        reports_dir: config.reports_dir().display().to_string(),
        port: config.server.port,
        config_path: config_path.display().to_string(),
    }
}

pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config.read().await;
    Json(settings_of(&config, &state.config_path))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Response {
    let projects_dir = req
        .projects_dir
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    let reports_dir = req
        .reports_dir
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    if projects_dir.is_none() && reports_dir.is_none() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "projectsDir or reportsDir is required",
        );
    }

    if let Some(dir) = &projects_dir {
        let expanded = expand_path(dir);
        if !expanded.is_dir() {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Projects directory does not exist",
                    "path": expanded.display().to_string(),
                })),
            )
                .into_response();
        }
    }

    // Persist on top of the file contents so env overrides are not written out
    let mut file_config = if state.config_path.exists() {
        match Config::from_file(&state.config_path) {
            Ok(config) => config,
            Err(e) => return error_response(e),
        }
    } else {
        Config::default()
    };
    if let Some(dir) = &projects_dir {
        file_config.paths.projects_dir = Some(dir.clone());
    }
    if let Some(dir) = &reports_dir {
        file_config.paths.reports_dir = dir.clone();
    }
    if let Err(e) = file_config.save_to_file(&state.config_path) {
        return error_response(e);
    }

    let settings = {
        let mut config = state.config.write().await;
        if let Some(dir) = projects_dir {
            config.paths.projects_dir = Some(dir);
        }
        if let Some(dir) = reports_dir {
            config.paths.reports_dir = dir;
        }
        state
            .projects
            .reconfigure(config.projects_dir(), config.reports_dir())
            .await;
        settings_of(&config, &state.config_path)
    };

    tracing::info!(
        "Settings updated: projects at {}, reports at {}",
        settings.actual_projects_path,
        settings.reports_dir
    );

    Json(serde_json::json!({
        "success": true,
        "message": "Settings saved",
        "settings": settings,
    }))
    .into_response()
}

pub async fn suggested_paths() -> impl IntoResponse {
    const LABELS: [&str; 3] = [
        "Claude Code default",
        "Linux/Unix alternative",
        "macOS alternative",
    ];

    let mut paths: Vec<SuggestedPath> = candidate_projects_dirs()
        .into_iter()
        .zip(LABELS)
        .map(|(path, label)| SuggestedPath {
            exists: path.is_dir(),
            path: path.display().to_string(),
            label,
        })
        .collect();

    if let Some(home) = dirs::home_dir() {
        let documents = home.join("Documents").join("claude-projects");
        paths.push(SuggestedPath {
            exists: documents.is_dir(),
            path: documents.display().to_string(),
            label: "Documents folder",
        });
    }

    Json(serde_json::json!({ "suggestedPaths": paths }))
}
