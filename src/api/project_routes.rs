//! Project, session and AI analysis route handlers

use super::{error_response, json_error, AppState};
use crate::ai::{load_stored, store, AiAnalysisResult};
use crate::projects::{check_session_id, date_stats, SessionSummary};
use crate::report::Report;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ForceQuery {
    pub force: Option<String>,
}

impl ForceQuery {
    /// `?force`, `?force=1` and `?force=true` all count; `?force=false` does not
    fn is_set(&self) -> bool {
        match self.force.as_deref() {
            None => false,
            Some(v) => !matches!(v.to_lowercase().as_str(), "false" | "0"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// Ids come percent-decoded from the URL; check them before they become paths
async fn check_ids(
    state: &AppState,
    project_id: &str,
    session_id: Option<&str>,
) -> Result<(), Response> {
    state
        .projects
        .project_path(project_id)
        .await
        .map_err(error_response)?;
    if let Some(session_id) = session_id {
        check_session_id(session_id).map_err(error_response)?;
    }
    Ok(())
}

fn analyzed_count(sessions: &[SessionSummary]) -> usize {
    sessions.iter().filter(|s| s.analyzed).count()
}

async fn concurrency(state: &AppState) -> usize {
    state.config.read().await.analysis.concurrency
}

// ============================================================================
// Projects and sessions
// ============================================================================

pub async fn list_projects(State(state): State<AppState>) -> Response {
    match state.projects.scan_projects().await {
        Ok(projects) => Json(serde_json::json!({ "projects": projects })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Response {
    let sessions = match state.projects.project_sessions(&project_id).await {
        Ok(sessions) => sessions,
        Err(e) => return error_response(e),
    };

    Json(serde_json::json!({
        "projectId": project_id,
        "dateStats": date_stats(&sessions),
        "totalSessions": sessions.len(),
        "analyzedSessions": analyzed_count(&sessions),
        "sessions": sessions,
    }))
    .into_response()
}

pub async fn sessions_by_date(
    State(state): State<AppState>,
    Path((project_id, date)): Path<(String, String)>,
) -> Response {
    let sessions = match state.projects.sessions_by_date(&project_id, &date).await {
        Ok(sessions) => sessions,
        Err(e) => return error_response(e),
    };

    Json(serde_json::json!({
        "projectId": project_id,
        "date": date,
        "totalSessions": sessions.len(),
        "analyzedSessions": analyzed_count(&sessions),
        "sessions": sessions,
    }))
    .into_response()
}

// ============================================================================
// Statistical analysis
// ============================================================================

pub async fn analyze_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Response {
    let workers = concurrency(&state).await;
    match state.projects.analyze_project(&project_id, workers).await {
        Ok(result) => Json(serde_json::json!({
            "success": true,
            "projectId": project_id,
            "result": result,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn analyze_session(
    State(state): State<AppState>,
    Path((project_id, session_id)): Path<(String, String)>,
) -> Response {
    match state.projects.analyze_session(&project_id, &session_id).await {
        Ok(result) => Json(serde_json::json!({
            "success": true,
            "projectId": project_id,
            "sessionId": session_id,
            "result": result,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Analyze each session of one day separately
pub async fn analyze_date(
    State(state): State<AppState>,
    Path((project_id, date)): Path<(String, String)>,
) -> Response {
    let sessions = match state.projects.sessions_by_date(&project_id, &date).await {
        Ok(sessions) => sessions,
        Err(e) => return error_response(e),
    };

    let mut results = Vec::with_capacity(sessions.len());
    let mut analyzed = 0;
    for session in &sessions {
        match state.projects.analyze_session(&project_id, &session.id).await {
            Ok(result) => {
                analyzed += 1;
                results.push(serde_json::json!({
                    "sessionId": session.id,
                    "success": true,
                    "result": result,
                }));
            }
            Err(e) => {
                tracing::warn!("Analysis of {}/{} failed: {}", project_id, session.id, e);
                results.push(serde_json::json!({
                    "sessionId": session.id,
                    "success": false,
                    "error": e.to_string(),
                }));
            }
        }
    }

    Json(serde_json::json!({
        "projectId": project_id,
        "date": date,
        "totalSessions": sessions.len(),
        "analyzedCount": analyzed,
        "results": results,
    }))
    .into_response()
}

/// Stored project analysis, or one session's with `?sessionId=`
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let session_id = query.session_id.as_deref();
    if let Err(response) = check_ids(&state, &project_id, session_id).await {
        return response;
    }

    let result = match session_id {
        Some(session_id) => state.projects.session_analysis(&project_id, session_id).await,
        None => state.projects.project_analysis(&project_id).await,
    };
    let result = match result {
        Ok(result) => result,
        Err(e) => return error_response(e),
    };
    let layout = state.projects.layout().await;
    let ai = match load_stored(&layout, &project_id, session_id).await {
        Ok(ai) => ai,
        Err(e) => return error_response(e),
    };

    if result.is_none() && ai.is_none() {
        return json_error(StatusCode::NOT_FOUND, "No analysis results found");
    }

    let mut body = serde_json::json!({
        "projectId": project_id,
        "result": result,
        "aiAnalysis": ai,
    });
    if let Some(session_id) = session_id {
        body["sessionId"] = serde_json::json!(session_id);
    }
    Json(body).into_response()
}

// ============================================================================
// AI analysis
// ============================================================================

fn ai_response(result: &AiAnalysisResult, cached: bool) -> Response {
    let mut body = serde_json::json!({
        "success": true,
        "projectId": result.project_id,
        "aiAnalysis": result,
    });
    if let Some(session_id) = &result.session_id {
        body["sessionId"] = serde_json::json!(session_id);
    }
    if cached {
        body["cached"] = serde_json::json!(true);
    }
    Json(body).into_response()
}

pub async fn ai_analyze_session(
    State(state): State<AppState>,
    Path((project_id, session_id)): Path<(String, String)>,
    Query(query): Query<ForceQuery>,
) -> Response {
    if let Err(response) = check_ids(&state, &project_id, Some(&session_id)).await {
        return response;
    }
    let layout = state.projects.layout().await;

    if !query.is_set() {
        match load_stored(&layout, &project_id, Some(&session_id)).await {
            Ok(Some(existing)) => return ai_response(&existing, true),
            Ok(None) => {}
            Err(e) => return error_response(e),
        }
    }

    let sessions = match state.projects.read_session(&project_id, &session_id).await {
        Ok(sessions) => sessions,
        Err(e) => return error_response(e),
    };

    tracing::info!("AI analysis of session {}/{}", project_id, session_id);
    let result = state
        .ai
        .analyze_session(&project_id, &session_id, &sessions)
        .await;
    if let Err(e) = store(&layout, &result).await {
        return error_response(e);
    }
    ai_response(&result, false)
}

pub async fn ai_analyze_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ForceQuery>,
) -> Response {
    if let Err(response) = check_ids(&state, &project_id, None).await {
        return response;
    }
    let layout = state.projects.layout().await;

    if !query.is_set() {
        match load_stored(&layout, &project_id, None).await {
            Ok(Some(existing)) => return ai_response(&existing, true),
            Ok(None) => {}
            Err(e) => return error_response(e),
        }
    }

    let report: Report = match state.projects.project_analysis(&project_id).await {
        Ok(Some(report)) => report,
        Ok(None) => {
            let workers = concurrency(&state).await;
            match state.projects.analyze_project(&project_id, workers).await {
                Ok(report) => report,
                Err(e) => return error_response(e),
            }
        }
        Err(e) => return error_response(e),
    };

    tracing::info!("AI analysis of project {}", project_id);
    let result = state.ai.analyze_project(&project_id, &report).await;
    if let Err(e) = store(&layout, &result).await {
        return error_response(e);
    }
    ai_response(&result, false)
}

pub async fn get_ai_analysis(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Response {
    if let Err(response) = check_ids(&state, &project_id, query.session_id.as_deref()).await {
        return response;
    }
    let layout = state.projects.layout().await;
    match load_stored(&layout, &project_id, query.session_id.as_deref()).await {
        Ok(Some(result)) => Json(serde_json::json!({
            "projectId": project_id,
            "sessionId": query.session_id,
            "aiAnalysis": result,
        }))
        .into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "No AI analysis found"),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_flag() {
        let q = |v: Option<&str>| ForceQuery {
            force: v.map(str::to_string),
        };
        assert!(!q(None).is_set());
        assert!(q(Some("")).is_set());
        assert!(q(Some("true")).is_set());
        assert!(q(Some("1")).is_set());
        assert!(!q(Some("false")).is_set());
        assert!(!q(Some("0")).is_set());
    }
}
