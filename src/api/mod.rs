//! HTTP API for Claude Report
//!
//! Exposes stored results, on-demand analysis, exports, the project index and
//! settings.

mod auth;
mod export_routes;
mod project_routes;
pub mod routes;
mod settings_routes;

use crate::ai::{detect_cli, AiAnalyzer, AiTaskQueue};
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::projects::ProjectIndex;
use crate::render::PdfRenderer;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration; settings updates replace it
    pub config: Arc<RwLock<Config>>,
    /// Path to the config file (for the settings API)
    pub config_path: PathBuf,
    pub projects: Arc<ProjectIndex>,
    pub ai: AiAnalyzer,
    /// Headless browser for PDF output, if one was found
    pub pdf: Option<PdfRenderer>,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        ai: AiAnalyzer,
        pdf: Option<PdfRenderer>,
    ) -> Self {
        let projects = ProjectIndex::new(config.projects_dir(), config.reports_dir());
        AppState {
            api_key: config.server.api_key.clone(),
            config: Arc::new(RwLock::new(config)),
            config_path,
            projects: Arc::new(projects),
            ai,
            pdf,
        }
    }

    /// Build state, probing for the AI CLI and a headless browser
    pub async fn detect(config: Config, config_path: PathBuf) -> Self {
        let cli = detect_cli(&config.ai).await;
        if let Some(cli) = &cli {
            tracing::info!(
                "AI CLI: {} {}",
                cli.path.display(),
                cli.version.as_deref().unwrap_or("")
            );
        }
        let ai = AiAnalyzer::new(
            cli,
            Duration::from_secs(config.ai.timeout_secs),
            AiTaskQueue::new(config.ai.max_concurrent),
        );
        let pdf = PdfRenderer::detect(&config.render).await;
        Self::new(config, config_path, ai, pdf)
    }
}

pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a core error to a JSON error response
pub(crate) fn error_response(e: CoreError) -> Response {
    let status = match &e {
        CoreError::NotFound(..) => StatusCode::NOT_FOUND,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        CoreError::Render(_) | CoreError::Ai(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    }
    json_error(status, e.to_string())
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_router(state);

    if tokio::net::TcpStream::connect(addr).await.is_ok() {
        tracing::error!(
            "Port {} is already in use. Use `curl http://{}/health` to check.",
            addr.port(),
            addr
        );
        return Err(CoreError::Api(format!("Port {} already in use", addr.port())));
    }

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoreError::Api(e.to_string()))?;

    Ok(())
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Stored reports
        .route("/results", get(routes::list_results))
        .route("/results/latest", get(routes::latest_result))
        .route("/results/:filename", get(routes::get_result))
        // On-demand analysis
        .route("/analyze", post(routes::analyze))
        // Exports
        .route("/export/json", post(export_routes::export_json))
        .route("/export/markdown", post(export_routes::export_markdown))
        .route("/export/pdf", post(export_routes::export_pdf))
        // Projects
        .route("/projects", get(project_routes::list_projects))
        .route(
            "/projects/:id/sessions",
            get(project_routes::list_sessions),
        )
        .route(
            "/projects/:id/sessions/date/:date",
            get(project_routes::sessions_by_date),
        )
        .route("/projects/:id/analyze", post(project_routes::analyze_project))
        .route(
            "/projects/:id/sessions/:session_id/analyze",
            post(project_routes::analyze_session),
        )
        .route(
            "/projects/:id/analyze-date/:date",
            post(project_routes::analyze_date),
        )
        .route("/projects/:id/analysis", get(project_routes::get_analysis))
        .route(
            "/projects/:id/ai-analyze",
            post(project_routes::ai_analyze_project),
        )
        .route(
            "/projects/:id/sessions/:session_id/ai-analyze",
            post(project_routes::ai_analyze_session),
        )
        .route(
            "/projects/:id/ai-analysis",
            get(project_routes::get_ai_analysis),
        )
        // Settings
        .route(
            "/settings",
            get(settings_routes::get_settings).put(settings_routes::update_settings),
        )
        .route(
            "/settings/suggested-paths",
            get(settings_routes::suggested_paths),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        // Public
        .route("/health", get(routes::health))
        .route("/api", get(routes::api_info))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
