//! Bearer-token check for `/api` routes

use super::{json_error, AppState};
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

fn unauthorized(message: &str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, message)
}

/// Requires `Authorization: Bearer <api_key>` when an API key is configured;
/// without one every request passes (local mode).
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_key) = &state.api_key else {
        return next.run(request).await;
    };

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(provided)) if provided == expected_key => next.run(request).await,
        Some(Some(_)) => unauthorized("Invalid API key"),
        Some(None) => {
            unauthorized("Invalid Authorization header format. Expected: Bearer <api_key>")
        }
        None => unauthorized("API key required. Set Authorization: Bearer <api_key>"),
    }
}

#[cfg(test)]
mod tests {
    use crate::ai::{AiAnalyzer, AiTaskQueue};
    use crate::api::{create_router, AppState};
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(api_key: Option<&str>) -> axum::Router {
        let dir = std::env::temp_dir();
        let mut config = Config::default();
        config.server.api_key = api_key.map(str::to_string);
        config.paths.projects_dir = Some(dir.join("claude-report-auth-test-projects"));
        config.paths.reports_dir = dir.join("claude-report-auth-test-reports");
        let ai = AiAnalyzer::new(None, Duration::from_secs(1), AiTaskQueue::new(1));
        create_router(AppState::new(config, dir.join("config.toml"), ai, None))
    }

    async fn status(app: axum::Router, auth: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri("/api/projects");
        if let Some(auth) = auth {
            request = request.header("Authorization", auth);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_no_key_allows_all() {
        assert_eq!(status(app(None), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_key_required() {
        assert_eq!(status(app(Some("s3cret")), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(app(Some("s3cret")), Some("Bearer wrong")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(app(Some("s3cret")), Some("s3cret")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(app(Some("s3cret")), Some("Bearer s3cret")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app(Some("s3cret"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
