//! HTTP API for the LTI demo tool.
//!
//! This module wires up:
//! - LTI login initiation and launch
//! - The tool pages reached by redirect after a launch
//! - Health and metrics monitoring

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::db::Database;
use crate::html::HTML_CONTENT_TYPE;
use crate::lti::LaunchValidator;
use crate::state::StateStore;

pub mod launch;
pub mod tools;

use launch::{launch_handler, login_handler};
use tools::{course_resource_handler, platform_resource_handler, update_resource_handler};

/// Application state shared by all handlers
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub db: Arc<Database>,
    pub states: Arc<dyn StateStore>,
    pub validator: Arc<dyn LaunchValidator>,
    pub metrics: Option<PrometheusHandle>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<ServiceConfig>,
        db: Arc<Database>,
        states: Arc<dyn StateStore>,
        validator: Arc<dyn LaunchValidator>,
    ) -> Self {
        Self {
            config,
            db,
            states,
            validator,
            metrics: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let lti = &state.config.lti;
    let login_path = route_path(&lti.login_path);
    let launch_path = route_path(&lti.launch_path);
    let timeout = state.config.server.request_timeout();

    let mut app = Router::new()
        // LTI protocol endpoints
        .route(&login_path, get(login_handler).post(login_handler))
        .route(&launch_path, get(launch_handler).post(launch_handler))
        // Tool pages
        .route(
            "/platformresource",
            get(platform_resource_handler).post(platform_resource_handler),
        )
        .route(
            "/courseresource",
            get(course_resource_handler).post(course_resource_handler),
        )
        .route("/courseresource/update", post(update_resource_handler))
        // Monitoring
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http());

    if let Some(timeout) = timeout {
        app = app.layer(TimeoutLayer::new(timeout));
    }

    app.with_state(state)
}

fn route_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Wrap a rendered page in a response with the tool's content type
pub(crate) fn html_response(html: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)], html).into_response()
}

/// Host the request was addressed to, without the port
pub(crate) fn server_name(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| match host.rsplit_once(':') {
            // Bracketed IPv6 literals keep their inner colons
            Some((name, port))
                if (!host.starts_with('[') || name.ends_with(']'))
                    && port.chars().all(|c| c.is_ascii_digit()) =>
            {
                name
            }
            _ => host,
        })
        .unwrap_or("localhost")
        .to_string()
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_states: state.states.len(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    active_states: usize,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::PlatformRegistration;
    use crate::lti::UnverifiedTokenDecoder;
    use crate::state::MemoryStateStore;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub(crate) const ISSUER: &str = "https://lms.example.edu";
    pub(crate) const CLIENT_ID: &str = "tool-client";

    /// Service state backed by a temporary database and one registered platform
    pub(crate) fn test_app() -> (TempDir, Arc<AppState>) {
        test_app_with_store(Arc::new(MemoryStateStore::new(Duration::from_secs(600))))
    }

    pub(crate) fn test_app_with_store(states: Arc<dyn StateStore>) -> (TempDir, Arc<AppState>) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();

        let mut config = ServiceConfig::default();
        config.lti.platforms.push(PlatformRegistration {
            issuer: ISSUER.to_string(),
            client_id: CLIENT_ID.to_string(),
            auth_login_url: format!("{}/oidc/auth", ISSUER),
            deployment_ids: vec!["dep-1".to_string()],
        });

        let state = AppState::new(
            Arc::new(config),
            Arc::new(db),
            states,
            Arc::new(UnverifiedTokenDecoder),
        );
        (dir, Arc::new(state))
    }

    pub(crate) async fn send(
        app: &Arc<AppState>,
        request: Request<Body>,
    ) -> (StatusCode, HeaderMap, String) {
        let response = router(app.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "tool.example:8080")
            .body(Body::empty())
            .unwrap()
    }

    pub(crate) fn post_form(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "tool.example:8080")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::{route_path, server_name};
    use axum::http::{HeaderMap, StatusCode, header};

    #[test]
    fn test_server_name_strips_port() {
        let mut headers = HeaderMap::new();
        assert_eq!(server_name(&headers), "localhost");

        headers.insert(header::HOST, "tool.example:8080".parse().unwrap());
        assert_eq!(server_name(&headers), "tool.example");

        headers.insert(header::HOST, "tool.example".parse().unwrap());
        assert_eq!(server_name(&headers), "tool.example");

        headers.insert(header::HOST, "[::1]:8080".parse().unwrap());
        assert_eq!(server_name(&headers), "[::1]");
    }

    #[test]
    fn test_route_path() {
        assert_eq!(route_path("/launch"), "/launch");
        assert_eq!(route_path("launch"), "/launch");
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = test_app();
        let (status, _, body) = send(&app, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["active_states"], 0);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (_dir, app) = test_app();
        let (status, _, body) = send(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }
}
