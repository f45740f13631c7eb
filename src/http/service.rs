//! HTTP handlers for the login honeypot.

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::guard::resolve_caller;
use crate::pipeline::{LoginOutcome, LoginPipeline, LoginSubmission};
use crate::stats::StatsSnapshot;

/// Fixed body for blacklisted callers.
const ACCESS_DENIED: &str = "Access denied";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<LoginPipeline>,
    trust_forwarded_header: bool,
}

impl AppState {
    pub fn new(pipeline: Arc<LoginPipeline>, trust_forwarded_header: bool) -> Self {
        Self {
            pipeline,
            trust_forwarded_header,
        }
    }
}

/// `POST /login` body. Missing fields are treated as empty.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kennwort: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    message: String,
    stats: StatsSnapshot,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the router: API routes, then static files for everything else.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/stats", get(stats_handler))
        .route("/login", post(login_handler))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.pipeline.stats().await)
}

async fn login_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Response {
    let caller = resolve_caller(&headers, Some(peer), state.trust_forwarded_header);
    debug!(caller = %caller, "Processing login request");

    let submission = LoginSubmission {
        name: request.name,
        secret: request.kennwort,
    };

    match state.pipeline.submit(caller, submission).await {
        LoginOutcome::Blocked => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: ACCESS_DENIED.to_string(),
            }),
        )
            .into_response(),
        LoginOutcome::Throttled {
            message,
            retry_after,
        } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs(retry_after).to_string())],
            Json(ErrorResponse { error: message }),
        )
            .into_response(),
        LoginOutcome::Rejected { message, stats } => Json(LoginResponse {
            success: false,
            message,
            stats,
        })
        .into_response(),
    }
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after
        .as_secs()
        .saturating_add(u64::from(retry_after.subsec_nanos() > 0));
    secs.max(1)
}
