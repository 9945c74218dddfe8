//! Axum-based HTTP gateway.
//!
//! Thin handlers over the service layer, with body limits, request
//! timeouts, and a uniform error body. Domain errors map to stable 4xx
//! responses; infrastructure errors collapse to generic 5xx with details
//! kept in the logs.

pub mod auth;
mod dto;
mod handlers;
mod sse;

pub use auth::TokenVerifier;

use crate::app::AppContext;
use crate::error::{CoreError, DomainError};
use axum::{
    Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use handlers::{
    handle_complete, handle_confirm_upload, handle_feedback, handle_get_interview, handle_health,
    handle_history, handle_multipart_response, handle_start, handle_upload_url,
};
use sse::handle_events;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size, sized for the deprecated multipart video
/// fallback, the one endpoint that carries media through the server.
pub const MAX_BODY_SIZE: usize = 32 * 1024 * 1024;
/// Request timeout for producing a response head.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub verifier: Arc<TokenVerifier>,
}

/// Structured error response: `{error, status}` with a stable shape.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "missing or invalid bearer token".into(),
        }
    }

    pub fn bad_request(field: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("invalid {field}: {reason}"),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let (status, message) = match &err {
            CoreError::Domain(domain) => match domain {
                DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, domain.to_string()),
                DomainError::IllegalState { .. } | DomainError::Duplicate { .. } => {
                    (StatusCode::CONFLICT, domain.to_string())
                }
                DomainError::Validation { .. } | DomainError::UploadNotFound { .. } => {
                    (StatusCode::BAD_REQUEST, domain.to_string())
                }
            },
            CoreError::Vendor(vendor) => {
                tracing::error!(error = %vendor, "vendor failure at the boundary");
                (StatusCode::BAD_GATEWAY, "upstream service failure".into())
            }
            CoreError::Blob(blob) => {
                tracing::error!(error = %blob, "blob store failure at the boundary");
                (StatusCode::BAD_GATEWAY, "storage failure".into())
            }
            CoreError::Timeout { stage } => {
                tracing::error!(stage, "async job deadline at the boundary");
                (StatusCode::GATEWAY_TIMEOUT, "upstream timeout".into())
            }
            CoreError::Config(_) | CoreError::Db(_) | CoreError::Internal(_) => {
                tracing::error!(error = %err, "internal error at the boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "status": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}

/// Resolve the bearer token to a user id or fail with 401.
pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");
    state.verifier.verify(token).ok_or_else(ApiError::unauthorized)
}

async fn log_requests(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    tracing::debug!(%method, path, status = response.status().as_u16(), "request");
    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/interviews/start", post(handle_start))
        .route("/api/interviews/history", get(handle_history))
        .route("/api/interviews/{id}", get(handle_get_interview))
        .route("/api/interviews/{id}/upload-url", post(handle_upload_url))
        .route(
            "/api/interviews/{id}/confirm-upload",
            post(handle_confirm_upload),
        )
        .route(
            "/api/interviews/{id}/response",
            post(handle_multipart_response),
        )
        .route("/api/interviews/{id}/complete", post(handle_complete))
        .route("/api/interviews/{id}/feedback", get(handle_feedback))
        .route("/api/interviews/{id}/events", get(handle_events))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        // The browser client lives on another origin and talks to the blob
        // store directly; the API itself is bearer-authenticated.
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serve on a pre-bound listener until `shutdown` fires.
pub async fn run_gateway(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "gateway listening");

    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
