//! HTTP surface: router assembly, uniform response envelope, security
//! headers. Handlers live in the submodules; every failure path funnels
//! through [`ApiFailure`] so no internal error escapes unmapped.

pub mod cookies;
pub mod files;
pub mod media;


use crate::state::AppState;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use ninjax_core::error::GatewayError;
use ninjax_core::extract::Metadata;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    // The request timeout must outlast a full media fetch.
    let request_deadline = Duration::from_secs(state.cfg.fetch_timeout_secs + 30);
    let max_body = state.cfg.max_body_bytes;

    Router::new()
        .route("/api/analyze", post(media::analyze))
        .route("/api/download", post(media::download))
        .route("/api/file/:name", get(files::serve_artifact))
        .route("/health", get(files::health))
        .route("/api/cookies/status", get(cookies::status))
        .route("/api/cookies/upload", post(cookies::upload))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TimeoutLayer::new(request_deadline))
        .with_state(state)
}

/// Response headers applied to every route.
async fn security_headers(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    res
}

/// Success envelope: the payload's fields plus `"success": true`.
pub(crate) fn ok<T: Serialize>(payload: T) -> Json<Value> {
    let mut body = serde_json::to_value(payload).unwrap_or_else(|e| {
        tracing::error!(error = %e, "payload serialization failed");
        Value::Object(Default::default())
    });
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Json(body)
}

/// Failure envelope with the HTTP status the error kind maps to.
pub struct ApiFailure {
    status: StatusCode,
    message: String,
    partial: bool,
    metadata: Option<Metadata>,
}

impl ApiFailure {
    /// Metadata-only fetch outcome: not an internal error, but no servable
    /// file either. Carries the probed metadata so the client can decide.
    pub fn partial(message: String, metadata: Metadata) -> Self {
        Self {
            status: StatusCode::OK,
            message,
            partial: true,
            metadata: Some(metadata),
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.to_string(),
            partial: false,
            metadata: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "file not found or expired".to_string(),
            partial: false,
            metadata: None,
        }
    }
}

impl From<GatewayError> for ApiFailure {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::Validation(_) | GatewayError::Unsupported(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };
        // Full detail stays server-side; the envelope gets the safe text.
        match &err {
            GatewayError::Storage(_) | GatewayError::Network(_) | GatewayError::Timeout(_) => {
                tracing::error!(error = %err, "request failed");
            }
            _ => tracing::debug!(error = %err, "request rejected"),
        }
        Self {
            status,
            message: err.client_message(),
            partial: false,
            metadata: None,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.message,
        });
        if self.partial {
            body["partial"] = Value::Bool(true);
        }
        if let Some(meta) = self.metadata {
            if let Ok(v) = serde_json::to_value(meta) {
                body["metadata"] = v;
            }
        }
        (self.status, Json(body)).into_response()
    }
}
