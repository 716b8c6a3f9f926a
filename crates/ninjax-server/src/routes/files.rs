//! Artifact serving and health.
//!
//! Serving is the paranoid path: sanitize the client name, screen the
//! extension, resolve with the root-containment check, then stream. A file
//! deleted by the sweeper between resolve and open is reported as 404 —
//! the documented "expired" outcome.

use super::{ok, ApiFailure};
use crate::ratelimit::RouteClass;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use ninjax_core::platform::Platform;
use ninjax_core::validate::{sanitize_filename, validate_file_extension};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::io::ReaderStream;

pub async fn serve_artifact(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
) -> Result<Response, ApiFailure> {
    state.budgets.check(RouteClass::Files, addr.ip())?;

    let safe = sanitize_filename(&name);
    if safe != name {
        return Err(ApiFailure::forbidden("invalid file name"));
    }
    if !validate_file_extension(&safe) {
        return Err(ApiFailure::forbidden("file type not served"));
    }

    let path = state.artifacts.resolve(&safe).ok_or_else(ApiFailure::not_found)?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiFailure::not_found())?;
    let len = file.metadata().await.map(|m| m.len()).ok();

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe}\""),
        );
    if let Some(len) = len {
        response = response.header(header::CONTENT_LENGTH, len);
    }
    response
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|_| ApiFailure::not_found())
}

#[derive(Debug, Serialize)]
struct HealthPayload {
    status: &'static str,
    version: &'static str,
    timestamp_unix: u64,
    downloaders: BTreeMap<Platform, bool>,
    directories: BTreeMap<&'static str, bool>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let directories = BTreeMap::from([
        ("downloads", state.artifacts.root().is_dir()),
        ("temp", state.temp_dir.is_dir()),
    ]);
    let payload = HealthPayload {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
        downloaders: state.dispatcher.availability(),
        directories,
    };
    let body: Json<Value> = ok(payload);
    let mut res = body.into_response();
    res.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    res
}
