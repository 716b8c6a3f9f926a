//! `analyze` and `download`: the two extractor-backed operations.
//!
//! Both run the same front half: budget check, URL validation, platform
//! parse, shape-checked dispatch, then a bounded worker-pool slot around
//! the extractor call. Logs carry the URL host and platform, never the
//! full URL.

use super::{ok, ApiFailure};
use crate::ratelimit::RouteClass;
use crate::state::AppState;
use axum::extract::{ConnectInfo, State};
use axum::response::Json;
use ninjax_core::error::GatewayError;
use ninjax_core::extract::{Extractor, FetchOutcome, FormatSelector};
use ninjax_core::platform::Platform;
use ninjax_core::validate::validate_url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
    pub platform: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub platform: String,
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Serialize)]
struct DownloadPayload {
    filename: String,
    download_url: String,
    size_bytes: u64,
    artifact_id: Uuid,
    title: String,
}

/// Shared front half: validation and dispatch, no extractor work yet.
fn admit(
    state: &AppState,
    class: RouteClass,
    addr: SocketAddr,
    raw_url: &str,
    raw_platform: &str,
) -> Result<(Url, Platform, Arc<dyn Extractor>), GatewayError> {
    state.budgets.check(class, addr.ip())?;
    let url = validate_url(raw_url.trim()).map_err(|r| GatewayError::Validation(r.to_string()))?;
    let platform: Platform = raw_platform.parse()?;
    let extractor = state.dispatcher.resolve(platform, &url)?;
    Ok((url, platform, extractor))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let (url, platform, extractor) =
        admit(&state, RouteClass::Analyze, addr, &req.url, &req.platform)?;

    let _slot = state
        .fetch_slots
        .acquire()
        .await
        .map_err(|_| GatewayError::Unavailable("service shutting down".to_string()))?;

    let jar = state.cookies.get(platform);
    let meta = extractor
        .probe(&url, jar.as_ref())
        .await
        .map_err(GatewayError::from)?;

    tracing::info!(
        host = url.host_str().unwrap_or("-"),
        platform = %platform,
        formats = meta.formats.len(),
        "analyze ok"
    );
    Ok(ok(meta))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<DownloadRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let (url, platform, extractor) =
        admit(&state, RouteClass::Download, addr, &req.url, &req.platform)?;

    let selector = FormatSelector {
        format_id: req.format_id,
        quality: req.quality,
    };

    let _slot = state
        .fetch_slots
        .acquire()
        .await
        .map_err(|_| GatewayError::Unavailable("service shutting down".to_string()))?;

    let jar = state.cookies.get(platform);
    let outcome = extractor
        .fetch(&url, &selector, jar.as_ref(), &state.temp_dir)
        .await
        .map_err(GatewayError::from)?;

    match outcome {
        FetchOutcome::Media { path, ext, title } => {
            let title = title.unwrap_or_else(|| "media".to_string());
            let artifact = state.artifacts.commit(&path, &ext, platform, &title)?;
            tracing::info!(
                host = url.host_str().unwrap_or("-"),
                platform = %platform,
                artifact = %artifact.file_name,
                "download ok"
            );
            Ok(ok(DownloadPayload {
                download_url: format!("/api/file/{}", artifact.file_name),
                filename: artifact.file_name,
                size_bytes: artifact.size_bytes,
                artifact_id: artifact.id,
                title: artifact.title,
            }))
        }
        // Product decision still open upstream for this case; surfacing it
        // as an explicit partial result instead of faking a file.
        FetchOutcome::MetadataOnly(meta) => {
            tracing::info!(
                host = url.host_str().unwrap_or("-"),
                platform = %platform,
                "fetch produced metadata only"
            );
            Err(ApiFailure::partial(
                "platform returned metadata but no downloadable media".to_string(),
                meta,
            ))
        }
    }
}
