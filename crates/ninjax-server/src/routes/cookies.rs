//! Cookie-jar management: status for observability, upload to replace.
//! Records expose size, mtime and validity only — never paths or contents.

use super::{ok, ApiFailure};
use crate::ratelimit::RouteClass;
use crate::state::AppState;
use axum::extract::{ConnectInfo, State};
use axum::response::Json;
use ninjax_core::credentials::CredentialRecord;
use ninjax_core::error::GatewayError;
use ninjax_core::platform::Platform;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct StatusPayload {
    cookies: BTreeMap<Platform, CredentialRecord>,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Value>, ApiFailure> {
    state.budgets.check(RouteClass::Cookies, addr.ip())?;
    Ok(ok(StatusPayload {
        cookies: state.cookies.status(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub platform: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct UploadPayload {
    record: CredentialRecord,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Value>, ApiFailure> {
    state.budgets.check(RouteClass::Cookies, addr.ip())?;

    let platform: Platform = req.platform.parse().map_err(ApiFailure::from)?;
    if req.content.trim().is_empty() {
        return Err(GatewayError::Validation("cookie content is required".to_string()).into());
    }
    if req.content.len() > state.cfg.max_body_bytes {
        return Err(GatewayError::Validation("cookie content too large".to_string()).into());
    }

    let record = state
        .cookies
        .set(platform, &req.content)
        .map_err(GatewayError::from)?;
    if !record.valid {
        tracing::warn!(platform = %platform, "uploaded cookie jar failed plausibility check");
    }
    Ok(ok(UploadPayload { record }))
}
