//! HTTP API for the CDKGate server.
//!
//! Two routers share one [`AppState`]:
//! - [`build_router`]: the public surface (verify, device check, download)
//! - [`build_admin_router`]: the privileged surface (generate, list,
//!   cleanup), served on a separate listener so the trust boundary is a
//!   network boundary, not an `if`
//!
//! The core does not authenticate admin calls; deployments are expected to
//! keep the admin port off the public interface.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cdkgate_core::{CoreError, VerifyReason};
use cdkgate_store::CdkStore;
use cdkgate_types::CdkRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The CDK store, the single source of truth.
    pub store: Arc<dyn CdkStore>,
    /// Directory holding the staged download asset.
    pub assets_dir: PathBuf,
}

// ── Request/response shapes ──────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VerifyRequest {
    pub cdk: String,
    pub device_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VerifyResponse {
    pub status: String,
    pub reason: VerifyReason,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckDeviceRequest {
    pub device_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckDeviceResponse {
    pub status: String,
    pub authorized: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerateRequest {
    pub count: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerateResponse {
    pub status: String,
    pub cdks: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ListResponse {
    pub status: String,
    pub cdks: Vec<CdkRecord>,
    pub total: u64,
    pub used: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeleteUsedResponse {
    pub status: String,
    pub deleted: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error".to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

fn core_error_response(err: CoreError) -> Response {
    match &err {
        CoreError::Validation(msg) => error_body(StatusCode::BAD_REQUEST, msg.clone()),
        CoreError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg.clone()),
        CoreError::Conflict(msg) => error_body(StatusCode::CONFLICT, msg.clone()),
        CoreError::Unauthorized => error_body(StatusCode::FORBIDDEN, "unauthorized"),
        CoreError::Store(_) if err.is_transient() => {
            warn!("store busy, returning 503");
            error_body(StatusCode::SERVICE_UNAVAILABLE, "store busy, retry later")
        }
        CoreError::Store(e) => {
            error!(error = %e, "store failure");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
        CoreError::Io(e) => {
            error!(error = %e, "io failure");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

// ── Public handlers ──────────────────────────────────────────────

async fn verify_cdk(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Response {
    match cdkgate_core::verify_and_bind(state.store.as_ref(), &req.cdk, &req.device_id) {
        Ok(outcome) => {
            let http_status = match outcome.reason {
                VerifyReason::FirstBindSuccess | VerifyReason::AlreadyBoundToThisDevice => {
                    StatusCode::OK
                }
                VerifyReason::CodeNotFound => StatusCode::NOT_FOUND,
                VerifyReason::BoundToOtherDevice => StatusCode::CONFLICT,
            };
            let body = VerifyResponse {
                status: if outcome.ok { "success" } else { "error" }.to_string(),
                reason: outcome.reason,
                message: outcome.message,
                download_url: outcome.ok.then(|| "/api/download_file".to_string()),
            };
            (http_status, Json(body)).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

async fn check_device(
    State(state): State<AppState>,
    Json(req): Json<CheckDeviceRequest>,
) -> Response {
    match cdkgate_core::is_device_authorized(state.store.as_ref(), &req.device_id) {
        Ok(authorized) => Json(CheckDeviceResponse {
            status: "success".to_string(),
            authorized,
        })
        .into_response(),
        Err(e) => core_error_response(e),
    }
}

async fn download_file(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(device_id) = headers
        .get("Device-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return error_body(StatusCode::BAD_REQUEST, "missing Device-ID header");
    };

    let asset = match cdkgate_core::fetch_asset_for_device(
        state.store.as_ref(),
        &state.assets_dir,
        device_id,
    ) {
        Ok(asset) => asset,
        Err(e) => return core_error_response(e),
    };

    let file = match tokio::fs::File::open(&asset.path).await {
        Ok(file) => file,
        Err(e) => {
            error!(error = %e, file = %asset.file_name, "failed to open staged asset");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    // Stream the archive instead of buffering it; staged assets can be large.
    let body = Body::from_stream(tokio_util::io::ReaderStream::new(file));
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    sanitize_filename(&asset.file_name)
                ),
            ),
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (header::CONTENT_LENGTH, asset.size.to_string()),
        ],
        body,
    )
        .into_response()
}

/// Makes a filename safe for a quoted content-disposition value: quotes,
/// backslashes, and control characters would otherwise break out of the
/// quoted string.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

// ── Admin handlers ───────────────────────────────────────────────

async fn generate_cdk(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    match cdkgate_core::generate_codes(state.store.as_ref(), req.count) {
        Ok(codes) => Json(GenerateResponse {
            status: "success".to_string(),
            cdks: codes.into_iter().map(|c| c.to_string()).collect(),
        })
        .into_response(),
        Err(e) => core_error_response(e),
    }
}

async fn list_cdks(State(state): State<AppState>) -> Response {
    let listed = cdkgate_core::list_codes(state.store.as_ref())
        .and_then(|cdks| Ok((cdks, cdkgate_core::stats(state.store.as_ref())?)));
    match listed {
        Ok((cdks, stats)) => Json(ListResponse {
            status: "success".to_string(),
            cdks,
            total: stats.total,
            used: stats.used,
        })
        .into_response(),
        Err(e) => core_error_response(e),
    }
}

async fn delete_used(State(state): State<AppState>) -> Response {
    match cdkgate_core::delete_used_codes(state.store.as_ref()) {
        Ok(deleted) => Json(DeleteUsedResponse {
            status: "success".to_string(),
            deleted,
        })
        .into_response(),
        Err(e) => core_error_response(e),
    }
}

// ── Routers ──────────────────────────────────────────────────────

/// Builds the public API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/verify_cdk", post(verify_cdk))
        .route("/api/check_device", post(check_device))
        .route("/api/download_file", get(download_file))
        .with_state(state)
}

/// Builds the privileged admin router. Serve this on a listener that is not
/// reachable from untrusted networks.
pub fn build_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate_cdk", post(generate_cdk))
        .route("/api/list_cdks", get(list_cdks))
        .route("/api/delete_used", post(delete_used))
        .with_state(state)
}
