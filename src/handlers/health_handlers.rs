//! Root, health & readiness handlers.
//!
//! - GET /         -> service banner
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the database and blob backend

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// `GET /`
///
/// Tiny banner so a browser hitting the base URL sees something useful.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "image inventory API — see /images and /validate/{token}"
    }))
}

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Runs a lightweight query against the metadata database (`SELECT 1`).
/// 2. Asks the blob backend for a sentinel key (NotFound counts as healthy).
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails. Startup no longer waits for the database;
/// orchestrators are expected to poll this endpoint instead.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let database_check = match state.images.ping().await {
        Ok(()) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let storage_check = match state.blobs.probe().await {
        Ok(()) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let database_ok = database_check.0;
    let storage_ok = storage_check.0;
    let overall_ok = database_ok && storage_ok;

    let mut checks = HashMap::new();
    checks.insert(
        "database",
        CheckStatus {
            ok: database_ok,
            error: database_check.1,
        },
    );
    checks.insert(
        "storage",
        CheckStatus {
            ok: storage_ok,
            error: storage_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
