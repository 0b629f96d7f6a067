//! HTTP endpoints.
//!
//! Every handler is read-only. The snapshot endpoint copies the store through
//! [`SnapshotStore::snapshot`](crate::store::SnapshotStore::snapshot) and
//! serializes the copy after the store lock is released, so a slow client
//! never holds up the scanner.
//!
//! Scan failures are never reported here as HTTP errors; the snapshot
//! endpoint always answers with whatever the store holds.
//!
//! # Example
//!
//! ```ignore
//! use grideye_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use time::OffsetDateTime;

use crate::state::{AppState, SchedulerReport};
use crate::store::Snapshot;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/api/get-grid-eyes", get(get_grid_eyes))
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
}

async fn index() -> &'static str {
    "sensor."
}

/// Latest reading of every device seen since startup, keyed by address.
async fn get_grid_eyes(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.store.snapshot())
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Service status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Devices currently held in the store.
    pub device_count: usize,
    /// Background scanner state.
    pub scanner: ScannerStatus,
}

/// Scanner section of [`StatusResponse`].
#[derive(Debug, Serialize)]
pub struct ScannerStatus {
    pub interval_secs: u64,
    pub scan_duration_secs: u64,
    pub manufacturer_id: u16,
    pub expire_after_secs: Option<u64>,
    #[serde(flatten)]
    pub report: SchedulerReport,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let scanner = &state.config.scanner;
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        device_count: state.store.len(),
        scanner: ScannerStatus {
            interval_secs: scanner.interval_secs,
            scan_duration_secs: scanner.scan_duration_secs,
            manufacturer_id: scanner.manufacturer_id,
            expire_after_secs: scanner.expire_after_secs,
            report: state.scheduler.report(),
        },
    })
}
