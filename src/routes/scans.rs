// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan recording and scan history routes.

use crate::error::Result;
use crate::models::ScanOutcome;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/scans", get(get_scan_history).post(record_scan))
}

// ─── Record Scan ─────────────────────────────────────────────

/// Scan submission from the slide page.
///
/// Missing fields deserialize as empty strings so they are reported as
/// validation errors rather than body rejections.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordScanRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub slide_id: String,
    /// Set when the scan was captured offline and is being synced later
    pub scanned_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ScanStatus {
    Recorded,
    AlreadyScanned,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordScanResponse {
    pub status: ScanStatus,
    pub already_scanned: bool,
    pub total_scans: u32,
    pub message: String,
}

impl From<ScanOutcome> for RecordScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Recorded { total_scans } => Self {
                status: ScanStatus::Recorded,
                already_scanned: false,
                total_scans,
                message: "Scan recorded".to_string(),
            },
            ScanOutcome::AlreadyScanned { total_scans } => Self {
                status: ScanStatus::AlreadyScanned,
                already_scanned: true,
                total_scans,
                message: "Slide already scanned".to_string(),
            },
        }
    }
}

/// Record a scan. Duplicates return 200 with `status: "already_scanned"`.
async fn record_scan(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RecordScanRequest>, JsonRejection>,
) -> Result<Json<RecordScanResponse>> {
    let Json(request) = payload?;
    let outcome = match request.scanned_at {
        Some(scanned_at) => {
            state
                .ledger
                .record_scan_at(&request.user_name, &request.slide_id, scanned_at)
                .await?
        }
        None => {
            state
                .ledger
                .record_scan(&request.user_name, &request.slide_id)
                .await?
        }
    };

    Ok(Json(outcome.into()))
}

// ─── Scan History ────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SlideScan {
    pub slide_id: String,
    pub scanned_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserScans {
    pub user: String,
    pub registered_at: String,
    pub scans: Vec<SlideScan>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScanHistoryResponse {
    pub users: Vec<UserScans>,
}

/// Every participant with the slides they scanned, in scan order.
async fn get_scan_history(State(state): State<Arc<AppState>>) -> Result<Json<ScanHistoryResponse>> {
    let history = state.ledger.scan_history().await?;

    let users = history
        .into_iter()
        .map(|h| UserScans {
            user: h.user.name,
            registered_at: format_utc_rfc3339(h.user.created_at),
            scans: h
                .scans
                .into_iter()
                .map(|s| SlideScan {
                    slide_id: s.slide_id,
                    scanned_at: format_utc_rfc3339(s.scanned_at),
                })
                .collect(),
        })
        .collect();

    Ok(Json(ScanHistoryResponse { users }))
}
