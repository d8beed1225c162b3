// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Organizer routes: list, remove, reset and export participants.
//!
//! These routes are not authenticated.

use crate::error::Result;
use crate::routes::users::UserResponse;
use crate::time_utils::{export_date, format_utc_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users).delete(clear_all))
        .route("/api/admin/users/{name}", delete(remove_user))
        .route("/api/admin/export", get(export_users))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UsersResponse {
    /// Newest registration first
    pub users: Vec<UserResponse>,
    pub total: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ExportSnapshot {
    /// When the export was taken
    pub timestamp: String,
    pub total_users: u32,
    pub users: Vec<UserResponse>,
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<UsersResponse>> {
    let users: Vec<UserResponse> = state
        .ledger
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UsersResponse {
        total: users.len() as u32,
        users,
    }))
}

async fn remove_user(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    state.ledger.remove_user(&name).await?;

    Ok(Json(AdminActionResponse {
        success: true,
        message: format!("Removed {}", name.trim()),
    }))
}

async fn clear_all(State(state): State<Arc<AppState>>) -> Result<Json<AdminActionResponse>> {
    state.ledger.clear_all().await?;

    Ok(Json(AdminActionResponse {
        success: true,
        message: "All participants removed".to_string(),
    }))
}

/// Download the participant list as a JSON attachment.
async fn export_users(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let now = chrono::Utc::now();
    let users: Vec<UserResponse> = state
        .ledger
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    tracing::info!(total = users.len(), "Exporting participants");

    let disposition = format!(
        "attachment; filename=\"participants-{}.json\"",
        export_date(now)
    );
    let snapshot = ExportSnapshot {
        timestamp: format_utc_rfc3339(now),
        total_users: users.len() as u32,
        users,
    };

    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(snapshot)))
}
