// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard route.

use crate::error::Result;
use crate::services::ranking::assign_positions;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ranking", get(get_ranking))
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingRow {
    /// 1 = overall leader; never shared between participants
    pub position: u32,
    pub user: String,
    pub scan_count: u32,
    pub last_scan_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingResponse {
    pub entries: Vec<RankingRow>,
    pub total_participants: u32,
}

/// Current leaderboard, recomputed on every request.
async fn get_ranking(State(state): State<Arc<AppState>>) -> Result<Json<RankingResponse>> {
    let ranking = state.ranking.get_ranking().await?;

    let entries: Vec<RankingRow> = assign_positions(ranking)
        .into_iter()
        .map(|ranked| RankingRow {
            position: ranked.position,
            user: ranked.entry.user,
            scan_count: ranked.entry.scan_count,
            last_scan_at: format_utc_rfc3339(ranked.entry.last_scan_at),
        })
        .collect();

    Ok(Json(RankingResponse {
        total_participants: entries.len() as u32,
        entries,
    }))
}
