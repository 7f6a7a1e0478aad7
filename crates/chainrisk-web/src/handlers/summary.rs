//! Global summary and per-country history.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chainrisk_common::error::ApiError;
use chainrisk_common::{GlobalSummary, HistoryPoint};
use chrono::Utc;
use serde::Deserialize;

use super::{path_param, query_params};
use crate::state::SharedState;

/// GET /api/global_summary
pub async fn global_summary(State(state): State<SharedState>) -> Result<Json<GlobalSummary>, ApiError> {
    let latest = state
        .engine
        .history()
        .latest_per_country()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(GlobalSummary::from_latest(latest, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub days: Option<i64>,
}

/// GET /api/history/{country}?days=N
///
/// Most recent first, at most `days` points.
pub async fn history(
    State(state): State<SharedState>,
    country: Result<Path<String>, PathRejection>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<HistoryPoint>>, ApiError> {
    let country = path_param(country)?;
    let params = query_params(params)?;
    let cfg = &state.config.history;
    let days = params
        .days
        .map(|d| d.clamp(1, cfg.max_days.max(1) as i64) as usize)
        .unwrap_or(cfg.default_days);

    let points = state
        .engine
        .history()
        .history(country.trim(), days)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(points))
}
