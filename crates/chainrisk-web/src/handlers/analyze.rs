//! Risk analysis endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use chainrisk_common::entities::{AnalyzeRequest, RiskScore};
use chainrisk_common::error::ApiError;
use chainrisk_common::RiskAnalysis;
use tracing::instrument;

use super::{json_body, path_param};
use crate::auth::ApiCaller;
use crate::state::SharedState;

/// POST /api/analyze
#[instrument(skip_all)]
pub async fn analyze(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<RiskAnalysis>, ApiError> {
    let req = json_body(payload)?;
    let (country, text) = req.validated()?;
    let analysis = state.engine.analyze(country.as_deref(), text.as_deref()).await;
    Ok(Json(analysis))
}

/// GET /api/risk_score/{country}
pub async fn risk_score(
    State(state): State<SharedState>,
    country: Result<Path<String>, PathRejection>,
) -> Result<Json<RiskScore>, ApiError> {
    let country = path_param(country)?;
    let country = country.trim();
    if country.is_empty() {
        return Err(ApiError::validation("country is required"));
    }
    Ok(Json(state.engine.quick_score(country).await))
}
