//! Model prediction endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chainrisk_common::entities::PredictRequest;
use chainrisk_common::error::ApiError;
use chainrisk_common::Prediction;

use super::json_body;
use crate::auth::ApiCaller;
use crate::state::SharedState;

/// POST /api/predict
///
/// `features` must be an object of named fields; see [`chainrisk_common::FeatureVector`].
pub async fn predict(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let req = json_body(payload)?;
    if !req.has_input() {
        return Err(ApiError::validation("provide country, text or features"));
    }
    Ok(Json(state.engine.predict(&req).await))
}
