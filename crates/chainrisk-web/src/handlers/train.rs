//! Model training trigger.

use std::path::Path;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chainrisk_common::entities::TrainResponse;
use chainrisk_common::error::ApiError;
use chainrisk_common::training::{TrainError, TrainingMetrics};
use serde::Deserialize;
use tracing::{error, info};

use super::query_params;
use crate::auth::ApiCaller;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct TrainParams {
    pub background: Option<bool>,
}

/// POST /api/train[?background=true|false]
pub async fn train(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    params: Result<Query<TrainParams>, QueryRejection>,
) -> Result<Json<TrainResponse>, ApiError> {
    let params = query_params(params)?;
    if params.background.unwrap_or(true) {
        let state = state.clone();
        tokio::spawn(async move {
            // Failures are reported on the event feed.
            let _ = run_training(&state).await;
        });
        return Ok(Json(TrainResponse::started_background()));
    }

    let metrics = run_training(&state)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(TrainResponse::trained(metrics)))
}

/// One training run. Runs are serialised on the state's training lock.
async fn run_training(state: &SharedState) -> Result<TrainingMetrics, TrainError> {
    let _guard = state.training.lock().await;
    let _ = state.event_tx.send(AppEvent::TrainingStarted);

    let cfg = &state.config.model;
    let result = state
        .engine
        .train(Path::new(&cfg.dataset_path), cfg.model_path.as_deref().map(Path::new))
        .await;

    match &result {
        Ok(m) => {
            info!(mae = m.mae, r2 = m.r2, n_train = m.n_train, "training complete");
            let _ = state.event_tx.send(AppEvent::TrainingComplete {
                mae: m.mae,
                r2: m.r2,
                n_train: m.n_train,
            });
        }
        Err(e) => {
            error!(error = %e, "training failed");
            let _ = state.event_tx.send(AppEvent::TrainingFailed { message: e.to_string() });
        }
    }
    result
}
