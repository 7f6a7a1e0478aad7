//! HTTP handlers for all gateway routes.

pub mod analyze;
pub mod auth;
pub mod predict;
pub mod supply;
pub mod summary;
pub mod system;
pub mod train;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;
use chainrisk_common::error::ApiError;

/// Unwrap a JSON body, turning extractor rejections into `{"detail"}` 400s.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub(crate) fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub(crate) fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    param
        .map(|Path(param)| param)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}
