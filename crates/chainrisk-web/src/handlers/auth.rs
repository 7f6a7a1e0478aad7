//! Login, registration and the current-user profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chainrisk_common::entities::{
    LoginRequest, MessageResponse, RegisterRequest, TokenResponse, UserProfile,
};
use chainrisk_common::error::ApiError;
use tracing::info;

use super::json_body;
use crate::auth::{AuthError, AuthUser};
use crate::state::SharedState;

/// POST /login
pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let req = json_body(payload)?;
    let user = state.users.authenticate(&req.email, &req.password).await?;
    let access_token = state.tokens.issue(&user.email)?;
    info!(email = %user.email, "login");
    Ok(Json(TokenResponse { access_token, token_type: "bearer".to_string() }))
}

/// POST /api/register
pub async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = json_body(payload)?;
    for (field, value) in [("name", &req.name), ("email", &req.email), ("password", &req.password)] {
        if value.trim().is_empty() {
            return Err(ApiError::validation(format!("{} is required", field)));
        }
    }

    state.users.register(&req.name, &req.email, &req.password).await?;
    info!(email = %req.email.trim(), "user registered");
    Ok(Json(MessageResponse { message: "Registration successful".to_string() }))
}

/// GET /api/me
pub async fn me(
    user: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<UserProfile>, ApiError> {
    let record = state.users.get(&user.email).await.ok_or(AuthError::InvalidToken)?;
    Ok(Json(UserProfile { username: record.email, name: record.name }))
}
