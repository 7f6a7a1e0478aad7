//! Liveness.

use axum::Json;
use chainrisk_common::entities::MessageResponse;

/// GET /api/hello
pub async fn hello() -> Json<MessageResponse> {
    Json(MessageResponse { message: "Hello from ChainRisk API".to_string() })
}
