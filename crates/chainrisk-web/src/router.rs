//! Axum router: maps all URL paths to handlers.

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    analyze::{analyze, risk_score},
    auth::{login, me, register},
    predict::predict,
    summary::{global_summary, history},
    supply::{
        adjust_inventory, create_inventory, create_order, create_shipment, delete_order,
        get_inventory, get_order, get_shipment, list_orders, update_shipment,
    },
    system::hello,
    train::train,
};
use crate::sse::sse_handler;
use crate::state::SharedState;

/// Build the full gateway router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/hello", get(hello))

        // Auth
        .route("/login",        post(login))
        .route("/api/login",    post(login))
        .route("/api/register", post(register))
        .route("/api/me",       get(me))

        // Risk
        .route("/api/analyze",              post(analyze))
        .route("/api/risk_score/{country}", get(risk_score))
        .route("/api/predict",              post(predict))
        .route("/api/train",                post(train))
        .route("/api/global_summary",       get(global_summary))
        .route("/api/global-summary",       get(global_summary))
        .route("/api/history/{country}",    get(history))

        // Supply
        .route("/api/orders",                 get(list_orders).post(create_order))
        .route("/api/orders/{order_id}",      get(get_order).delete(delete_order))
        .route("/api/shipments",              post(create_shipment))
        .route("/api/shipments/{shipment_id}", get(get_shipment).patch(update_shipment))
        .route("/api/inventory",              post(create_inventory))
        .route("/api/inventory/{sku}",        get(get_inventory).patch(adjust_inventory))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
