//! Orders, shipments and inventory.
//!
//! Reads are public like the summary routes; writes go through [`ApiCaller`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chainrisk_common::error::ApiError;
use chainrisk_common::supply::{
    Ack, InventoryItem, NewInventoryItem, NewOrder, NewShipment, Order, Shipment,
    DEFAULT_ORDER_LIMIT, MAX_ORDER_LIMIT,
};
use chrono::Utc;
use serde::Deserialize;

use super::{json_body, path_param, query_params};
use crate::auth::ApiCaller;
use crate::state::SharedState;

// ── Orders ────────────────────────────────────────────────────────────────────

/// POST /api/orders
pub async fn create_order(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let order = json_body(payload)?.validated()?.into_order(Utc::now());
    let ack = Ack::order_created(&order.order_id);
    state.supply.create_order(order).await?;
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// GET /api/orders?limit=N
///
/// Newest first. `limit` defaults to 50 and is clamped to 1..=500.
pub async fn list_orders(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let limit = query_params(params)?
        .limit
        .map(|l| l.clamp(1, MAX_ORDER_LIMIT))
        .unwrap_or(DEFAULT_ORDER_LIMIT);
    Ok(Json(state.supply.orders(limit).await?))
}

/// GET /api/orders/{order_id}
pub async fn get_order(
    State(state): State<SharedState>,
    order_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let order_id = path_param(order_id)?;
    Ok(Json(state.supply.order(order_id.trim()).await?))
}

/// DELETE /api/orders/{order_id}
pub async fn delete_order(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    order_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Ack>, ApiError> {
    let order_id = path_param(order_id)?;
    state.supply.delete_order(order_id.trim()).await?;
    Ok(Json(Ack::deleted()))
}

// ── Shipments ─────────────────────────────────────────────────────────────────

/// POST /api/shipments
pub async fn create_shipment(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    payload: Result<Json<NewShipment>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let shipment = json_body(payload)?.validated()?.into_shipment(Utc::now());
    let ack = Ack::shipment_created(&shipment.shipment_id);
    state.supply.create_shipment(shipment).await?;
    Ok(Json(ack))
}

/// GET /api/shipments/{shipment_id}
pub async fn get_shipment(
    State(state): State<SharedState>,
    shipment_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Shipment>, ApiError> {
    let shipment_id = path_param(shipment_id)?;
    Ok(Json(state.supply.shipment(shipment_id.trim()).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub status: String,
}

/// PATCH /api/shipments/{shipment_id}?status=S
pub async fn update_shipment(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    shipment_id: Result<Path<String>, PathRejection>,
    params: Result<Query<StatusParams>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let shipment_id = path_param(shipment_id)?;
    let status = query_params(params)?.status;
    let status = status.trim();
    if status.is_empty() {
        return Err(ApiError::validation("status is required"));
    }
    state.supply.set_shipment_status(shipment_id.trim(), status).await?;
    Ok(Json(Ack::updated()))
}

// ── Inventory ─────────────────────────────────────────────────────────────────

/// POST /api/inventory
pub async fn create_inventory(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    payload: Result<Json<NewInventoryItem>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let item = json_body(payload)?.validated()?.into_item(Utc::now());
    state.supply.create_inventory(item).await?;
    Ok(Json(Ack::ok()))
}

/// GET /api/inventory/{sku}
pub async fn get_inventory(
    State(state): State<SharedState>,
    sku: Result<Path<String>, PathRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let sku = path_param(sku)?;
    Ok(Json(state.supply.inventory(sku.trim()).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeltaParams {
    pub delta: i64,
}

/// PATCH /api/inventory/{sku}?delta=N
pub async fn adjust_inventory(
    _caller: ApiCaller,
    State(state): State<SharedState>,
    sku: Result<Path<String>, PathRejection>,
    params: Result<Query<DeltaParams>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let sku = path_param(sku)?;
    let delta = query_params(params)?.delta;
    state.supply.adjust_inventory(sku.trim(), delta, Utc::now()).await?;
    Ok(Json(Ack::updated()))
}
