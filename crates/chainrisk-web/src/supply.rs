//! Order, shipment and inventory records.
//! Kept in memory for the lifetime of the process, like accounts.

use std::collections::HashMap;

use async_trait::async_trait;
use chainrisk_common::error::ApiError;
use chainrisk_common::supply::{InventoryItem, Order, Shipment};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum SupplyError {
    #[error("Order ID already exists.")]
    DuplicateOrder,
    #[error("Shipment ID already exists.")]
    DuplicateShipment,
    #[error("SKU already exists.")]
    DuplicateSku,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Shipment not found")]
    ShipmentNotFound,
    #[error("Inventory item not found")]
    SkuNotFound,
    #[error("Quantity out of range")]
    QtyOverflow,
}

impl From<SupplyError> for ApiError {
    fn from(e: SupplyError) -> Self {
        match e {
            SupplyError::OrderNotFound
            | SupplyError::ShipmentNotFound
            | SupplyError::SkuNotFound => ApiError::NotFound(e.to_string()),
            _                          => ApiError::BadRequest(e.to_string()),
        }
    }
}

#[async_trait]
pub trait SupplyRepository: Send + Sync {
    async fn create_order(&self, order: Order) -> Result<(), SupplyError>;
    async fn order(&self, order_id: &str) -> Result<Order, SupplyError>;
    /// Up to `limit` orders, newest first.
    async fn orders(&self, limit: usize) -> Result<Vec<Order>, SupplyError>;
    async fn delete_order(&self, order_id: &str) -> Result<(), SupplyError>;

    async fn create_shipment(&self, shipment: Shipment) -> Result<(), SupplyError>;
    async fn shipment(&self, shipment_id: &str) -> Result<Shipment, SupplyError>;
    async fn set_shipment_status(&self, shipment_id: &str, status: &str) -> Result<Shipment, SupplyError>;

    async fn create_inventory(&self, item: InventoryItem) -> Result<(), SupplyError>;
    async fn inventory(&self, sku: &str) -> Result<InventoryItem, SupplyError>;
    /// Add `delta` (possibly negative) to the on-hand quantity.
    async fn adjust_inventory(&self, sku: &str, delta: i64, at: DateTime<Utc>) -> Result<InventoryItem, SupplyError>;
}

#[derive(Default)]
struct Tables {
    /// Insertion sequence breaks ties between equal `created_at`.
    orders: HashMap<String, (u64, Order)>,
    next_order_seq: u64,
    shipments: HashMap<String, Shipment>,
    inventory: HashMap<String, InventoryItem>,
}

#[derive(Default)]
pub struct MemorySupplyStore {
    tables: RwLock<Tables>,
}

impl MemorySupplyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SupplyRepository for MemorySupplyStore {
    async fn create_order(&self, order: Order) -> Result<(), SupplyError> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.order_id) {
            return Err(SupplyError::DuplicateOrder);
        }
        let seq = tables.next_order_seq;
        tables.next_order_seq += 1;
        info!(order_id = %order.order_id, country = %order.country, qty = order.qty, "order created");
        tables.orders.insert(order.order_id.clone(), (seq, order));
        Ok(())
    }

    async fn order(&self, order_id: &str) -> Result<Order, SupplyError> {
        let tables = self.tables.read().await;
        tables
            .orders
            .get(order_id)
            .map(|(_, order)| order.clone())
            .ok_or(SupplyError::OrderNotFound)
    }

    async fn orders(&self, limit: usize) -> Result<Vec<Order>, SupplyError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&(u64, Order)> = tables.orders.values().collect();
        rows.sort_by(|a, b| (b.1.created_at, b.0).cmp(&(a.1.created_at, a.0)));
        Ok(rows.into_iter().take(limit).map(|(_, order)| order.clone()).collect())
    }

    async fn delete_order(&self, order_id: &str) -> Result<(), SupplyError> {
        let mut tables = self.tables.write().await;
        tables.orders.remove(order_id).ok_or(SupplyError::OrderNotFound)?;
        info!(order_id, "order deleted");
        Ok(())
    }

    async fn create_shipment(&self, shipment: Shipment) -> Result<(), SupplyError> {
        let mut tables = self.tables.write().await;
        if tables.shipments.contains_key(&shipment.shipment_id) {
            return Err(SupplyError::DuplicateShipment);
        }
        info!(shipment_id = %shipment.shipment_id, order_id = %shipment.order_id, "shipment created");
        tables.shipments.insert(shipment.shipment_id.clone(), shipment);
        Ok(())
    }

    async fn shipment(&self, shipment_id: &str) -> Result<Shipment, SupplyError> {
        let tables = self.tables.read().await;
        tables.shipments.get(shipment_id).cloned().ok_or(SupplyError::ShipmentNotFound)
    }

    async fn set_shipment_status(&self, shipment_id: &str, status: &str) -> Result<Shipment, SupplyError> {
        let mut tables = self.tables.write().await;
        let shipment = tables.shipments.get_mut(shipment_id).ok_or(SupplyError::ShipmentNotFound)?;
        shipment.status = status.to_string();
        info!(shipment_id, status, "shipment status updated");
        Ok(shipment.clone())
    }

    async fn create_inventory(&self, item: InventoryItem) -> Result<(), SupplyError> {
        let mut tables = self.tables.write().await;
        if tables.inventory.contains_key(&item.sku) {
            return Err(SupplyError::DuplicateSku);
        }
        info!(sku = %item.sku, location = %item.location, qty = item.qty, "inventory created");
        tables.inventory.insert(item.sku.clone(), item);
        Ok(())
    }

    async fn inventory(&self, sku: &str) -> Result<InventoryItem, SupplyError> {
        let tables = self.tables.read().await;
        tables.inventory.get(sku).cloned().ok_or(SupplyError::SkuNotFound)
    }

    async fn adjust_inventory(&self, sku: &str, delta: i64, at: DateTime<Utc>) -> Result<InventoryItem, SupplyError> {
        let mut tables = self.tables.write().await;
        let item = tables.inventory.get_mut(sku).ok_or(SupplyError::SkuNotFound)?;
        item.qty = item.qty.checked_add(delta).ok_or(SupplyError::QtyOverflow)?;
        item.updated_at = at;
        info!(sku, delta, qty = item.qty, "inventory adjusted");
        Ok(item.clone())
    }
}
