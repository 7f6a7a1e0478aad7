//! Orders, shipments and inventory: the supply-side records the gateway
//! keeps alongside risk data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChainRiskError, Result};

/// Status a shipment starts in when the request does not name one.
pub const DEFAULT_SHIPMENT_STATUS: &str = "in_transit";
/// Page size of `GET /api/orders` without `?limit=`.
pub const DEFAULT_ORDER_LIMIT: usize = 50;
pub const MAX_ORDER_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: String,
    pub country: String,
    pub supplier: String,
    pub qty: i64,
    #[serde(default)]
    pub eta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub country: String,
    pub supplier: String,
    pub qty: i64,
    #[serde(default)]
    pub eta: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            order_id: required("order_id", &self.order_id)?,
            country: required("country", &self.country)?,
            supplier: required("supplier", &self.supplier)?,
            qty: self.qty,
            eta: self.eta.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
        })
    }

    pub fn into_order(self, created_at: DateTime<Utc>) -> Order {
        Order {
            order_id: self.order_id,
            country: self.country,
            supplier: self.supplier,
            qty: self.qty,
            eta: self.eta,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Shipments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShipment {
    pub shipment_id: String,
    pub order_id: String,
    pub origin: String,
    pub destination: String,
    #[serde(default = "default_shipment_status")]
    pub status: String,
}

fn default_shipment_status() -> String {
    DEFAULT_SHIPMENT_STATUS.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: String,
    pub order_id: String,
    pub origin: String,
    pub destination: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl NewShipment {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            shipment_id: required("shipment_id", &self.shipment_id)?,
            order_id: required("order_id", &self.order_id)?,
            origin: required("origin", &self.origin)?,
            destination: required("destination", &self.destination)?,
            status: required("status", &self.status)?,
        })
    }

    pub fn into_shipment(self, created_at: DateTime<Utc>) -> Shipment {
        Shipment {
            shipment_id: self.shipment_id,
            order_id: self.order_id,
            origin: self.origin,
            destination: self.destination,
            status: self.status,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub sku: String,
    pub location: String,
    pub qty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub sku: String,
    pub location: String,
    pub qty: i64,
    pub updated_at: DateTime<Utc>,
}

impl NewInventoryItem {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            sku: required("sku", &self.sku)?,
            location: required("location", &self.location)?,
            qty: self.qty,
        })
    }

    pub fn into_item(self, updated_at: DateTime<Utc>) -> InventoryItem {
        InventoryItem { sku: self.sku, location: self.location, qty: self.qty, updated_at }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Acknowledgement returned by the supply write routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
}

impl Ack {
    fn with_status(status: &str) -> Self {
        Self { status: status.to_string(), order_id: None, shipment_id: None }
    }

    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    pub fn updated() -> Self {
        Self::with_status("updated")
    }

    pub fn deleted() -> Self {
        Self::with_status("deleted")
    }

    pub fn order_created(order_id: &str) -> Self {
        Self { order_id: Some(order_id.to_string()), ..Self::ok() }
    }

    pub fn shipment_created(shipment_id: &str) -> Self {
        Self { shipment_id: Some(shipment_id.to_string()), ..Self::ok() }
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ChainRiskError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shipment_status_defaults_to_in_transit() {
        let shipment: NewShipment = serde_json::from_value(json!({
            "shipment_id": "S1", "order_id": "O1", "origin": "Shenzhen", "destination": "Rotterdam"
        }))
        .unwrap();
        assert_eq!(shipment.status, DEFAULT_SHIPMENT_STATUS);
    }

    #[test]
    fn test_order_fields_are_trimmed_and_blank_eta_dropped() {
        let order = NewOrder {
            order_id: " O-1 ".into(),
            country: "India".into(),
            supplier: "Acme".into(),
            qty: 10,
            eta: Some("  ".into()),
        }
        .validated()
        .unwrap();
        assert_eq!(order.order_id, "O-1");
        assert_eq!(order.eta, None);
    }

    #[test]
    fn test_blank_sku_is_rejected() {
        let err = NewInventoryItem { sku: " ".into(), location: "WH1".into(), qty: 3 }
            .validated()
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: sku is required");
    }

    #[test]
    fn test_ack_omits_absent_ids() {
        assert_eq!(serde_json::to_value(Ack::updated()).unwrap(), json!({"status": "updated"}));
        assert_eq!(
            serde_json::to_value(Ack::order_created("O1")).unwrap(),
            json!({"status": "ok", "order_id": "O1"})
        );
    }
}
