//! Typed HTTP client for the gateway.
//!
//! Every call goes through [`RiskClient::send`]: bearer token attached when
//! the session has one, body normalised by [`parse_response`], and a 401
//! on an authenticated call expires the session.

use std::sync::Arc;

use chainrisk_common::entities::{
    AnalyzeRequest, LoginRequest, MessageResponse, PredictRequest, RegisterRequest, RiskScore,
    TokenResponse, TrainResponse, UserProfile,
};
use chainrisk_common::supply::{
    Ack, InventoryItem, NewInventoryItem, NewOrder, NewShipment, Order, Shipment,
};
use chainrisk_common::{GlobalSummary, HistoryPoint, Prediction, RiskAnalysis};
use chainrisk_config::ApiConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{ClientError, Result};
use crate::session::Session;

/// Longest slice of a non-JSON body kept for diagnosis.
pub const MAX_BODY_PREVIEW: usize = 200;

pub struct RiskClient {
    api: ApiConfig,
    http: reqwest::Client,
    session: Arc<Session>,
}

impl RiskClient {
    pub fn new(api: ApiConfig, session: Arc<Session>) -> Self {
        Self { api, http: reqwest::Client::new(), session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    // ── Auth ──────────────────────────────────────────────────────────────────

    /// Log in and start the session with the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        require("email", email)?;
        require("password", password)?;
        let body = LoginRequest { email: email.trim().to_string(), password: password.to_string() };
        let token: TokenResponse = self.send(self.request(Method::POST, "login").json(&body), false).await?;
        if token.access_token.is_empty() {
            return Err(ClientError::MalformedResponse {
                status: 200,
                body: "login response carried an empty access_token".to_string(),
            });
        }
        self.session.login(&token.access_token, email.trim()).await?;
        Ok(token)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<MessageResponse> {
        require("name", name)?;
        require("email", email)?;
        require("password", password)?;
        let body = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.send(self.request(Method::POST, "api/register").json(&body), false).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.send(self.request(Method::GET, "api/me"), true).await
    }

    // ── Risk ──────────────────────────────────────────────────────────────────

    pub async fn hello(&self) -> Result<MessageResponse> {
        self.send(self.request(Method::GET, "api/hello"), false).await
    }

    #[instrument(skip(self))]
    pub async fn analyze(&self, req: &AnalyzeRequest) -> Result<RiskAnalysis> {
        let (country, text) = req.validated().map_err(|e| ClientError::validation(e.to_string()))?;
        let body = AnalyzeRequest { country, text };
        self.send(self.request(Method::POST, "api/analyze").json(&body), true).await
    }

    pub async fn predict(&self, req: &PredictRequest) -> Result<Prediction> {
        if !req.has_input() {
            return Err(ClientError::validation("provide country, text or features"));
        }
        self.send(self.request(Method::POST, "api/predict").json(req), true).await
    }

    pub async fn train(&self, background: bool) -> Result<TrainResponse> {
        let req = self
            .request(Method::POST, "api/train")
            .query(&[("background", background)]);
        self.send(req, true).await
    }

    pub async fn risk_score(&self, country: &str) -> Result<RiskScore> {
        require("country", country)?;
        let path = format!("api/risk_score/{}", country.trim());
        self.send(self.request(Method::GET, &path), false).await
    }

    pub async fn global_summary(&self) -> Result<GlobalSummary> {
        self.send(self.request(Method::GET, "api/global_summary"), false).await
    }

    /// History for `country`, oldest first regardless of server order.
    pub async fn history(&self, country: &str, days: u32) -> Result<Vec<HistoryPoint>> {
        require("country", country)?;
        if days == 0 {
            return Err(ClientError::validation("days must be at least 1"));
        }
        let path = format!("api/history/{}", country.trim());
        let req = self.request(Method::GET, &path).query(&[("days", days)]);
        let points: Vec<HistoryPoint> = self.send(req, false).await?;
        Ok(chronological(points))
    }

    // ── Supply ────────────────────────────────────────────────────────────────

    pub async fn create_order(&self, order: &NewOrder) -> Result<Ack> {
        let body = order.clone().validated().map_err(|e| ClientError::validation(e.to_string()))?;
        self.send(self.request(Method::POST, "api/orders").json(&body), true).await
    }

    pub async fn order(&self, order_id: &str) -> Result<Order> {
        require("order_id", order_id)?;
        let path = format!("api/orders/{}", order_id.trim());
        self.send(self.request(Method::GET, &path), false).await
    }

    /// Newest first.
    pub async fn orders(&self, limit: usize) -> Result<Vec<Order>> {
        if limit == 0 {
            return Err(ClientError::validation("limit must be at least 1"));
        }
        let req = self.request(Method::GET, "api/orders").query(&[("limit", limit)]);
        self.send(req, false).await
    }

    pub async fn delete_order(&self, order_id: &str) -> Result<Ack> {
        require("order_id", order_id)?;
        let path = format!("api/orders/{}", order_id.trim());
        self.send(self.request(Method::DELETE, &path), true).await
    }

    pub async fn create_shipment(&self, shipment: &NewShipment) -> Result<Ack> {
        let body = shipment.clone().validated().map_err(|e| ClientError::validation(e.to_string()))?;
        self.send(self.request(Method::POST, "api/shipments").json(&body), true).await
    }

    pub async fn shipment(&self, shipment_id: &str) -> Result<Shipment> {
        require("shipment_id", shipment_id)?;
        let path = format!("api/shipments/{}", shipment_id.trim());
        self.send(self.request(Method::GET, &path), false).await
    }

    pub async fn update_shipment_status(&self, shipment_id: &str, status: &str) -> Result<Ack> {
        require("shipment_id", shipment_id)?;
        require("status", status)?;
        let path = format!("api/shipments/{}", shipment_id.trim());
        let req = self.request(Method::PATCH, &path).query(&[("status", status.trim())]);
        self.send(req, true).await
    }

    pub async fn create_inventory(&self, item: &NewInventoryItem) -> Result<Ack> {
        let body = item.clone().validated().map_err(|e| ClientError::validation(e.to_string()))?;
        self.send(self.request(Method::POST, "api/inventory").json(&body), true).await
    }

    pub async fn inventory(&self, sku: &str) -> Result<InventoryItem> {
        require("sku", sku)?;
        let path = format!("api/inventory/{}", sku.trim());
        self.send(self.request(Method::GET, &path), false).await
    }

    pub async fn adjust_inventory(&self, sku: &str, delta: i64) -> Result<Ack> {
        require("sku", sku)?;
        let path = format!("api/inventory/{}", sku.trim());
        let req = self.request(Method::PATCH, &path).query(&[("delta", delta)]);
        self.send(req, true).await
    }

    // ── Plumbing ──────────────────────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.api.endpoint(path))
    }

    /// Send, attaching the session token. `expires_session` marks calls
    /// whose 401 means the token went bad (as opposed to a failed login).
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, expires_session: bool) -> Result<T> {
        let sent_with = self.session.token().await;
        let req = match &sent_with {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        };

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(status, bytes = body.len(), "gateway response");

        if status == 401 {
            if expires_session {
                if let Some(token) = &sent_with {
                    self.session.expire_if(token).await;
                }
            }
            return Err(ClientError::AuthFailure(error_message(status, &body)));
        }
        parse_response(status, &body)
    }
}

/// Normalise a gateway response.
///
/// 2xx JSON decodes into `T`. Non-2xx JSON becomes `ServerFailure` carrying
/// `detail` or `message`. Anything that is not JSON, such as an HTML error
/// page from a proxy, becomes `MalformedResponse` with a truncated body.
pub fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => return Err(malformed(status, body)),
    };

    if !(200..300).contains(&status) {
        return Err(ClientError::ServerFailure {
            status,
            message: json_message(&json).unwrap_or_else(|| format!("Request failed with status {}", status)),
            payload: json,
        });
    }

    serde_json::from_value(json).map_err(|_| malformed(status, body))
}

fn malformed(status: u16, body: &str) -> ClientError {
    ClientError::MalformedResponse { status, body: truncate(body, MAX_BODY_PREVIEW) }
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json_message(&json))
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

/// `detail` first, then `message`. Structured details are rendered as JSON.
fn json_message(json: &Value) -> Option<String> {
    ["detail", "message"].iter().find_map(|key| match &json[*key] {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Sort ascending by timestamp. Stable, so equal timestamps keep server order.
pub fn chronological(mut points: Vec<HistoryPoint>) -> Vec<HistoryPoint> {
    points.sort_by_key(|p| p.ts);
    points
}
