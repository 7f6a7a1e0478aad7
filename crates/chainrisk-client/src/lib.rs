//! chainrisk-client: the client data layer for the ChainRisk gateway.
//!
//! One [`RiskClient`] built from the injected [`chainrisk_config::ApiConfig`],
//! one [`Session`] owning the token, and one [`DashboardService`] owning the
//! fetched risk data.

pub mod client;
pub mod error;
pub mod inflight;
pub mod service;
pub mod session;
pub mod token;

pub use client::{parse_response, RiskClient};
pub use error::ClientError;
pub use inflight::ActionSlot;
pub use service::{DashboardService, DashboardState};
pub use session::{Session, SessionEvent, SessionState};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
