//! chainrisk-common: shared data contract, errors, and scoring used across all ChainRisk crates.

pub mod error;
pub mod entities;
pub mod scoring;
pub mod model;
pub mod training;
pub mod summary;
pub mod supply;

// Re-export commonly used types
pub use entities::{Article, CountryRisk, GlobalSummary, HistoryPoint, RiskAnalysis};
pub use model::{FeatureVector, LinearRiskModel, Prediction};
pub use scoring::RiskLevel;
