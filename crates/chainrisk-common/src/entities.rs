//! Wire types shared by the gateway and the client.
//! Field names match the JSON the dashboard pages read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{ChainRiskError, Result};
use crate::model::FeatureVector;
use crate::training::TrainingMetrics;

/// Country name used when a score has no country attached.
pub const UNKNOWN_COUNTRY: &str = "UNKNOWN";

// ---------------------------------------------------------------------------
// Risk analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl Article {
    /// Text the scorers look at: title plus description.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub country: String,
    pub risk_score: f64,
    pub status: String,
    pub risk_label: String,
    pub top_risk_factors: Vec<String>,
    pub top_articles: Vec<Article>,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl AnalyzeRequest {
    pub fn for_country(country: impl Into<String>) -> Self {
        Self { country: Some(country.into()), text: None }
    }

    pub fn for_text(text: impl Into<String>) -> Self {
        Self { country: None, text: Some(text.into()) }
    }

    /// Trimmed country and text; fails if both are blank.
    pub fn validated(&self) -> Result<(Option<String>, Option<String>)> {
        let country = non_blank(self.country.as_deref());
        let text = non_blank(self.text.as_deref());
        if country.is_none() && text.is_none() {
            return Err(ChainRiskError::Validation("either country or text is required".into()));
        }
        Ok((country, text))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub country: String,
    pub risk_score: f64,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Prediction / training
// ---------------------------------------------------------------------------

/// Body of `POST /api/predict`.
/// `features` is an object of named fields; positional arrays are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "feature_object")]
    pub features: Option<FeatureVector>,
}

/// Accepts only the object form of `features`.
fn feature_object<'de, D>(deserializer: D) -> std::result::Result<Option<FeatureVector>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
    raw.map(|fields| serde_json::from_value(serde_json::Value::Object(fields)).map_err(de::Error::custom))
        .transpose()
}

impl PredictRequest {
    pub fn has_input(&self) -> bool {
        self.features.is_some()
            || non_blank(self.country.as_deref()).is_some()
            || non_blank(self.text.as_deref()).is_some()
    }

    /// Text handed to the feature extractor: text followed by the country.
    pub fn combined_text(&self) -> String {
        let mut out = self.text.clone().unwrap_or_default();
        if let Some(country) = non_blank(self.country.as_deref()) {
            out.push(' ');
            out.push_str(&country);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingMetrics>,
}

impl TrainResponse {
    pub const STARTED_BACKGROUND: &'static str = "training_started_background";
    pub const TRAINED: &'static str = "trained";

    pub fn started_background() -> Self {
        Self { status: Self::STARTED_BACKGROUND.to_string(), metrics: None }
    }

    pub fn trained(metrics: TrainingMetrics) -> Self {
        Self { status: Self::TRAINED.to_string(), metrics: Some(metrics) }
    }
}

// ---------------------------------------------------------------------------
// History / summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub ts: DateTime<Utc>,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRisk {
    pub country: String,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSummary {
    pub timestamp: DateTime<Utc>,
    pub country_risk_map: BTreeMap<String, f64>,
    pub highest_risk: Option<CountryRisk>,
    pub lowest_risk: Option<CountryRisk>,
    pub average_risk: Option<f64>,
    pub risk_list: Vec<CountryRisk>,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
