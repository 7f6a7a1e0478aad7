//! Linear risk model over six supply-chain features.

use serde::{Deserialize, Serialize};

use crate::scoring::{clamp_score, polarity, RiskLevel};

/// Feature names in model order.
pub const FEATURE_NAMES: [&str; 6] = [
    "news_negative_pct",
    "keyword_score",
    "weather_risk",
    "port_delay_index",
    "supplier_concentration",
    "hist_delay",
];

/// Keywords counted by the text feature extractor, 10 points each.
const FEATURE_KEYWORDS: &[&str] = &[
    "strike", "delay", "congestion", "shortage", "conflict", "sanction",
    "flood", "earthquake", "shutdown", "protest", "blockade",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureVector {
    pub news_negative_pct: f64,
    pub keyword_score: f64,
    pub weather_risk: f64,
    pub port_delay_index: f64,
    pub supplier_concentration: f64,
    pub hist_delay: f64,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.news_negative_pct,
            self.keyword_score,
            self.weather_risk,
            self.port_delay_index,
            self.supplier_concentration,
            self.hist_delay,
        ]
    }

    /// Derive features from free text. Non-text features take their
    /// neutral defaults.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let hits = FEATURE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
        Self {
            news_negative_pct: (-polarity(text) * 100.0).max(0.0),
            keyword_score: hits as f64 * 10.0,
            weather_risk: 0.0,
            port_delay_index: 5.0,
            supplier_concentration: 0.3,
            hist_delay: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk_score: f64,
    pub status: String,
}

/// `score = intercept + Σ wᵢ·xᵢ`, clamped to [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRiskModel {
    pub intercept: f64,
    pub weights: [f64; 6],
}

impl Default for LinearRiskModel {
    fn default() -> Self {
        Self {
            intercept: 0.0,
            weights: [0.3, 0.5, 2.0, 2.0, 20.0, 1.5],
        }
    }
}

impl LinearRiskModel {
    pub fn raw(&self, features: &FeatureVector) -> f64 {
        self.intercept
            + self.weights.iter()
                .zip(features.as_array())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        let risk_score = clamp_score(self.raw(features));
        Prediction {
            risk_score,
            status: RiskLevel::from_model(risk_score).label().to_string(),
        }
    }

    pub fn predict_text(&self, text: &str) -> Prediction {
        self.predict(&FeatureVector::from_text(text))
    }

    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
