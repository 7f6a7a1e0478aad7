//! Keyword + tone heuristic used when no trained model is loaded,
//! and to produce the factor list and label for every analysis.

use serde::{Deserialize, Serialize};

use crate::entities::Article;

/// Risk keywords and the score each one adds when present.
pub const RISK_KEYWORDS: &[(&str, f64)] = &[
    ("strike", 15.0),
    ("protest", 12.0),
    ("conflict", 14.0),
    ("shortage", 18.0),
    ("inflation", 10.0),
    ("violence", 20.0),
    ("war", 25.0),
    ("sanction", 12.0),
    ("flood", 14.0),
    ("earthquake", 16.0),
    ("political", 10.0),
    ("blockade", 22.0),
    ("port congestion", 20.0),
    ("delay", 15.0),
    ("disruption", 18.0),
    ("shutdown", 20.0),
];

const NEGATIVE_TERMS: &[&str] = &[
    "attack", "bankrupt", "bankruptcy", "closed", "closure", "collapse", "crash", "crisis",
    "damage", "danger", "deadly", "decline", "delayed", "delays", "disrupted", "disrupts",
    "fail", "failure", "fear", "halt", "halts", "loss", "losses", "recession", "severe",
    "shortages", "slump", "tension", "threat", "unrest", "worst",
];

const POSITIVE_TERMS: &[&str] = &[
    "agreement", "boost", "deal", "ease", "eases", "gain", "gains", "growth", "improve",
    "improves", "recover", "recovery", "reduce", "resolved", "stable", "strong",
];

/// Tone below this threshold counts as a risk factor.
const NEGATIVE_TONE_THRESHOLD: f64 = -0.3;
const MAX_FACTORS: usize = 5;
const MAX_ARTICLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Bands used for heuristic scores: above 70 high, above 40 moderate.
    pub fn from_heuristic(score: f64) -> Self {
        if score > 70.0 {
            RiskLevel::High
        } else if score > 40.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Bands used for model predictions: below 30 low, below 60 moderate.
    pub fn from_model(score: f64) -> Self {
        if score < 30.0 {
            RiskLevel::Low
        } else if score < 60.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low      => "Low risk",
            RiskLevel::Moderate => "Moderate risk",
            RiskLevel::High     => "High risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicScore {
    pub risk_score: f64,
    pub level: RiskLevel,
    pub top_risk_factors: Vec<String>,
    pub top_articles: Vec<Article>,
}

/// Score a batch of articles. Capped at 100 and rounded to two decimals.
pub fn score_articles(articles: &[Article]) -> HeuristicScore {
    let mut total = 0.0;
    let mut factors = Vec::new();

    for article in articles {
        let text = article.text();
        let lower = text.to_lowercase();

        for (word, weight) in RISK_KEYWORDS {
            if lower.contains(word) {
                total += weight;
                factors.push(format!("{} (+{})", word, weight));
            }
        }

        let tone = polarity(&text);
        if tone < NEGATIVE_TONE_THRESHOLD {
            total += tone.abs() * 20.0;
            factors.push(format!("Negative sentiment ({:.2})", tone));
        }
    }

    let risk_score = round2(total.min(100.0));
    factors.truncate(MAX_FACTORS);

    HeuristicScore {
        risk_score,
        level: RiskLevel::from_heuristic(risk_score),
        top_risk_factors: factors,
        top_articles: articles.iter().take(MAX_ARTICLES).cloned().collect(),
    }
}

/// Lexicon tone in [-1, 1]. Zero when no lexicon term occurs.
pub fn polarity(text: &str) -> f64 {
    let mut pos = 0usize;
    let mut neg = 0usize;
    for token in tokens(text) {
        if NEGATIVE_TERMS.contains(&token.as_str()) {
            neg += 1;
        } else if POSITIVE_TERMS.contains(&token.as_str()) {
            pos += 1;
        }
    }
    if pos + neg == 0 {
        return 0.0;
    }
    (pos as f64 - neg as f64) / (pos + neg) as f64
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Clamp to the [0, 100] score range and round to two decimals.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    round2(score.clamp(0.0, 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, description: &str) -> Article {
        Article {
            title: title.to_string(),
            description: Some(description.to_string()),
            source: "Test".to_string(),
            url: None,
            published_at: None,
        }
    }

    #[test]
    fn test_keywords_add_weight_and_factors() {
        let scored = score_articles(&[article("Dock strike halts exports", "")]);
        // strike (+15) plus negative tone from "halts" (-1.0 → +20)
        assert_eq!(scored.risk_score, 35.0);
        assert_eq!(scored.top_risk_factors[0], "strike (+15)");
        assert_eq!(scored.top_risk_factors[1], "Negative sentiment (-1.00)");
        assert_eq!(scored.level, RiskLevel::Low);
    }

    #[test]
    fn test_score_is_capped_at_100() {
        let grim = article(
            "War, blockade and shutdown at port congestion hotspot",
            "violence, strike, shortage and disruption",
        );
        let scored = score_articles(&[grim.clone(), grim]);
        assert_eq!(scored.risk_score, 100.0);
        assert_eq!(scored.level, RiskLevel::High);
        assert_eq!(scored.top_risk_factors.len(), MAX_FACTORS);
    }

    #[test]
    fn test_empty_input_is_low_risk() {
        let scored = score_articles(&[]);
        assert_eq!(scored.risk_score, 0.0);
        assert_eq!(scored.level.label(), "Low risk");
        assert!(scored.top_articles.is_empty());
    }

    #[test]
    fn test_polarity_bounds() {
        assert_eq!(polarity("nothing notable here"), 0.0);
        assert_eq!(polarity("recovery and growth"), 1.0);
        assert_eq!(polarity("crisis deepens, recovery stalls"), 0.0);
        assert_eq!(polarity("Severe crisis"), -1.0);
    }

    #[test]
    fn test_model_and_heuristic_bands() {
        assert_eq!(RiskLevel::from_model(29.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_model(30.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_model(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_heuristic(40.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_heuristic(70.5), RiskLevel::High);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-4.0), 0.0);
        assert_eq!(clamp_score(123.456), 100.0);
        assert_eq!(clamp_score(42.346), 42.35);
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }
}
