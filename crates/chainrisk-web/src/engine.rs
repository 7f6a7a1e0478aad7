//! Risk engine: turns news and features into scores and records them.
//! Shared by the HTTP handlers and the background collector.

use std::path::Path;
use std::sync::Arc;

use chainrisk_common::entities::{PredictRequest, RiskScore, UNKNOWN_COUNTRY};
use chainrisk_common::scoring::{score_articles, HeuristicScore};
use chainrisk_common::training::{self, TrainError, TrainingMetrics};
use chainrisk_common::{Article, LinearRiskModel, Prediction, RiskAnalysis};
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument, warn};

use crate::news::NewsSource;
use crate::state::AppEvent;
use crate::store::HistoryRepository;

/// Page size of the quick `/api/risk_score` lookup.
const QUICK_PAGE_SIZE: usize = 5;

/// Status reported when the trained model produced the score.
pub const MODEL_STATUS: &str = "AI Model";

pub struct RiskEngine {
    news: Arc<dyn NewsSource>,
    history: Arc<dyn HistoryRepository>,
    /// Trained model; `None` until a training run or a saved model is loaded
    trained: RwLock<Option<LinearRiskModel>>,
    page_size: usize,
    event_tx: broadcast::Sender<AppEvent>,
}

impl RiskEngine {
    pub fn new(
        news: Arc<dyn NewsSource>,
        history: Arc<dyn HistoryRepository>,
        page_size: usize,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self { news, history, trained: RwLock::new(None), page_size, event_tx }
    }

    pub fn history(&self) -> &Arc<dyn HistoryRepository> {
        &self.history
    }

    pub async fn install_model(&self, model: LinearRiskModel) {
        *self.trained.write().await = Some(model);
    }

    pub async fn has_trained_model(&self) -> bool {
        self.trained.read().await.is_some()
    }

    /// Full analysis. `country` pulls news; `text` is scored as one extra article.
    /// Scores with a country are recorded in history.
    #[instrument(skip(self, text))]
    pub async fn analyze(&self, country: Option<&str>, text: Option<&str>) -> RiskAnalysis {
        let mut articles = match country {
            Some(c) => self.fetch_news(c, self.page_size).await,
            None => Vec::new(),
        };
        if let Some(text) = text {
            articles.push(Article {
                title: text.to_string(),
                description: None,
                source: "user".to_string(),
                url: None,
                published_at: None,
            });
        }

        let heuristic = score_articles(&articles);
        let label = heuristic.level.label().to_string();

        let trained = self.trained.read().await.clone();
        let (risk_score, status, explanation) = match trained {
            Some(model) => {
                let combined: Vec<String> = articles.iter().map(Article::text).collect();
                let pred = model.predict_text(&combined.join("\n"));
                let explanation = format!(
                    "Model estimate over {} articles; keyword heuristic rates it {} ({}).",
                    articles.len(),
                    label.to_lowercase(),
                    heuristic.risk_score,
                );
                (pred.risk_score, MODEL_STATUS.to_string(), explanation)
            }
            None => (heuristic.risk_score, label.clone(), heuristic_explanation(&heuristic, articles.len())),
        };

        let country = country.unwrap_or(UNKNOWN_COUNTRY).to_string();
        if country != UNKNOWN_COUNTRY {
            self.record(&country, risk_score).await;
        }

        RiskAnalysis {
            country,
            risk_score,
            status,
            risk_label: label,
            top_risk_factors: heuristic.top_risk_factors,
            top_articles: heuristic.top_articles,
            explanation,
        }
    }

    /// Heuristic score over a handful of articles. Not recorded.
    pub async fn quick_score(&self, country: &str) -> RiskScore {
        let articles = self.fetch_news(country, QUICK_PAGE_SIZE).await;
        let heuristic = score_articles(&articles);
        RiskScore {
            country: country.to_string(),
            risk_score: heuristic.risk_score,
            status: heuristic.level.label().to_string(),
        }
    }

    /// Model prediction from explicit features or from text. Recorded under
    /// the request's country, or `UNKNOWN`.
    pub async fn predict(&self, req: &PredictRequest) -> Prediction {
        let model = self.trained.read().await.clone().unwrap_or_default();
        let prediction = match &req.features {
            Some(features) => model.predict(features),
            None => model.predict_text(&req.combined_text()),
        };

        let country = req.country.as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_COUNTRY);
        self.record(country, prediction.risk_score).await;
        prediction
    }

    /// Train from the dataset on a blocking thread, save, and install the model.
    pub async fn train(
        &self,
        dataset: &Path,
        model_path: Option<&Path>,
    ) -> Result<TrainingMetrics, TrainError> {
        let dataset = dataset.to_path_buf();
        let model_path = model_path.map(Path::to_path_buf);
        let (model, metrics) = tokio::task::spawn_blocking(move || {
            training::train_from_file(&dataset, model_path.as_deref())
        })
        .await
        .map_err(|e| TrainError::Save(format!("training task failed: {}", e)))??;

        self.install_model(model).await;
        Ok(metrics)
    }

    async fn fetch_news(&self, country: &str, page_size: usize) -> Vec<Article> {
        match self.news.fetch(country, page_size).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(source = self.news.name(), error = %e, "news fetch failed");
                Vec::new()
            }
        }
    }

    /// Store failures are logged; the score is still returned to the caller.
    pub async fn record(&self, country: &str, risk_score: f64) {
        match self.history.record(country, risk_score, Utc::now()).await {
            Ok(()) => {
                debug!(country, risk_score, "risk recorded");
                let _ = self.event_tx.send(AppEvent::RiskRecorded {
                    country: country.to_string(),
                    risk_score,
                });
            }
            Err(e) => warn!(country, error = %e, "failed to store risk"),
        }
    }
}

fn heuristic_explanation(score: &HeuristicScore, article_count: usize) -> String {
    if score.top_risk_factors.is_empty() {
        format!("Heuristic-based explanation: no risk signals in {} articles.", article_count)
    } else {
        format!(
            "Heuristic-based explanation: {} across {} articles.",
            score.top_risk_factors.join(", "),
            article_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::MockNewsSource;
    use crate::store::MemoryHistoryStore;
    use chainrisk_common::FeatureVector;

    fn engine() -> RiskEngine {
        let (tx, _) = broadcast::channel(16);
        RiskEngine::new(Arc::new(MockNewsSource), Arc::new(MemoryHistoryStore::new()), 12, tx)
    }

    #[tokio::test]
    async fn test_analyze_country_records_history() {
        let engine = engine();
        let analysis = engine.analyze(Some("India"), None).await;

        assert_eq!(analysis.country, "India");
        assert!((0.0..=100.0).contains(&analysis.risk_score));
        assert_eq!(analysis.status, analysis.risk_label);
        assert!(analysis.top_articles.len() <= 5);
        assert!(analysis.top_risk_factors.iter().any(|f| f.starts_with("strike")));

        let history = engine.history().history("India", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].risk_score, analysis.risk_score);
    }

    #[tokio::test]
    async fn test_analyze_text_only_is_not_recorded() {
        let engine = engine();
        let analysis = engine.analyze(None, Some("flood closes the port")).await;
        assert_eq!(analysis.country, UNKNOWN_COUNTRY);
        assert!(analysis.risk_score > 0.0);
        assert!(engine.history().latest_per_country().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trained_model_marks_status() {
        let engine = engine();
        engine.install_model(LinearRiskModel::default()).await;
        let analysis = engine.analyze(Some("Japan"), None).await;
        assert_eq!(analysis.status, MODEL_STATUS);
        assert_ne!(analysis.risk_label, MODEL_STATUS);
    }

    #[tokio::test]
    async fn test_predict_with_features_records_unknown() {
        let engine = engine();
        let req = PredictRequest {
            features: Some(FeatureVector { keyword_score: 40.0, ..Default::default() }),
            ..Default::default()
        };
        let pred = engine.predict(&req).await;
        assert_eq!(pred.risk_score, 20.0);
        assert_eq!(pred.status, "Low risk");

        let latest = engine.history().latest_per_country().await.unwrap();
        assert_eq!(latest.get(UNKNOWN_COUNTRY), Some(&20.0));
    }

    #[tokio::test]
    async fn test_quick_score_uses_heuristic() {
        let engine = engine();
        let score = engine.quick_score("Chile").await;
        assert_eq!(score.country, "Chile");
        assert!(engine.history().latest_per_country().await.unwrap().is_empty());
    }
}
