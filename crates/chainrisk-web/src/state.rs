//! Shared application state for the gateway.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chainrisk_common::LinearRiskModel;
use chainrisk_config::Config;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::auth::{TokenSigner, UserStore};
use crate::engine::RiskEngine;
use crate::news::{self, NewsSource};
use crate::store::{HistoryRepository, MemoryHistoryStore};
use crate::supply::{MemorySupplyStore, SupplyRepository};

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A score was written to history
    RiskRecorded { country: String, risk_score: f64 },
    /// A training job was accepted
    TrainingStarted,
    /// A training job finished
    TrainingComplete { mae: f64, r2: f64, n_train: usize },
    /// A training job failed
    TrainingFailed { message: String },
    /// Collector cycle status update
    CollectorStatus { message: String, count: u64 },
}

impl AppEvent {
    /// SSE event name; matches the `type` tag of the JSON payload.
    pub fn kind(&self) -> &'static str {
        match self {
            AppEvent::RiskRecorded { .. }      => "risk_recorded",
            AppEvent::TrainingStarted          => "training_started",
            AppEvent::TrainingComplete { .. }  => "training_complete",
            AppEvent::TrainingFailed { .. }    => "training_failed",
            AppEvent::CollectorStatus { .. }   => "collector_status",
        }
    }
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<RiskEngine>,
    pub supply: Arc<dyn SupplyRepository>,
    pub users: UserStore,
    pub tokens: TokenSigner,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
    /// Serialises training runs
    pub training: Mutex<()>,
}

impl AppState {
    /// Build state from config: news source, history store and any saved model.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let news: Arc<dyn NewsSource> = Arc::from(news::from_config(&config.news)?);
        let history: Arc<dyn HistoryRepository> = match &config.history.path {
            Some(path) => Arc::new(MemoryHistoryStore::open(path).await?),
            None => Arc::new(MemoryHistoryStore::new()),
        };
        let state = Self::with_parts(config, news, history);

        if let Some(path) = state.config.model.model_path.as_deref() {
            if Path::new(path).exists() {
                let model = LinearRiskModel::load(Path::new(path))
                    .with_context(|| format!("loading model from {}", path))?;
                state.engine.install_model(model).await;
                info!(path, "trained model loaded");
            } else {
                warn!("no trained model found, using heuristic only");
            }
        }
        Ok(state)
    }

    /// Assemble state from explicit parts.
    pub fn with_parts(
        config: Config,
        news: Arc<dyn NewsSource>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let engine = Arc::new(RiskEngine::new(
            news,
            history,
            config.news.page_size,
            event_tx.clone(),
        ));
        let tokens = TokenSigner::new(&config.auth.jwt_secret, config.auth.token_ttl_minutes);

        Self {
            config: Arc::new(config),
            engine,
            supply: Arc::new(MemorySupplyStore::new()),
            users: UserStore::new(),
            tokens,
            event_tx,
            training: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
