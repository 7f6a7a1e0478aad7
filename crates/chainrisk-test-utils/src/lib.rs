//! Shared test helpers: a real gateway on an ephemeral port, a test
//! config, and generated training data.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use chainrisk_common::training::TrainingSample;
use chainrisk_common::FeatureVector;
use chainrisk_config::{ApiConfig, Config};
use chainrisk_web::news::MockNewsSource;
use chainrisk_web::state::AppState;
use chainrisk_web::store::{HistoryRepository, MemoryHistoryStore};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Gateway config for tests: auth enforced, nothing read from or written to disk.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.auth.protect_api = true;
    config.news.api_key = None;
    config.model.model_path = None;
    config.history.path = None;
    config.collector.enabled = false;
    config
}

/// A unique address so tests sharing a gateway never collide.
pub fn unique_email() -> String {
    format!("user-{}@example.com", uuid::Uuid::new_v4())
}

/// `n` rows of a noiseless linear relationship over varied features.
pub fn training_samples(n: usize) -> Vec<TrainingSample> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            let features = FeatureVector {
                news_negative_pct: (i * 7.0) % 60.0,
                keyword_score: (i * 13.0) % 50.0,
                weather_risk: i % 10.0,
                port_delay_index: (i * 3.0) % 10.0,
                supplier_concentration: (i % 5.0) / 5.0,
                hist_delay: (i * i) % 10.0,
            };
            let risk_score = 5.0
                + 0.3 * features.news_negative_pct
                + 0.5 * features.keyword_score
                + 2.0 * features.weather_risk
                + 1.0 * features.port_delay_index
                + 10.0 * features.supplier_concentration
                + 1.5 * features.hist_delay;
            TrainingSample { features, risk_score }
        })
        .collect()
}

pub fn write_dataset(path: &Path, n: usize) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string(&training_samples(n))?)?;
    Ok(())
}

/// A gateway serving on 127.0.0.1 with mock news. Shut down on drop.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub history: Arc<MemoryHistoryStore>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestGateway {
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: Config) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let history = Arc::new(MemoryHistoryStore::new());
        let state = AppState::with_parts(config, Arc::new(MockNewsSource), history.clone());

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(chainrisk_web::serve(listener, state, async {
            let _ = rx.await;
        }));

        Ok(Self { addr, history, shutdown: Some(tx), handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.base_url())
    }

    /// Record `scores` for `country`, one day apart, oldest first, ending at `end`.
    pub async fn seed_history(&self, country: &str, scores: &[f64], end: DateTime<Utc>) -> anyhow::Result<()> {
        let last = scores.len() as i64 - 1;
        for (i, score) in scores.iter().enumerate() {
            let ts = end - Duration::days(last - i as i64);
            self.history.record(country, *score, ts).await?;
        }
        Ok(())
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}
