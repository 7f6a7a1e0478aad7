//! Periodic risk collector.
//!
//! Scores every configured country on a fixed interval and records the
//! results, so the global summary has data without anyone calling analyze.

use std::sync::Arc;
use std::time::Duration;

use chainrisk_config::CollectorConfig;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::RiskEngine;
use crate::state::AppEvent;

/// Spawn the collector loop. The first cycle runs immediately.
pub fn spawn_collector(
    engine: Arc<RiskEngine>,
    cfg: CollectorConfig,
    event_tx: broadcast::Sender<AppEvent>,
) -> JoinHandle<()> {
    let period = Duration::from_secs(cfg.interval_minutes.max(1) * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let count = run_once(&engine, &cfg.countries).await;
            info!(count, "collector cycle complete");
            let _ = event_tx.send(AppEvent::CollectorStatus {
                message: format!("Scored {} of {} countries", count, cfg.countries.len()),
                count,
            });
        }
    })
}

/// One collection cycle. Returns the number of countries scored.
pub async fn run_once(engine: &RiskEngine, countries: &[String]) -> u64 {
    let mut count = 0;
    for country in countries {
        let country = country.trim();
        if country.is_empty() {
            warn!("skipping blank collector country");
            continue;
        }
        let analysis = engine.analyze(Some(country), None).await;
        info!(country, risk_score = analysis.risk_score, "collected");
        count += 1;
    }
    count
}
