//! Risk history storage.
//! Points are kept per country in timestamp order; reads return newest first.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chainrisk_common::HistoryPoint;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append one score for `country` at `ts`.
    async fn record(&self, country: &str, risk_score: f64, ts: DateTime<Utc>) -> Result<()>;

    /// Up to `limit` points for `country`, most recent first.
    async fn history(&self, country: &str, limit: usize) -> Result<Vec<HistoryPoint>>;

    /// Latest score of every country that has history.
    async fn latest_per_country(&self) -> Result<BTreeMap<String, f64>>;
}

static SNAPSHOT_SEQ: AtomicU64 = AtomicU64::new(0);

/// In-memory store with an optional JSON snapshot on disk.
#[derive(Default)]
pub struct MemoryHistoryStore {
    points: RwLock<HashMap<String, Vec<HistoryPoint>>>,
    snapshot: Option<PathBuf>,
    /// Held from serialising a snapshot until its rename lands.
    persist_lock: Mutex<()>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading the snapshot if it exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let points = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading history snapshot {}", path.display()))?;
            let loaded: HashMap<String, Vec<HistoryPoint>> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing history snapshot {}", path.display()))?;
            info!(countries = loaded.len(), path = %path.display(), "loaded history snapshot");
            loaded
        } else {
            HashMap::new()
        };

        Ok(Self { points: RwLock::new(points), snapshot: Some(path), persist_lock: Mutex::new(()) })
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot else { return Ok(()) };
        let _persisting = self.persist_lock.lock().await;

        let body = {
            let points = self.points.read().await;
            let ordered: BTreeMap<&String, &Vec<HistoryPoint>> = points.iter().collect();
            serde_json::to_vec_pretty(&ordered)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let seq = SNAPSHOT_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing history snapshot {}", path.display()));
        }
        debug!(path = %path.display(), "history snapshot written");
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryStore {
    async fn record(&self, country: &str, risk_score: f64, ts: DateTime<Utc>) -> Result<()> {
        {
            let mut points = self.points.write().await;
            let series = points.entry(country.trim().to_string()).or_default();
            series.push(HistoryPoint { ts, risk_score });
            if series.len() > 1 && series[series.len() - 2].ts > ts {
                series.sort_by_key(|p| p.ts);
            }
        }
        self.persist().await
    }

    async fn history(&self, country: &str, limit: usize) -> Result<Vec<HistoryPoint>> {
        let points = self.points.read().await;
        Ok(points
            .get(country.trim())
            .map(|series| series.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn latest_per_country(&self) -> Result<BTreeMap<String, f64>> {
        let points = self.points.read().await;
        Ok(points
            .iter()
            .filter_map(|(country, series)| series.last().map(|p| (country.clone(), p.risk_score)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    #[tokio::test]
    async fn test_history_newest_first_and_limited() {
        let store = MemoryHistoryStore::new();
        let t0 = Utc::now();
        for i in 0..5 {
            store.record("India", i as f64 * 10.0, t0 + Duration::hours(i)).await.unwrap();
        }

        let recent = store.history("India", 3).await.unwrap();
        let scores: Vec<f64> = recent.iter().map(|p| p.risk_score).collect();
        assert_eq!(scores, vec![40.0, 30.0, 20.0]);
        assert!(store.history("Chile", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_points_are_sorted() {
        let store = MemoryHistoryStore::new();
        let t0 = Utc::now();
        store.record("Japan", 1.0, t0).await.unwrap();
        store.record("Japan", 2.0, t0 - Duration::days(1)).await.unwrap();

        let latest = store.latest_per_country().await.unwrap();
        assert_eq!(latest.get("Japan"), Some(&1.0));
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let store = MemoryHistoryStore::open(&path).await.unwrap();
        store.record("Brazil", 55.5, Utc::now()).await.unwrap();
        drop(store);

        let reopened = MemoryHistoryStore::open(&path).await.unwrap();
        let latest = reopened.latest_per_country().await.unwrap();
        assert_eq!(latest.get("Brazil"), Some(&55.5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_records_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = Arc::new(MemoryHistoryStore::open(&path).await.unwrap());
        let now = Utc::now();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.record(&format!("Country{:02}", i), i as f64, now).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        drop(store);

        let reopened = MemoryHistoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.latest_per_country().await.unwrap().len(), 64);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name() != "history.json")
            .collect();
        assert!(leftovers.is_empty(), "{:?}", leftovers);
    }
}
