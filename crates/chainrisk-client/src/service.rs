//! The one owner of fetched risk data. Views read snapshots from here.
//!
//! Each control has its own [`ActionSlot`]; a submit while that control
//! is loading returns `None` without touching the network. Results are
//! stored as they arrive: the last completed fetch wins.

use std::collections::BTreeMap;

use chainrisk_common::entities::{AnalyzeRequest, CountryRisk, PredictRequest, TrainResponse};
use chainrisk_common::summary::{top_countries, DASHBOARD_TOP_N};
use chainrisk_common::{GlobalSummary, HistoryPoint, Prediction, RiskAnalysis};
use tokio::sync::RwLock;

use crate::client::RiskClient;
use crate::error::Result;
use crate::inflight::ActionSlot;

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub summary: Option<GlobalSummary>,
    /// Highest-risk countries for the bar chart, descending.
    pub top: Vec<CountryRisk>,
    /// Ascending by timestamp.
    pub history: BTreeMap<String, Vec<HistoryPoint>>,
    pub last_analysis: Option<RiskAnalysis>,
    pub last_prediction: Option<Prediction>,
    pub last_training: Option<TrainResponse>,
    /// Inline text of the most recent failure.
    pub last_error: Option<String>,
}

#[derive(Default)]
struct Slots {
    summary: ActionSlot,
    history: ActionSlot,
    analyze: ActionSlot,
    predict: ActionSlot,
    train: ActionSlot,
}

pub struct DashboardService {
    client: RiskClient,
    state: RwLock<DashboardState>,
    slots: Slots,
}

impl DashboardService {
    pub fn new(client: RiskClient) -> Self {
        Self { client, state: RwLock::new(DashboardState::default()), slots: Slots::default() }
    }

    pub fn client(&self) -> &RiskClient {
        &self.client
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        let s = &self.slots;
        [&s.summary, &s.history, &s.analyze, &s.predict, &s.train]
            .iter()
            .any(|slot| slot.is_loading())
    }

    pub async fn refresh_summary(&self) -> Option<Result<GlobalSummary>> {
        let result = self.slots.summary.run(self.client.global_summary()).await?;
        Some(
            self.store(result, |state, summary| {
                state.top = top_countries(&summary.country_risk_map, DASHBOARD_TOP_N);
                state.summary = Some(summary.clone());
            })
            .await,
        )
    }

    pub async fn load_history(&self, country: &str, days: u32) -> Option<Result<Vec<HistoryPoint>>> {
        let result = self.slots.history.run(self.client.history(country, days)).await?;
        let key = country.trim().to_string();
        Some(
            self.store(result, move |state, points| {
                state.history.insert(key, points.clone());
            })
            .await,
        )
    }

    pub async fn analyze(&self, req: &AnalyzeRequest) -> Option<Result<RiskAnalysis>> {
        let result = self.slots.analyze.run(self.client.analyze(req)).await?;
        Some(
            self.store(result, |state, analysis| {
                state.last_analysis = Some(analysis.clone());
            })
            .await,
        )
    }

    pub async fn predict(&self, req: &PredictRequest) -> Option<Result<Prediction>> {
        let result = self.slots.predict.run(self.client.predict(req)).await?;
        Some(
            self.store(result, |state, prediction| {
                state.last_prediction = Some(prediction.clone());
            })
            .await,
        )
    }

    pub async fn train(&self, background: bool) -> Option<Result<TrainResponse>> {
        let result = self.slots.train.run(self.client.train(background)).await?;
        Some(
            self.store(result, |state, resp| {
                state.last_training = Some(resp.clone());
            })
            .await,
        )
    }

    /// Summary plus history for one country: the parameterised dashboard view.
    pub async fn load_dashboard(&self, country: Option<&str>, days: u32) -> Result<DashboardState> {
        if let Some(result) = self.refresh_summary().await {
            result?;
        }
        if let Some(country) = country {
            if let Some(result) = self.load_history(country, days).await {
                result?;
            }
        }
        Ok(self.snapshot().await)
    }

    async fn store<T, F>(&self, result: Result<T>, apply: F) -> Result<T>
    where
        F: FnOnce(&mut DashboardState, &T),
    {
        let mut state = self.state.write().await;
        match &result {
            Ok(value) => {
                apply(&mut *state, value);
                state.last_error = None;
            }
            Err(e) => state.last_error = Some(e.message()),
        }
        result
    }
}
