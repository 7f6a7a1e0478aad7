//! Aggregation of the latest score per country into a [`GlobalSummary`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::entities::{CountryRisk, GlobalSummary};
use crate::scoring::round2;

/// Number of countries the dashboard bar chart shows.
pub const DASHBOARD_TOP_N: usize = 8;

impl GlobalSummary {
    pub fn from_latest(country_risk_map: BTreeMap<String, f64>, timestamp: DateTime<Utc>) -> Self {
        let risk_list = ranked(&country_risk_map);
        let average_risk = if risk_list.is_empty() {
            None
        } else {
            Some(round2(risk_list.iter().map(|c| c.risk_score).sum::<f64>() / risk_list.len() as f64))
        };

        Self {
            timestamp,
            highest_risk: risk_list.first().cloned(),
            lowest_risk: risk_list.last().cloned(),
            average_risk,
            risk_list,
            country_risk_map,
        }
    }
}

/// Countries sorted by score, highest first, sliced to `n`.
pub fn top_countries(country_risk_map: &BTreeMap<String, f64>, n: usize) -> Vec<CountryRisk> {
    let mut list = ranked(country_risk_map);
    list.truncate(n);
    list
}

/// Descending by score; ties keep alphabetical order.
fn ranked(country_risk_map: &BTreeMap<String, f64>) -> Vec<CountryRisk> {
    let mut list: Vec<CountryRisk> = country_risk_map
        .iter()
        .filter(|(_, score)| score.is_finite())
        .map(|(country, &risk_score)| CountryRisk { country: country.clone(), risk_score })
        .collect();
    list.sort_by(|a, b| b.risk_score.partial_cmp(&a.risk_score).unwrap_or(Ordering::Equal));
    list
}
