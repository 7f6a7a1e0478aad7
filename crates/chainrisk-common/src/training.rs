//! Fits a [`LinearRiskModel`] from labelled feature rows.
//!
//! The dataset is a JSON array of `{ "features": {...}, "risk_score": f64 }`.
//! Rows are shuffled with a fixed seed, 15% are held out, and the remaining
//! rows are fitted with ridge-regularised least squares.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{FeatureVector, LinearRiskModel};

pub const DEFAULT_SEED: u64 = 42;
/// Held-out share of the dataset, in percent.
const TEST_PERCENT: usize = 15;
const RIDGE_LAMBDA: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Dataset not found at {0}")]
    DatasetNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Need at least 2 samples to train, got {0}")]
    InsufficientData(usize),

    #[error("Feature matrix is singular")]
    Singular,

    #[error("Failed to save model: {0}")]
    Save(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub mae: f64,
    pub r2: f64,
    pub n_train: usize,
}

pub fn load_dataset(path: &Path) -> Result<Vec<TrainingSample>, TrainError> {
    if !path.exists() {
        return Err(TrainError::DatasetNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    let samples: Vec<TrainingSample> = serde_json::from_str(&raw)?;
    Ok(samples.into_iter().filter(|s| s.risk_score.is_finite()).collect())
}

pub fn train(
    samples: &[TrainingSample],
    seed: u64,
) -> Result<(LinearRiskModel, TrainingMetrics), TrainError> {
    let n = samples.len();
    if n < 2 {
        return Err(TrainError::InsufficientData(n));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let n_test = ((n * TEST_PERCENT).div_ceil(100)).clamp(1, n - 1);
    let (test_idx, train_idx) = order.split_at(n_test);
    let train_rows: Vec<&TrainingSample> = train_idx.iter().map(|&i| &samples[i]).collect();
    let test_rows: Vec<&TrainingSample> = test_idx.iter().map(|&i| &samples[i]).collect();

    let model = fit(&train_rows)?;

    let preds: Vec<f64> = test_rows.iter().map(|s| model.raw(&s.features)).collect();
    let actual: Vec<f64> = test_rows.iter().map(|s| s.risk_score).collect();

    let metrics = TrainingMetrics {
        mae: mean_absolute_error(&actual, &preds),
        r2: r2_score(&actual, &preds),
        n_train: train_rows.len(),
    };
    tracing::info!(mae = metrics.mae, r2 = metrics.r2, n_train = metrics.n_train, "training finished");
    Ok((model, metrics))
}

/// Solve (XᵀX + λI)β = Xᵀy with a leading intercept column.
fn fit(rows: &[&TrainingSample]) -> Result<LinearRiskModel, TrainError> {
    const DIM: usize = 7;
    let mut a = [[0.0f64; DIM]; DIM];
    let mut b = [0.0f64; DIM];

    for row in rows {
        let f = row.features.as_array();
        let x: [f64; DIM] = [1.0, f[0], f[1], f[2], f[3], f[4], f[5]];
        for i in 0..DIM {
            b[i] += x[i] * row.risk_score;
            for j in 0..DIM {
                a[i][j] += x[i] * x[j];
            }
        }
    }
    // intercept is not penalised
    for (i, row) in a.iter_mut().enumerate().skip(1) {
        row[i] += RIDGE_LAMBDA;
    }

    let beta = solve(a, b)?;
    let mut weights = [0.0; 6];
    weights.copy_from_slice(&beta[1..]);
    Ok(LinearRiskModel { intercept: beta[0], weights })
}

/// Gaussian elimination with partial pivoting.
fn solve<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Result<[f64; N], TrainError> {
    for col in 0..N {
        let pivot = (col..N)
            .max_by(|&i, &j| a[i][col].abs().partial_cmp(&a[j][col].abs()).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(TrainError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let tail: f64 = ((row + 1)..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / actual.len() as f64
}

fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Load the dataset at `dataset`, train, and save to `model_path` if given.
pub fn train_from_file(
    dataset: &Path,
    model_path: Option<&Path>,
) -> Result<(LinearRiskModel, TrainingMetrics), TrainError> {
    let samples = load_dataset(dataset)?;
    let (model, metrics) = train(&samples, DEFAULT_SEED)?;
    if let Some(path) = model_path {
        model.save(path).map_err(|e| TrainError::Save(e.to_string()))?;
    }
    Ok((model, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const TRUE_WEIGHTS: [f64; 6] = [0.2, 0.6, 1.5, 2.5, 10.0, 1.0];
    const TRUE_INTERCEPT: f64 = 4.0;

    fn synthetic(n: usize) -> Vec<TrainingSample> {
        let mut rng = StdRng::seed_from_u64(7);
        (0..n)
            .map(|_| {
                let features = FeatureVector {
                    news_negative_pct: rng.gen_range(0.0..60.0),
                    keyword_score: rng.gen_range(0.0..50.0),
                    weather_risk: rng.gen_range(0.0..10.0),
                    port_delay_index: rng.gen_range(0.0..10.0),
                    supplier_concentration: rng.gen_range(0.0..1.0),
                    hist_delay: rng.gen_range(0.0..10.0),
                };
                let risk_score = TRUE_INTERCEPT
                    + TRUE_WEIGHTS.iter().zip(features.as_array()).map(|(w, x)| w * x).sum::<f64>();
                TrainingSample { features, risk_score }
            })
            .collect()
    }

    #[test]
    fn test_recovers_linear_relationship() {
        let (model, metrics) = train(&synthetic(60), DEFAULT_SEED).unwrap();
        assert_eq!(metrics.n_train, 51);
        assert!(metrics.mae < 1e-3, "mae was {}", metrics.mae);
        assert!(metrics.r2 > 0.999, "r2 was {}", metrics.r2);
        for (fitted, truth) in model.weights.iter().zip(TRUE_WEIGHTS) {
            assert!((fitted - truth).abs() < 1e-2, "{} vs {}", fitted, truth);
        }
    }

    #[test]
    fn test_rejects_tiny_dataset() {
        let one = synthetic(1);
        assert!(matches!(train(&one, DEFAULT_SEED), Err(TrainError::InsufficientData(1))));
    }

    #[test]
    fn test_missing_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = train_from_file(&dir.path().join("absent.json"), None).unwrap_err();
        assert!(matches!(err, TrainError::DatasetNotFound(_)));
    }

    #[test]
    fn test_train_from_file_saves_model() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        let model_path = dir.path().join("model.json");
        std::fs::write(&dataset, serde_json::to_string(&synthetic(30)).unwrap()).unwrap();

        let (model, _) = train_from_file(&dataset, Some(&model_path)).unwrap();
        let loaded = LinearRiskModel::load(&model_path).unwrap();
        assert!((loaded.intercept - model.intercept).abs() < 1e-9);
        for (a, b) in loaded.weights.iter().zip(model.weights) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
