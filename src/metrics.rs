use serde::{Deserialize, Serialize};

/// Mean squared error. Zero for empty input.
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    sum / y_true.len() as f64
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mse(y_true, y_pred).sqrt()
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: a perfect fit scores 1, anything else 0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestParams {
    pub alpha: f64,
    pub l1_ratio: f64,
}

/// Written to `metrics.json` after every training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub rmse: f64,
    pub r2: f64,
    pub best_params: BestParams,
    pub n_features_in: usize,
    pub best_cv_mse: f64,
    pub n_train: usize,
    pub n_test: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub rmse: f64,
    pub r2: f64,
    pub n_rows: usize,
}

impl EvaluationMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Self {
        Self {
            rmse: rmse(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
            n_rows: y_true.len(),
        }
    }
}
