use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{HydroError, Result};
use crate::metrics::mse;
use crate::model::{ElasticNetParams, FittedPipeline, LinearModel, ParamGrid, Pipeline};
use crate::preprocess::{FittedPreprocessor, Schema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Hold out `ceil(test_size * n)` rows for testing.
///
/// With `shuffle` the rows are permuted by a `StdRng` seeded from `seed` and the
/// first `n_test` positions form the test set; without it the tail is held out.
pub fn train_test_split(
    n: usize,
    test_size: f64,
    shuffle: bool,
    seed: u64,
) -> Result<SplitIndices> {
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(HydroError::InsufficientData {
            context: "the train/test split",
            required: 2,
            got: n,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    if shuffle {
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let train = indices.split_off(n_test);
        Ok(SplitIndices { train, test: indices })
    } else {
        let test = indices.split_off(n - n_test);
        Ok(SplitIndices { train: indices, test })
    }
}

/// Contiguous, unshuffled k-fold partitioning.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Folds in order; the first `n % k` folds are one row larger.
    pub fn split(&self, n: usize) -> Result<Vec<SplitIndices>> {
        let k = self.n_splits;
        if k < 2 || n < k {
            return Err(HydroError::InsufficientData {
                context: "k-fold cross-validation",
                required: k.max(2),
                got: n,
            });
        }

        let base = n / k;
        let extra = n % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for fold in 0..k {
            let size = base + usize::from(fold < extra);
            let stop = start + size;
            let test: Vec<usize> = (start..stop).collect();
            let train: Vec<usize> = (0..start).chain(stop..n).collect();
            folds.push(SplitIndices { train, test });
            start = stop;
        }
        Ok(folds)
    }
}

/// Rows of `df` at `indices`, in that order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("idx", indices.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}

pub fn select_values(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub mean_mse: f64,
}

#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Winner refit on every row passed to `GridSearch::fit`.
    pub best: FittedPipeline,
    pub best_params: ElasticNetParams,
    pub best_mse: f64,
    /// Scores in grid order.
    pub candidates: Vec<CandidateScore>,
}

struct EncodedFold {
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    x_val: Array2<f64>,
    y_val: Vec<f64>,
}

pub struct GridSearch {
    grid: ParamGrid,
    base_params: ElasticNetParams,
    folds: KFold,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, base_params: ElasticNetParams, folds: KFold) -> Self {
        Self {
            grid,
            base_params,
            folds,
        }
    }

    pub fn fit(&self, x: &DataFrame, y: &[f64]) -> Result<GridSearchResult> {
        if self.grid.is_empty() {
            let axis = if self.grid.alphas.is_empty() { "alpha" } else { "l1_ratio" };
            return Err(HydroError::EmptyGrid(axis));
        }

        let schema = Schema::infer(x);
        let folds = self.encode_folds(x, y, &schema)?;

        let candidates = self.grid.candidates();
        info!(
            "Grid search: {} candidates x {} folds on {} rows",
            candidates.len(),
            folds.len(),
            y.len()
        );

        let scores: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|&(alpha, l1_ratio)| -> Result<CandidateScore> {
                let params = self.base_params.with_penalty(alpha, l1_ratio);
                let mut total = 0.0;
                for fold in &folds {
                    let model = LinearModel::fit(&fold.x_train, &fold.y_train, &params)?;
                    let preds = model.predict(&fold.x_val)?.to_vec();
                    total += mse(&fold.y_val, &preds);
                }
                let mean_mse = total / folds.len() as f64;
                debug!("alpha={:.4e} l1_ratio={:.2} cv_mse={:.6}", alpha, l1_ratio, mean_mse);
                Ok(CandidateScore {
                    alpha,
                    l1_ratio,
                    mean_mse,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Strict comparison keeps the earliest candidate on ties.
        let mut best = &scores[0];
        for score in &scores[1..] {
            if score.mean_mse < best.mean_mse {
                best = score;
            }
        }

        let best_params = self.base_params.with_penalty(best.alpha, best.l1_ratio);
        info!(
            "Best candidate: alpha={} l1_ratio={} (cv_mse={:.6})",
            best.alpha, best.l1_ratio, best.mean_mse
        );

        let refit = Pipeline::new(best_params).fit_with_schema(x, y, &schema)?;

        Ok(GridSearchResult {
            best: refit,
            best_params,
            best_mse: best.mean_mse,
            candidates: scores,
        })
    }

    /// Fit the preprocessor on each fold's training rows and encode both halves once.
    fn encode_folds(&self, x: &DataFrame, y: &[f64], schema: &Schema) -> Result<Vec<EncodedFold>> {
        let mut encoded = Vec::with_capacity(self.folds.n_splits());
        for (i, split) in self.folds.split(y.len())?.iter().enumerate() {
            let train_df = take_rows(x, &split.train)?;
            let val_df = take_rows(x, &split.test)?;
            let preprocessor = FittedPreprocessor::fit(&train_df, schema)?;

            encoded.push(EncodedFold {
                x_train: preprocessor.transform(&train_df)?,
                y_train: Array1::from(select_values(y, &split.train)),
                x_val: preprocessor.transform(&val_df)?,
                y_val: select_values(y, &split.test),
            });
            debug!(
                "Fold {}: {} train / {} validation rows",
                i,
                split.train.len(),
                split.test.len()
            );
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_unshuffled_split_holds_out_tail() {
        let split = train_test_split(10, 0.25, false, 0).unwrap();
        assert_eq!(split.test, vec![7, 8, 9]);
        assert_eq!(split.train, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_split_is_seeded_partition() {
        let a = train_test_split(50, 0.2, true, 42).unwrap();
        let b = train_test_split(50, 0.2, true, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.test.len(), 10);
        assert_eq!(a.train.len(), 40);

        let all: HashSet<usize> = a.train.iter().chain(&a.test).copied().collect();
        assert_eq!(all.len(), 50);
    }

    #[test]
    fn test_split_needs_rows_on_both_sides() {
        assert!(matches!(
            train_test_split(1, 0.2, false, 0),
            Err(HydroError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_kfold_first_folds_take_remainder() {
        let folds = KFold::new(3).split(8).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2]);
        assert_eq!(folds[1].test, vec![3, 4, 5]);
        assert_eq!(folds[1].train, vec![0, 1, 2, 6, 7]);
        assert!(KFold::new(5).split(4).is_err());
    }

    #[test]
    fn test_take_rows_preserves_requested_order() {
        let df = df! { "flow_m3s" => [10.0, 20.0, 30.0, 40.0] }.unwrap();
        let picked = take_rows(&df, &[3, 0]).unwrap();
        let values: Vec<f64> = picked
            .column("flow_m3s")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(values, vec![40.0, 10.0]);
    }

    #[test]
    fn test_grid_search_prefers_weak_penalty_on_clean_signal() {
        let flow: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = flow.iter().map(|v| 5.0 + 0.5 * v).collect();
        let df = df! { "flow_m3s" => flow }.unwrap();

        let grid = ParamGrid {
            alphas: vec![10.0, 0.001],
            l1_ratios: vec![0.5],
        };
        let search = GridSearch::new(grid, ElasticNetParams::default(), KFold::new(4));
        let result = search.fit(&df, &y).unwrap();

        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.best_params.alpha, 0.001);
        assert!(result.best_mse < result.candidates[0].mean_mse);
        assert_eq!(result.best.n_features_in(), 1);
    }
}
