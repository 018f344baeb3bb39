use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

use crate::config::ElasticNetConfig;
use crate::errors::{HydroError, Result};
use crate::preprocess::{FittedPreprocessor, Schema};

/// Bumped whenever the serialized layout of `FittedPipeline` changes.
pub const ARTIFACT_VERSION: u32 = 1;

pub const DEFAULT_L1_RATIOS: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    /// Overall regularization strength.
    pub alpha: f64,
    /// Share of the penalty that is L1 (1.0 = lasso, 0.0 = ridge).
    pub l1_ratio: f64,
    pub max_iter: u32,
    pub tol: f64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
            max_iter: 2000,
            tol: 1e-4,
        }
    }
}

impl ElasticNetParams {
    pub fn from_config(cfg: &ElasticNetConfig) -> Self {
        Self {
            max_iter: cfg.max_iter,
            tol: cfg.tol,
            ..Self::default()
        }
    }

    pub fn with_penalty(self, alpha: f64, l1_ratio: f64) -> Self {
        Self { alpha, l1_ratio, ..self }
    }
}

/// `n` values evenly spaced on a log10 scale from `10^start` to `10^end` inclusive.
pub fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(start)],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| 10f64.powf(start + step * i as f64)).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub alphas: Vec<f64>,
    pub l1_ratios: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            alphas: logspace(-3.0, 1.0, 9),
            l1_ratios: DEFAULT_L1_RATIOS.to_vec(),
        }
    }
}

impl ParamGrid {
    /// Default grid with any axis the config provides replaced.
    pub fn from_config(cfg: &ElasticNetConfig) -> Result<Self> {
        let default = Self::default();
        let grid = Self {
            alphas: cfg.alpha.clone().unwrap_or(default.alphas),
            l1_ratios: cfg.l1_ratio.clone().unwrap_or(default.l1_ratios),
        };
        if grid.alphas.is_empty() {
            return Err(HydroError::EmptyGrid("alpha"));
        }
        if grid.l1_ratios.is_empty() {
            return Err(HydroError::EmptyGrid("l1_ratio"));
        }
        Ok(grid)
    }

    /// Every (alpha, l1_ratio) combination, alpha varying slowest.
    pub fn candidates(&self) -> Vec<(f64, f64)> {
        self.alphas
            .iter()
            .flat_map(|&a| self.l1_ratios.iter().map(move |&r| (a, r)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alphas.len() * self.l1_ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Coefficients and intercept copied out of the fitted regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &ElasticNetParams) -> Result<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(HydroError::InsufficientData {
                context: "fitting the elastic net",
                required: 1,
                got: x.nrows().min(x.ncols()),
            });
        }

        let dataset = Dataset::new(x.clone(), y.clone());
        let fitted = ElasticNet::<f64>::params()
            .penalty(params.alpha)
            .l1_ratio(params.l1_ratio)
            .max_iterations(params.max_iter)
            .tolerance(params.tol)
            .fit(&dataset)
            .map_err(|e| HydroError::Model(e.to_string()))?;

        Ok(Self {
            coefficients: fitted.hyperplane().to_vec(),
            intercept: fitted.intercept(),
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(HydroError::SchemaMismatch(format!(
                "model expects {} encoded features, got {}",
                self.coefficients.len(),
                x.ncols()
            )));
        }
        let weights = Array1::from(self.coefficients.clone());
        Ok(x.dot(&weights) + self.intercept)
    }
}

/// Unfitted preprocessing + regression pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    params: ElasticNetParams,
}

impl Pipeline {
    pub fn new(params: ElasticNetParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ElasticNetParams {
        &self.params
    }

    /// Resolve the schema from `x`, fit the preprocessor, then the regressor.
    pub fn fit(&self, x: &DataFrame, y: &[f64]) -> Result<FittedPipeline> {
        self.fit_with_schema(x, y, &Schema::infer(x))
    }

    pub fn fit_with_schema(
        &self,
        x: &DataFrame,
        y: &[f64],
        schema: &Schema,
    ) -> Result<FittedPipeline> {
        if x.height() != y.len() {
            return Err(HydroError::SchemaMismatch(format!(
                "design matrix has {} rows but target has {}",
                x.height(),
                y.len()
            )));
        }
        let preprocessor = FittedPreprocessor::fit(x, schema)?;
        let encoded = preprocessor.transform(x)?;
        let model = LinearModel::fit(&encoded, &Array1::from(y.to_vec()), &self.params)?;

        Ok(FittedPipeline {
            version: ARTIFACT_VERSION,
            preprocessor,
            model,
            params: self.params,
        })
    }
}

/// Trained artifact: fitted preprocessing, coefficients and the hyperparameters used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    version: u32,
    preprocessor: FittedPreprocessor,
    model: LinearModel,
    params: ElasticNetParams,
}

impl FittedPipeline {
    pub fn predict(&self, x: &DataFrame) -> Result<Vec<f64>> {
        let encoded = self.preprocessor.transform(x)?;
        Ok(self.model.predict(&encoded)?.to_vec())
    }

    pub fn params(&self) -> &ElasticNetParams {
        &self.params
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Number of encoded columns the regressor was fitted on.
    pub fn n_features_in(&self) -> usize {
        self.model.coefficients().len()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self).map_err(|e| HydroError::Artifact {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!("Saved model to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let pipeline: FittedPipeline =
            bincode::deserialize_from(reader).map_err(|e| HydroError::Artifact {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if pipeline.version != ARTIFACT_VERSION {
            return Err(HydroError::Artifact {
                path: path.to_path_buf(),
                message: format!(
                    "artifact version {} is not supported (expected {})",
                    pipeline.version, ARTIFACT_VERSION
                ),
            });
        }

        Ok(pipeline)
    }
}
