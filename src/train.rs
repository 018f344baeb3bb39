use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::data::{describe_columns, load_dataframe, prepare_dataset, ColumnSummary, Dataset};
use crate::errors::Result;
use crate::metrics::{r2_score, rmse, BestParams, TrainingMetrics};
use crate::model::{ElasticNetParams, FittedPipeline, ParamGrid};
use crate::search::{select_values, take_rows, train_test_split, GridSearch, KFold};
use crate::utils::{ensure_dir, infer_target, save_json};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct TrainOverrides {
    pub csv: Option<PathBuf>,
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub metrics: TrainingMetrics,
    pub pipeline: FittedPipeline,
    /// Held-out rows of the assembled dataset.
    pub holdout: Dataset,
    /// Positions of the held-out rows in the assembled dataset.
    pub test_indices: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub n_rows: usize,
    pub columns: Vec<ColumnSummary>,
    pub target_candidates: Vec<String>,
}

/// Column dtypes and likely target columns, for picking a `--target`.
pub fn inspect(df: &DataFrame) -> InspectReport {
    InspectReport {
        n_rows: df.height(),
        columns: describe_columns(df),
        target_candidates: infer_target(df),
    }
}

/// Assemble, split, grid-search and score on the held-out rows. Nothing is written.
pub fn fit_model(cfg: &Config, df: &DataFrame, target: &str) -> Result<TrainOutcome> {
    let dataset = prepare_dataset(df, target, cfg.timestamp.as_deref(), &cfg.features)?;

    let split = train_test_split(
        dataset.n_rows(),
        cfg.split.test_size,
        cfg.split.shuffle,
        cfg.seed,
    )?;
    info!(
        "Split {} rows into {} train / {} test (seed {})",
        dataset.n_rows(),
        split.train.len(),
        split.test.len(),
        cfg.seed
    );

    let x_train = take_rows(&dataset.features, &split.train)?;
    let y_train = select_values(&dataset.target, &split.train);
    let holdout = Dataset {
        features: take_rows(&dataset.features, &split.test)?,
        target: select_values(&dataset.target, &split.test),
        target_name: dataset.target_name.clone(),
    };

    let enet_cfg = &cfg.model.elasticnet;
    let search = GridSearch::new(
        ParamGrid::from_config(enet_cfg)?,
        ElasticNetParams::from_config(enet_cfg),
        KFold::new(cfg.split.cv_folds),
    );
    let result = search.fit(&x_train, &y_train)?;

    let preds = result.best.predict(&holdout.features)?;
    let metrics = TrainingMetrics {
        rmse: rmse(&holdout.target, &preds),
        r2: r2_score(&holdout.target, &preds),
        best_params: BestParams {
            alpha: result.best_params.alpha,
            l1_ratio: result.best_params.l1_ratio,
        },
        n_features_in: result.best.n_features_in(),
        best_cv_mse: result.best_mse,
        n_train: split.train.len(),
        n_test: split.test.len(),
    };
    info!("Held-out RMSE={:.4} R2={:.4}", metrics.rmse, metrics.r2);

    Ok(TrainOutcome {
        metrics,
        pipeline: result.best,
        holdout,
        test_indices: split.test,
    })
}

/// Train from the configured CSV and persist the artifact plus metrics.
pub fn run_train(cfg: &Config, overrides: &TrainOverrides) -> Result<TrainingMetrics> {
    let csv_path = overrides.csv.clone().unwrap_or_else(|| cfg.csv_path.clone());
    let target = overrides.target.as_deref().unwrap_or(&cfg.target);

    let df = load_dataframe(&csv_path)?;
    let outcome = fit_model(cfg, &df, target)?;

    ensure_dir(&cfg.artifacts_dir)?;
    outcome.pipeline.save(&cfg.model_path())?;
    save_json(&outcome.metrics, &cfg.metrics_path())?;
    info!("Wrote metrics to {:?}", cfg.metrics_path());

    Ok(outcome.metrics)
}
