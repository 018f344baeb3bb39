use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::data::{load_dataframe, prepare_dataset};
use crate::errors::Result;
use crate::metrics::EvaluationMetrics;
use crate::model::FittedPipeline;

/// Score a fitted pipeline on an in-memory table that carries the target.
pub fn evaluate_frame(
    cfg: &Config,
    pipeline: &FittedPipeline,
    df: &DataFrame,
    target: &str,
) -> Result<EvaluationMetrics> {
    let dataset = prepare_dataset(df, target, cfg.timestamp.as_deref(), &cfg.features)?;
    let preds = pipeline.predict(&dataset.features)?;
    Ok(EvaluationMetrics::compute(&dataset.target, &preds))
}

pub fn run_evaluate(cfg: &Config, csv_path: &Path, target: &str) -> Result<EvaluationMetrics> {
    let pipeline = FittedPipeline::load(&cfg.model_path())?;
    let df = load_dataframe(csv_path)?;

    let metrics = evaluate_frame(cfg, &pipeline, &df, target)?;
    info!(
        "Evaluated {} rows: RMSE={:.4} R2={:.4}",
        metrics.n_rows, metrics.rmse, metrics.r2
    );
    Ok(metrics)
}
