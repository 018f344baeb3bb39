use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::data::{assemble_features, load_dataframe};
use crate::errors::Result;
use crate::model::FittedPipeline;
use crate::utils::ensure_dir;

pub const PREDICTION_COLUMN: &str = "prediction";

#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutput {
    pub path: PathBuf,
    pub n_rows: usize,
}

/// Assemble features exactly as in training and predict one value per surviving row.
///
/// A `target` column present in the input is dropped before prediction.
pub fn predict_frame(
    cfg: &Config,
    pipeline: &FittedPipeline,
    df: &DataFrame,
    target: Option<&str>,
) -> Result<Vec<f64>> {
    let mut frame = assemble_features(df, cfg.timestamp.as_deref(), &cfg.features)?;
    if let Some(target) = target {
        if frame.column(target).is_ok() {
            debug!("Dropping target column '{}' before prediction", target);
            frame = frame.drop(target)?;
        }
    }
    pipeline.predict(&frame)
}

pub fn write_predictions(path: &Path, predictions: &[f64]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let mut df = DataFrame::new(vec![Series::new(PREDICTION_COLUMN, predictions)])?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

pub fn run_predict(
    cfg: &Config,
    csv_path: &Path,
    target: Option<&str>,
    out: Option<&Path>,
) -> Result<PredictionOutput> {
    let pipeline = FittedPipeline::load(&cfg.model_path())?;
    let df = load_dataframe(csv_path)?;

    let predictions = predict_frame(cfg, &pipeline, &df, target)?;
    let path = out.map(Path::to_path_buf).unwrap_or_else(|| cfg.predictions_path());
    write_predictions(&path, &predictions)?;
    info!("Wrote {} predictions to {:?}", predictions.len(), path);

    Ok(PredictionOutput {
        path,
        n_rows: predictions.len(),
    })
}
