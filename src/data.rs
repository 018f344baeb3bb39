use polars::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::FeatureConfig;
use crate::errors::{HydroError, Result};
use crate::features::{
    add_interactions, add_lags, add_time_features, finalize_frame, is_numeric_dtype, ColumnPolicy,
};

/// How many column names a missing-target error lists.
const MAX_LISTED_COLUMNS: usize = 20;

/// Feature-engineered design matrix plus the aligned target vector.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: DataFrame,
    pub target: Vec<f64>,
    pub target_name: String,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.target.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

pub fn load_dataframe(csv_path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(csv_path.to_path_buf()))?
        .finish()?;
    info!("Loaded {:?}: {} rows x {} columns", csv_path, df.height(), df.width());
    Ok(df)
}

pub fn describe_columns(df: &DataFrame) -> Vec<ColumnSummary> {
    df.get_columns()
        .iter()
        .map(|series| ColumnSummary {
            name: series.name().to_string(),
            dtype: series.dtype().to_string(),
            null_count: series.null_count(),
        })
        .collect()
}

/// Run the configured feature derivations and drop incomplete rows.
///
/// Whatever target column the input carries is left in place; callers decide
/// whether to split it off (`prepare_dataset`) or discard it (prediction).
pub fn assemble_features(
    df: &DataFrame,
    timestamp_col: Option<&str>,
    feature_cfg: &FeatureConfig,
) -> Result<DataFrame> {
    let policy = ColumnPolicy::from_strict(feature_cfg.strict);
    let mut frame = df.clone();

    if feature_cfg.make_time_features {
        if let Some(ts) = timestamp_col {
            frame = add_time_features(&frame, ts, &feature_cfg.time_features, policy)?;
        }
    }

    if feature_cfg.lags.enable {
        let lag_cfg = &feature_cfg.lags;
        frame = add_lags(&frame, &lag_cfg.columns, &lag_cfg.lags, policy)?;
    }

    if feature_cfg.interactions.enable {
        frame = add_interactions(&frame, &feature_cfg.interactions.pairs, policy)?;
    }

    let input_rows = frame.height();
    let mut frame = finalize_frame(&frame)?;
    debug!("Finalized frame: kept {} of {} rows", frame.height(), input_rows);

    if !feature_cfg.keep_timestamp {
        if let Some(ts) = timestamp_col {
            if frame.column(ts).is_ok() {
                frame = frame.drop(ts)?;
            }
        }
    }

    Ok(frame)
}

pub fn target_values(series: &Series) -> Result<Vec<f64>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(HydroError::NonNumericColumn {
            column: series.name().to_string(),
            dtype: series.dtype().to_string(),
        });
    }
    let values = series.cast(&DataType::Float64)?;
    let values = values.f64()?.into_no_null_iter().collect();
    Ok(values)
}

/// Assemble features and separate the target column from the design matrix.
pub fn prepare_dataset(
    df: &DataFrame,
    target: &str,
    timestamp_col: Option<&str>,
    feature_cfg: &FeatureConfig,
) -> Result<Dataset> {
    let frame = assemble_features(df, timestamp_col, feature_cfg)?;

    let target_series = match frame.column(target) {
        Ok(series) => series.clone(),
        Err(_) => {
            return Err(HydroError::MissingTarget {
                target: target.to_string(),
                available: frame
                    .get_column_names()
                    .into_iter()
                    .take(MAX_LISTED_COLUMNS)
                    .map(|name| name.to_string())
                    .collect(),
            })
        }
    };

    let target_vec = target_values(&target_series)?;
    let features = frame.drop(target)?;

    info!(
        "Prepared dataset: {} rows, {} feature columns, target '{}'",
        features.height(),
        features.width(),
        target
    );

    Ok(Dataset {
        features,
        target: target_vec,
        target_name: target.to_string(),
    })
}
