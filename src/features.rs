use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;

use crate::config::TimeFeature;
use crate::errors::{HydroError, Result};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y%m%d %H:%M:%S",
    "%Y%m%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// What to do when a feature request names a column the table does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// Skip the request without a diagnostic.
    #[default]
    BestEffort,
    /// Fail with `HydroError::MissingColumn`.
    Strict,
}

impl ColumnPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ColumnPolicy::Strict
        } else {
            ColumnPolicy::BestEffort
        }
    }

    fn on_missing(&self, column: &str, context: &str) -> Result<()> {
        match self {
            ColumnPolicy::BestEffort => Ok(()),
            ColumnPolicy::Strict => Err(HydroError::MissingColumn {
                column: column.to_string(),
                context: context.to_string(),
            }),
        }
    }
}

pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

pub fn lag_column_name(column: &str, lag: i64) -> String {
    format!("{}_lag{}", column, lag)
}

pub fn interaction_column_name(left: &str, right: &str) -> String {
    format!("{}__x__{}", left, right)
}

/// Parse a timestamp the way a lenient CSV reader would. Returns `None` for anything unrecognised.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn time_component(ts: &NaiveDateTime, feature: TimeFeature) -> i32 {
    match feature {
        TimeFeature::Hour => ts.hour() as i32,
        TimeFeature::DayOfWeek => ts.weekday().num_days_from_monday() as i32,
        TimeFeature::Month => ts.month() as i32,
    }
}

/// Append calendar columns derived from `timestamp_col`.
///
/// Only the requested features are added, always in hour, dayofweek, month order.
/// Unparseable timestamps yield missing values; an absent timestamp column leaves
/// the table untouched unless the policy is strict.
pub fn add_time_features(
    df: &DataFrame,
    timestamp_col: &str,
    features: &[TimeFeature],
    policy: ColumnPolicy,
) -> Result<DataFrame> {
    let raw = match df.column(timestamp_col) {
        Ok(series) => series.cast(&DataType::String)?,
        Err(_) => {
            policy.on_missing(timestamp_col, "time features")?;
            return Ok(df.clone());
        }
    };

    let parsed: Vec<Option<NaiveDateTime>> = raw
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_timestamp))
        .collect();

    let mut out = df.clone();
    for feature in [TimeFeature::Hour, TimeFeature::DayOfWeek, TimeFeature::Month] {
        if !features.contains(&feature) {
            continue;
        }
        let values: Vec<Option<i32>> = parsed
            .iter()
            .map(|ts| ts.as_ref().map(|t| time_component(t, feature)))
            .collect();
        out.with_column(Series::new(feature.column_name(), values))?;
    }

    Ok(out)
}

/// Append `{col}_lag{k}` for every present column and every offset.
pub fn add_lags<S: AsRef<str>>(
    df: &DataFrame,
    columns: &[S],
    lags: &[i64],
    policy: ColumnPolicy,
) -> Result<DataFrame> {
    let mut out = df.clone();

    for column in columns {
        let name = column.as_ref();
        let source = match out.column(name) {
            Ok(series) => series.clone(),
            Err(_) => {
                policy.on_missing(name, "lag features")?;
                continue;
            }
        };

        for &lag in lags {
            let shifted = source.shift(lag).with_name(&lag_column_name(name, lag));
            out.with_column(shifted)?;
        }
    }

    Ok(out)
}

fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(HydroError::NonNumericColumn {
            column: series.name().to_string(),
            dtype: series.dtype().to_string(),
        });
    }
    let values = series.cast(&DataType::Float64)?;
    let values = values.f64()?.into_iter().collect();
    Ok(values)
}

/// Append `{a}__x__{b}` holding the elementwise product for every pair whose columns both exist.
pub fn add_interactions(
    df: &DataFrame,
    pairs: &[(String, String)],
    policy: ColumnPolicy,
) -> Result<DataFrame> {
    let mut out = df.clone();

    for (left_name, right_name) in pairs {
        let (left, right) = match (out.column(left_name), out.column(right_name)) {
            (Ok(left), Ok(right)) => (numeric_values(left)?, numeric_values(right)?),
            (Err(_), _) => {
                policy.on_missing(left_name, "interaction features")?;
                continue;
            }
            (_, Err(_)) => {
                policy.on_missing(right_name, "interaction features")?;
                continue;
            }
        };

        let product = Float64Chunked::from_iter(
            left.into_iter()
                .zip(right)
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(a * b),
                    _ => None,
                }),
        )
        .into_series()
        .with_name(&interaction_column_name(left_name, right_name));

        out.with_column(product)?;
    }

    Ok(out)
}

/// Drop every row holding a null (or a NaN in a float column) anywhere.
pub fn finalize_frame(df: &DataFrame) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];

    for series in df.get_columns() {
        if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
            let values = series.cast(&DataType::Float64)?;
            for (flag, value) in keep.iter_mut().zip(values.f64()?.into_iter()) {
                if value.map_or(true, f64::is_nan) {
                    *flag = false;
                }
            }
        } else if series.null_count() > 0 {
            let valid = series.is_not_null();
            for (flag, present) in keep.iter_mut().zip(valid.into_iter()) {
                if present != Some(true) {
                    *flag = false;
                }
            }
        }
    }

    let mask: BooleanChunked = keep.into_iter().collect();
    Ok(df.filter(&mask)?)
}
