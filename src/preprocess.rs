use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{HydroError, Result};
use crate::features::is_numeric_dtype;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered column declaration: numeric columns first, then categorical, each in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Resolve column kinds from the dtypes of a training frame.
    pub fn infer(df: &DataFrame) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for series in df.get_columns() {
            let name = series.name().to_string();
            if is_numeric_dtype(series.dtype()) {
                numeric.push(ColumnSpec { name, kind: ColumnKind::Numeric });
            } else {
                categorical.push(ColumnSpec { name, kind: ColumnKind::Categorical });
            }
        }

        numeric.extend(categorical);
        Self { columns: numeric }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ColumnEncoder {
    Standardize { mean: f64, scale: f64 },
    OneHot { categories: Vec<String> },
}

impl ColumnEncoder {
    fn width(&self) -> usize {
        match self {
            ColumnEncoder::Standardize { .. } => 1,
            ColumnEncoder::OneHot { categories } => categories.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedColumn {
    spec: ColumnSpec,
    encoder: ColumnEncoder,
}

/// Learned scaling statistics and category vocabularies for a fixed schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    columns: Vec<FittedColumn>,
}

fn schema_column<'a>(df: &'a DataFrame, spec: &ColumnSpec) -> Result<&'a Series> {
    df.column(&spec.name).map_err(|_| {
        HydroError::SchemaMismatch(format!("column '{}' is missing from the input", spec.name))
    })
}

fn numeric_column(series: &Series) -> Result<Vec<f64>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(HydroError::NonNumericColumn {
            column: series.name().to_string(),
            dtype: series.dtype().to_string(),
        });
    }
    let values = series.cast(&DataType::Float64)?;
    let values = values.f64()?;
    if values.null_count() > 0 {
        return Err(HydroError::SchemaMismatch(format!(
            "numeric column '{}' contains missing values",
            series.name()
        )));
    }
    Ok(values.into_no_null_iter().collect())
}

fn categorical_column(series: &Series) -> Result<Vec<Option<String>>> {
    let values = series.cast(&DataType::String)?;
    let values = values
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

impl FittedPreprocessor {
    /// Learn per-column statistics for `schema` from the rows of `df`.
    pub fn fit(df: &DataFrame, schema: &Schema) -> Result<Self> {
        if df.height() == 0 {
            return Err(HydroError::InsufficientData {
                context: "fitting the preprocessor",
                required: 1,
                got: 0,
            });
        }

        let mut columns = Vec::with_capacity(schema.len());
        for spec in schema.columns() {
            let series = schema_column(df, spec)?;
            let encoder = match spec.kind {
                ColumnKind::Numeric => {
                    let values = numeric_column(series)?;
                    let n = values.len() as f64;
                    let mean = values.iter().sum::<f64>() / n;
                    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                    let std = variance.sqrt();
                    let scale = if std > f64::EPSILON * mean.abs().max(1.0) { std } else { 1.0 };
                    ColumnEncoder::Standardize { mean, scale }
                }
                ColumnKind::Categorical => {
                    let categories: BTreeSet<String> =
                        categorical_column(series)?.into_iter().flatten().collect();
                    ColumnEncoder::OneHot {
                        categories: categories.into_iter().collect(),
                    }
                }
            };
            columns.push(FittedColumn {
                spec: spec.clone(),
                encoder,
            });
        }

        Ok(Self { columns })
    }

    /// Infer the schema from `df` and fit on it.
    pub fn fit_inferred(df: &DataFrame) -> Result<Self> {
        Self::fit(df, &Schema::infer(df))
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(|c| c.spec.clone()).collect())
    }

    /// Width of the encoded matrix.
    pub fn n_output_features(&self) -> usize {
        self.columns.iter().map(|c| c.encoder.width()).sum()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_output_features());
        for column in &self.columns {
            match &column.encoder {
                ColumnEncoder::Standardize { .. } => names.push(column.spec.name.clone()),
                ColumnEncoder::OneHot { categories } => {
                    for category in categories {
                        names.push(format!("{}_{}", column.spec.name, category));
                    }
                }
            }
        }
        names
    }

    /// Encode `df` with the fitted schema. Unknown categories encode as all zeros.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let mut out = Array2::<f64>::zeros((n_rows, self.n_output_features()));
        let mut offset = 0;

        for column in &self.columns {
            let series = schema_column(df, &column.spec)?;
            match &column.encoder {
                ColumnEncoder::Standardize { mean, scale } => {
                    for (row, value) in numeric_column(series)?.into_iter().enumerate() {
                        out[[row, offset]] = (value - mean) / scale;
                    }
                }
                ColumnEncoder::OneHot { categories } => {
                    for (row, value) in categorical_column(series)?.into_iter().enumerate() {
                        let position = value.and_then(|v| {
                            categories.binary_search_by(|c| c.as_str().cmp(v.as_str())).ok()
                        });
                        if let Some(position) = position {
                            out[[row, offset + position]] = 1.0;
                        }
                    }
                }
            }
            offset += column.encoder.width();
        }

        Ok(out)
    }
}
