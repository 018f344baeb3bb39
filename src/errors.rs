use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HydroError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("IO error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse YAML configuration in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported configuration format for {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: PathBuf },
    #[error("Invalid configuration field '{field}': {message}")]
    Invalid { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum HydroError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Target column '{target}' not found. Available: {available:?} ...")]
    MissingTarget {
        target: String,
        available: Vec<String>,
    },
    #[error("Column '{column}' referenced by {context} not found")]
    MissingColumn { column: String, context: String },
    #[error("Column '{column}' must be numeric (found {dtype})")]
    NonNumericColumn { column: String, dtype: String },
    #[error("Input does not match the fitted schema: {0}")]
    SchemaMismatch(String),
    #[error("Hyperparameter grid axis '{0}' is empty")]
    EmptyGrid(&'static str),
    #[error("Not enough rows for {context}: required {required}, got {got}")]
    InsufficientData {
        context: &'static str,
        required: usize,
        got: usize,
    },
    #[error("Model fitting failed: {0}")]
    Model(String),
    #[error("Model artifact error for {path}: {message}")]
    Artifact { path: PathBuf, message: String },
    #[error("DataFrame operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl HydroError {
    /// True for errors caused by the configuration rather than the data.
    pub fn is_config_error(&self) -> bool {
        matches!(self, HydroError::Config(_) | HydroError::MissingTarget { .. })
    }
}
