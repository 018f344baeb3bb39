use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

pub const CONFIG_ENV_VAR: &str = "HYDRO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub seed: u64,
    pub artifacts_dir: PathBuf,
    pub model_filename: String,
    pub metrics_filename: String,
    pub predictions_filename: String,
    pub csv_path: PathBuf,
    pub target: String,
    pub timestamp: Option<String>,
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub split: SplitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFeature {
    #[serde(rename = "hour")]
    Hour,
    #[serde(rename = "dayofweek", alias = "day_of_week", alias = "day-of-week")]
    DayOfWeek,
    #[serde(rename = "month")]
    Month,
}

impl TimeFeature {
    pub fn column_name(&self) -> &'static str {
        match self {
            TimeFeature::Hour => "hour",
            TimeFeature::DayOfWeek => "dayofweek",
            TimeFeature::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub make_time_features: bool,
    pub time_features: Vec<TimeFeature>,
    pub lags: LagConfig,
    pub interactions: InteractionConfig,
    /// Fail instead of skipping when a referenced column is absent.
    pub strict: bool,
    /// Keep the raw timestamp column in the design matrix, where it is one-hot encoded.
    pub keep_timestamp: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LagConfig {
    pub enable: bool,
    pub columns: Vec<String>,
    pub lags: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub enable: bool,
    pub pairs: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub elasticnet: ElasticNetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticNetConfig {
    /// Overrides the default regularization-strength grid.
    pub alpha: Option<Vec<f64>>,
    /// Overrides the default L1/L2 mixing-ratio grid.
    pub l1_ratio: Option<Vec<f64>>,
    pub max_iter: u32,
    pub tol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_size: f64,
    pub shuffle: bool,
    pub cv_folds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 42,
            artifacts_dir: PathBuf::from("artifacts"),
            model_filename: String::from("model.bin"),
            metrics_filename: String::from("metrics.json"),
            predictions_filename: String::from("predictions.csv"),
            csv_path: PathBuf::from("data/hydro.csv"),
            target: String::from("marginal_cost"),
            timestamp: Some(String::from("timestamp")),
            features: FeatureConfig::default(),
            model: ModelConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            make_time_features: true,
            time_features: vec![TimeFeature::Hour, TimeFeature::DayOfWeek, TimeFeature::Month],
            lags: LagConfig {
                enable: true,
                columns: vec![String::from("flow_m3s"), String::from("head_m")],
                lags: vec![1, 2],
            },
            interactions: InteractionConfig {
                enable: true,
                pairs: vec![
                    (String::from("flow_m3s"), String::from("head_m")),
                    (String::from("gate_opening"), String::from("efficiency")),
                ],
            },
            strict: false,
            keep_timestamp: true,
        }
    }
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            alpha: None,
            l1_ratio: None,
            max_iter: 2000,
            tol: 1e-4,
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            shuffle: true,
            cv_folds: 5,
        }
    }
}

impl Config {
    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.model_filename)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.metrics_filename)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.predictions_filename)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let split = &self.split;
        if !(split.test_size > 0.0 && split.test_size < 1.0) {
            return Err(invalid("split.test_size", format!("{} is not in (0, 1)", split.test_size)));
        }
        if split.cv_folds < 2 {
            return Err(invalid(
                "split.cv_folds",
                format!("{} folds, need at least 2", split.cv_folds),
            ));
        }

        let enet = &self.model.elasticnet;
        if enet.max_iter == 0 {
            return Err(invalid("model.elasticnet.max_iter", "must be positive".to_string()));
        }
        if !(enet.tol > 0.0) {
            return Err(invalid("model.elasticnet.tol", format!("{} must be positive", enet.tol)));
        }
        if let Some(alphas) = &enet.alpha {
            if let Some(bad) = alphas.iter().find(|a| !(**a >= 0.0) || !a.is_finite()) {
                return Err(invalid(
                    "model.elasticnet.alpha",
                    format!("{} is not a finite non-negative value", bad),
                ));
            }
        }
        if let Some(ratios) = &enet.l1_ratio {
            if let Some(bad) = ratios.iter().find(|r| !(0.0..=1.0).contains(*r)) {
                return Err(invalid(
                    "model.elasticnet.l1_ratio",
                    format!("{} is not in [0, 1]", bad),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message,
    }
}

/// Resolve the config path: explicit argument, then `HYDRO_CONFIG`, then the default location.
pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) => p.to_path_buf(),
        None => std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = resolve_config_path(path);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }

    let file = File::open(&path).map_err(|e| ConfigError::Io {
        path: path.clone(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let config: Config = match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_reader(reader).map_err(|e| ConfigError::Yaml {
                path: path.clone(),
                source: e,
            })?
        }
        Some("json") => serde_json::from_reader(reader).map_err(|e| ConfigError::Json {
            path: path.clone(),
            source: e,
        })?,
        _ => return Err(ConfigError::UnsupportedFormat { path }),
    };

    config.validate()?;
    Ok(config)
}
