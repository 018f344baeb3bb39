use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

use hydro_cost::config::{load_config, resolve_config_path, CONFIG_ENV_VAR};
use hydro_cost::data::load_dataframe;
use hydro_cost::evaluate::run_evaluate;
use hydro_cost::predict::run_predict;
use hydro_cost::train::{inspect, run_train, TrainOverrides};
use hydro_cost::HydroError;

#[derive(Parser, Debug)]
#[command(name = "hydro_cost")]
#[command(about = "Elastic-net marginal cost model for hydro power plants", long_about = None)]
struct Args {
    /// Path to a YAML or JSON config file
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the model with a cross-validated grid search and save the artifact
    Train {
        /// Overrides `csv_path` from the config
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Overrides `target` from the config
        #[arg(long)]
        target: Option<String>,

        /// Print column dtypes and likely target columns, then exit
        #[arg(long)]
        inspect: bool,
    },
    /// Score the saved model on a labelled CSV
    Evaluate {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        target: String,
    },
    /// Write predictions for a CSV to a single-column file
    Predict {
        #[arg(long)]
        csv: PathBuf,

        /// Column to drop from the input if present
        #[arg(long)]
        target: Option<String>,

        /// Defaults to `artifacts_dir/predictions_filename`
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn driver_error(err: HydroError, action: &str) -> anyhow::Error {
    if err.is_config_error() {
        error!("{} stopped on a configuration problem: {}", action, err);
    }
    anyhow::Error::new(err).context(format!("{} failed", action))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hydro_cost=info".parse()?)
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let cfg = load_config(Some(&config_path))
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    info!("Using config {:?}", config_path);

    match args.command {
        Command::Train { csv, target, inspect: true } => {
            let csv_path = csv.unwrap_or_else(|| cfg.csv_path.clone());
            let df = load_dataframe(&csv_path)
                .with_context(|| format!("Failed to read {:?}", csv_path))?;
            let report = inspect(&df);
            if let Some(target) = target {
                info!("Requested target '{}' present: {}", target, df.column(&target).is_ok());
            }
            print_json(&report)?;
        }
        Command::Train { csv, target, inspect: false } => {
            let overrides = TrainOverrides { csv, target };
            let metrics = run_train(&cfg, &overrides).map_err(|e| driver_error(e, "Training"))?;
            info!("Model saved to {:?}", cfg.model_path());
            print_json(&metrics)?;
        }
        Command::Evaluate { csv, target } => {
            let metrics =
                run_evaluate(&cfg, &csv, &target).map_err(|e| driver_error(e, "Evaluation"))?;
            print_json(&metrics)?;
        }
        Command::Predict { csv, target, out } => {
            let target = target.unwrap_or_else(|| cfg.target.clone());
            let output = run_predict(&cfg, &csv, Some(&target), out.as_deref())
                .map_err(|e| driver_error(e, "Prediction"))?;
            print_json(&output)?;
        }
    }

    Ok(())
}
