use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::Path;

use crate::config::Config;

fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    // Box-Muller
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + std * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Hourly plant telemetry with a linear cost signal plus unit noise.
pub fn synthetic_hydro_frame(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();

    let mut timestamps = Vec::with_capacity(n);
    let mut head = Vec::with_capacity(n);
    let mut flow = Vec::with_capacity(n);
    let mut gate = Vec::with_capacity(n);
    let mut efficiency = Vec::with_capacity(n);
    let mut cost = Vec::with_capacity(n);

    for i in 0..n {
        let ts = start + Duration::hours(i as i64);
        let h = normal(&mut rng, 50.0, 5.0);
        let f = normal(&mut rng, 200.0, 20.0);
        let g = normal(&mut rng, 0.6, 0.1).clamp(0.0, 1.0);
        let e = (0.9 - 0.001 * (f - 200.0).powi(2) / 400.0).clamp(0.7, 0.95);
        let y = 8.0 + 0.05 * f + 0.03 * h + 4.0 * g + 10.0 * (1.0 - e) + normal(&mut rng, 0.0, 1.0);

        timestamps.push(ts.format("%Y-%m-%d %H:%M:%S").to_string());
        head.push(h);
        flow.push(f);
        gate.push(g);
        efficiency.push(e);
        cost.push(y);
    }

    df! {
        "timestamp" => timestamps,
        "head_m" => head,
        "flow_m3s" => flow,
        "gate_opening" => gate,
        "efficiency" => efficiency,
        "marginal_cost" => cost,
    }
    .unwrap()
}

pub fn write_csv(df: &DataFrame, path: &Path) {
    let mut df = df.clone();
    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(&mut df).unwrap();
}

/// Defaults with a small grid and artifacts under `dir`.
pub fn test_config(dir: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.artifacts_dir = dir.join("artifacts");
    cfg.csv_path = dir.join("hydro.csv");
    cfg.model.elasticnet.alpha = Some(vec![0.001, 0.01, 0.1, 1.0]);
    cfg.model.elasticnet.l1_ratio = Some(vec![0.1, 0.5, 0.9]);
    cfg
}

pub fn column_f64(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}
