use polars::prelude::DataFrame;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::errors::Result;

/// Lower-cased substrings that mark a column as a likely cost target.
pub const TARGET_KEYWORDS: &[&str] = &["cost", "price", "marginal", "$/", "usd"];

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn infer_target(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            TARGET_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|name| name.to_string())
        .collect()
}
