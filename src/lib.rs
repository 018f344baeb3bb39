pub mod config;
pub mod data;
pub mod errors;
pub mod evaluate;
pub mod features;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod preprocess;
pub mod search;
pub mod train;
pub mod utils;

pub use errors::{HydroError, Result};

#[cfg(test)]
mod tests;
