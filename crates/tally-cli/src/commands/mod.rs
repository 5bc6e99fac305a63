//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `receipts` - Receipt parsing and classification commands
//! - `training` - Classifier retraining command
//! - `history` - Historical series commands (anomalies, forecast, trend)

pub mod history;
pub mod receipts;
pub mod training;

// Re-export command functions for main.rs
pub use history::*;
pub use receipts::*;
pub use training::*;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use tally_core::{
    AmountRecord, CategoryTable, CoreConfig, LabeledSample, Pipeline, SnapshotStore,
};

use crate::cli::Cli;

/// Resolve the category table from the global CLI options.
pub fn load_table(cli: &Cli) -> Result<CategoryTable> {
    match &cli.categories {
        Some(path) => CategoryTable::from_file(path)
            .with_context(|| format!("failed to load category table from {}", path.display())),
        None => Ok(CategoryTable::builtin()),
    }
}

/// Build the pipeline from global CLI options: category table override,
/// snapshot path override, platform default snapshot otherwise.
pub fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let table = load_table(cli)?;

    let store = match &cli.model_path {
        Some(path) => Some(SnapshotStore::new(path.clone())),
        None => SnapshotStore::default_path().map(SnapshotStore::new),
    };

    let pipeline = match store {
        Some(store) => Pipeline::with_store(table, store, CoreConfig::default())?,
        None => Pipeline::new(table, CoreConfig::default())?,
    };

    Ok(pipeline)
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    date: String,
    amount: f64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    merchant: Option<String>,
}

/// Load a history CSV (date,amount[,category][,merchant]) into an amount
/// series sorted ascending by timestamp.
pub fn load_history(path: &Path) -> Result<Vec<AmountRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open history CSV {}", path.display()))?;

    let mut series = Vec::new();
    for (i, row) in reader.deserialize::<HistoryRow>().enumerate() {
        let row = row.with_context(|| format!("bad history row {}", i + 1))?;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .with_context(|| format!("bad date '{}' in row {} (use YYYY-MM-DD)", row.date, i + 1))?;

        let mut record = AmountRecord::new(date.and_hms_opt(12, 0, 0).unwrap(), row.amount);
        record.category = row.category.filter(|c| !c.is_empty());
        record.merchant = row.merchant.filter(|m| !m.is_empty());
        series.push(record);
    }

    series.sort_by_key(|r| r.timestamp);
    Ok(series)
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    #[serde(default)]
    merchant: Option<String>,
    #[serde(default)]
    description: Option<String>,
    category: String,
}

/// Load a labeled sample CSV (merchant,description,category).
pub fn load_samples(path: &Path) -> Result<Vec<LabeledSample>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open sample CSV {}", path.display()))?;

    let mut samples = Vec::new();
    for (i, row) in reader.deserialize::<SampleRow>().enumerate() {
        let row: SampleRow = row.with_context(|| format!("bad sample row {}", i + 1))?;
        samples.push(LabeledSample {
            merchant: row.merchant.filter(|m| !m.is_empty()),
            description: row.description.filter(|d| !d.is_empty()),
            category: row.category,
        });
    }

    Ok(samples)
}
