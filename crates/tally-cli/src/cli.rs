//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Expense intelligence: receipt parsing, categorization, and forecasting")]
#[command(version)]
pub struct Cli {
    /// Classifier model snapshot path (default: platform data dir)
    #[arg(long, global = true)]
    pub model_path: Option<PathBuf>,

    /// Category table TOML override (default: embedded table)
    #[arg(long, global = true)]
    pub categories: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a receipt text file into structured fields
    Parse {
        /// Path to a file holding raw OCR text
        #[arg(short, long)]
        file: PathBuf,

        /// Emit the processed receipt as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a text fragment into a spending category
    Classify {
        /// Text to classify (e.g. a merchant or description)
        text: String,

        /// Merchant name to blend into the classification
        #[arg(short, long)]
        merchant: Option<String>,

        /// Show the top N category suggestions instead of one answer
        #[arg(short, long)]
        suggest: Option<usize>,
    },

    /// Retrain the classifier from labeled samples
    Train {
        /// CSV with columns: merchant,description,category
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Flag statistically unusual amounts in a history CSV
    Anomalies {
        /// CSV with columns: date,amount[,category][,merchant]
        #[arg(short, long)]
        file: PathBuf,

        /// Z-score threshold
        #[arg(short, long, default_value_t = 3.0)]
        threshold: f64,
    },

    /// Project future monthly spending from a history CSV
    Forecast {
        /// CSV with columns: date,amount[,category][,merchant]
        #[arg(short, long)]
        file: PathBuf,

        /// Months to project
        #[arg(short, long, default_value_t = 3)]
        periods: usize,

        /// Confidence level for the bounds
        #[arg(short, long, default_value_t = 0.95)]
        level: f64,

        /// Forecast each category separately
        #[arg(long)]
        by_category: bool,
    },

    /// Classify the spending trend in a history CSV
    Trend {
        /// CSV with columns: date,amount[,category][,merchant]
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the configured categories and their keywords
    Categories,
}
