//! Tally CLI - expense intelligence pipeline
//!
//! Usage:
//!   tally parse --file receipt.txt       Parse a receipt text file
//!   tally classify "starbucks coffee"    Categorize a text fragment
//!   tally train --file labeled.csv       Retrain the classifier
//!   tally anomalies --file history.csv   Flag unusual amounts
//!   tally forecast --file history.csv    Project future spending

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match &cli.command {
        Commands::Parse { file, json } => commands::cmd_parse(&cli, file, *json),
        Commands::Classify {
            text,
            merchant,
            suggest,
        } => commands::cmd_classify(&cli, text, merchant.as_deref(), *suggest),
        Commands::Train { file } => commands::cmd_train(&cli, file),
        Commands::Anomalies { file, threshold } => commands::cmd_anomalies(&cli, file, *threshold),
        Commands::Forecast {
            file,
            periods,
            level,
            by_category,
        } => commands::cmd_forecast(&cli, file, *periods, *level, *by_category),
        Commands::Trend { file } => commands::cmd_trend(&cli, file),
        Commands::Categories => commands::cmd_categories(&cli),
    }
}
