//! Historical series commands: anomalies, forecast, and trend

use std::path::Path;

use anyhow::Result;

use tally_core::{anomaly, ForecastEngine, ForecastOutcome, TrendOutcome};

use super::load_history;
use crate::cli::Cli;

pub fn cmd_anomalies(_cli: &Cli, file: &Path, threshold: f64) -> Result<()> {
    if threshold <= 0.0 {
        anyhow::bail!("threshold must be positive, got {threshold}");
    }

    let series = load_history(file)?;
    let anomalies = anomaly::detect(&series, threshold);

    if anomalies.is_empty() {
        println!("No anomalies in {} records", series.len());
        return Ok(());
    }

    println!(
        "{} anomalies in {} records (z > {threshold:.1}):",
        anomalies.len(),
        series.len()
    );
    for a in &anomalies {
        println!(
            "  {}  {:>10.2}  z={:.2}  mean={:.2}  {}",
            a.timestamp.format("%Y-%m-%d"),
            a.amount,
            a.z_score,
            a.mean,
            a.merchant.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn cmd_forecast(
    _cli: &Cli,
    file: &Path,
    periods: usize,
    level: f64,
    by_category: bool,
) -> Result<()> {
    if periods == 0 {
        anyhow::bail!("periods must be at least 1");
    }
    if level <= 0.0 || level >= 1.0 {
        anyhow::bail!("confidence level must be between 0 and 1, got {level}");
    }

    let series = load_history(file)?;
    let engine = ForecastEngine::new();

    if by_category {
        for (slug, outcome) in engine.forecast_by_category(&series, periods, level) {
            println!("{slug}:");
            print_forecast(&outcome);
        }
        return Ok(());
    }

    print_forecast(&engine.fit_and_forecast(&series, periods, level));
    Ok(())
}

fn print_forecast(outcome: &ForecastOutcome) {
    match outcome {
        ForecastOutcome::InsufficientData {
            observations,
            required,
        } => {
            println!("  not enough history ({observations} of {required} records)");
        }
        ForecastOutcome::Forecast(report) => {
            for p in &report.points {
                println!(
                    "  {}  {:>10.2}  [{:.2}, {:.2}] at {:.0}%",
                    p.month,
                    p.predicted_amount,
                    p.lower_bound,
                    p.upper_bound,
                    p.confidence_level * 100.0
                );
            }
            println!(
                "  fit: {} months, slope {:+.2}/month, r2={:.3}",
                report.model.training_months, report.model.slope, report.model.r_squared
            );
        }
    }
}

pub fn cmd_trend(_cli: &Cli, file: &Path) -> Result<()> {
    let series = load_history(file)?;
    let engine = ForecastEngine::new();

    match engine.detect_trend(&series) {
        TrendOutcome::InsufficientData { buckets, required } => {
            println!("Not enough history: {buckets} of {required} monthly buckets");
        }
        TrendOutcome::Trend(report) => {
            println!(
                "Trend: {} ({:+.2}/month)",
                report.direction.as_str(),
                report.slope
            );
            println!("{}", report.description);
        }
    }
    Ok(())
}
