//! Receipt parsing and classification commands

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use super::{build_pipeline, load_table};
use crate::cli::Cli;

pub fn cmd_parse(cli: &Cli, file: &Path, as_json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read receipt file {}", file.display()))?;

    let pipeline = build_pipeline(cli)?;
    let processed = pipeline.process_receipt(&raw);

    if as_json {
        let out = json!({
            "receipt": processed.record,
            "category": processed.classification.category,
            "category_confidence": processed.classification.confidence,
            "parse_confidence": processed.parse_confidence,
            "usable": processed.usable,
            "flags": processed.flags,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let record = &processed.record;
    println!(
        "Merchant:  {}",
        record.merchant.as_deref().unwrap_or("(not found)")
    );
    println!(
        "Date:      {}",
        record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "(not found)".into())
    );
    println!(
        "Total:     {}",
        record
            .total
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "(not found)".into())
    );
    println!(
        "Payment:   {}",
        record
            .payment_method
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "(not found)".into())
    );

    if !record.items.is_empty() {
        println!("Items:");
        for item in &record.items {
            println!("  {:<40} {:>8.2}", item.description, item.price);
        }
    }

    println!(
        "Category:  {} ({:.0}% confidence)",
        processed.classification.category,
        processed.classification.confidence * 100.0
    );
    println!("Parse confidence: {:.2}", processed.parse_confidence);

    if !processed.usable {
        println!("Warning: receipt is missing a usable total and will not count toward history");
    }
    if processed.flags.future_date {
        println!("Warning: receipt date is in the future");
    }
    if processed.flags.stale_date {
        println!("Warning: receipt date is more than a year old");
    }

    Ok(())
}

pub fn cmd_classify(
    cli: &Cli,
    text: &str,
    merchant: Option<&str>,
    suggest: Option<usize>,
) -> Result<()> {
    let pipeline = build_pipeline(cli)?;

    if let Some(top_n) = suggest {
        let suggestions = pipeline.classifier().suggest(text, top_n);
        if suggestions.is_empty() {
            println!("No suggestions available");
            return Ok(());
        }
        for (rank, (label, prob)) in suggestions.iter().enumerate() {
            println!("{}. {:<16} {:.1}%", rank + 1, label.as_str(), prob * 100.0);
        }
        return Ok(());
    }

    let result = pipeline.classifier().classify(text, merchant, None);
    println!(
        "{} ({:.0}% confidence)",
        result.category,
        result.confidence * 100.0
    );
    Ok(())
}

pub fn cmd_categories(cli: &Cli) -> Result<()> {
    let table = load_table(cli)?;

    for info in table.iter() {
        println!("{} ({})", info.slug, info.name);
        if !info.keywords.is_empty() {
            println!("  keywords: {}", info.keywords.join(", "));
        }
    }
    Ok(())
}
