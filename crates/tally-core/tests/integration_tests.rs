//! Integration tests for tally-core
//!
//! These tests exercise the full extract → classify → analyze workflow.

use chrono::NaiveDate;
use tally_core::{
    classify::TrainingOutcome,
    forecast::{ForecastOutcome, TrendOutcome},
    models::{AmountRecord, LabeledSample},
    pipeline::{CoreConfig, Pipeline},
    CategoryTable, SnapshotStore, TrendDirection,
};

fn pipeline() -> Pipeline {
    Pipeline::new(CategoryTable::builtin(), CoreConfig::default()).unwrap()
}

/// Helper: one record per day spread over consecutive months starting at
/// 2024-01, month totals as given.
fn history(monthly_totals: &[f64], per_month: usize) -> Vec<AmountRecord> {
    let mut series = Vec::new();
    for (i, total) in monthly_totals.iter().enumerate() {
        for d in 0..per_month {
            let ts = NaiveDate::from_ymd_opt(2024, i as u32 + 1, d as u32 + 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap();
            series.push(AmountRecord::new(ts, total / per_month as f64));
        }
    }
    series
}

// =============================================================================
// Receipt Workflow Tests
// =============================================================================

#[test]
fn test_full_receipt_workflow() {
    let p = pipeline();
    let text = "WALMART\n123 MAIN ST\n12/06/2024\nMILK 2.50\nBREAD 3.00\nTotal: 5.50$";

    let processed = p.process_receipt(text);

    assert_eq!(processed.record.merchant.as_deref(), Some("WALMART"));
    assert_eq!(processed.record.total, Some(5.50));
    assert_eq!(processed.record.items.len(), 2);
    assert_eq!(processed.record.items[0].description, "MILK");
    assert_eq!(processed.record.items[0].price, 2.50);
    assert_eq!(processed.record.items[1].description, "BREAD");
    assert_eq!(processed.record.items[1].price, 3.00);
    assert!(processed.record.date.is_some());

    // All four field groups present
    assert!(processed.parse_confidence >= 0.9);

    assert_eq!(processed.classification.category.as_str(), "food");
    assert!(processed.classification.confidence > 0.7);
}

#[test]
fn test_receipt_without_total_is_unusable_but_complete() {
    let p = pipeline();
    let processed = p.process_receipt("CORNER SHOP\nthanks for visiting");

    assert!(!processed.usable);
    assert!(processed.record.merchant.is_some());
    assert!(processed.record.total.is_none());
    assert!((0.0..=1.0).contains(&processed.classification.confidence));
}

// =============================================================================
// Classifier Lifecycle Tests
// =============================================================================

#[test]
fn test_retrain_and_reload_across_processes() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("classifier.json"));

    let samples: Vec<LabeledSample> = [
        ("blue bottle coffee", "food"),
        ("corner bakery", "food"),
        ("city transit pass", "transportation"),
        ("airport parking", "transportation"),
        ("rent payment may", "housing"),
        ("electric utility", "housing"),
        ("cvs pharmacy", "health"),
        ("steam purchase", "entertainment"),
        ("campus bookstore", "education"),
        ("amazon marketplace", "shopping"),
    ]
    .iter()
    .map(|(m, c)| LabeledSample {
        merchant: Some(m.to_string()),
        description: None,
        category: c.to_string(),
    })
    .collect();

    // First "process": train and persist
    let first = Pipeline::with_store(
        CategoryTable::builtin(),
        store.clone(),
        CoreConfig::default(),
    )
    .unwrap();
    let outcome = first.train_classifier(&samples).unwrap();
    assert!(matches!(outcome, TrainingOutcome::Retrained { samples: 10 }));

    let held_out = ["blue bottle coffee", "city transit pass", "rent payment may"];
    let before: Vec<_> = held_out
        .iter()
        .map(|t| first.classifier().classify(t, None, None))
        .collect();

    // Second "process": load the snapshot, expect identical outputs
    let second = Pipeline::with_store(CategoryTable::builtin(), store, CoreConfig::default())
        .unwrap();
    let after: Vec<_> = held_out
        .iter()
        .map(|t| second.classifier().classify(t, None, None))
        .collect();

    assert_eq!(before, after);
}

// =============================================================================
// History Analysis Tests
// =============================================================================

#[test]
fn test_history_analysis_full_workflow() {
    let p = pipeline();

    // Six months of mildly growing spend, 10 records per month, with one
    // wild outlier spliced in
    let mut series = history(&[300.0, 310.0, 320.0, 330.0, 340.0, 350.0], 10);
    series.push(AmountRecord::new(
        NaiveDate::from_ymd_opt(2024, 6, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
        5000.0,
    ));

    let analysis = p.analyze_history(&series);

    assert_eq!(analysis.anomalies.len(), 1);
    assert_eq!(analysis.anomalies[0].amount, 5000.0);

    // The outlier month dominates the slope
    let TrendOutcome::Trend(trend) = &analysis.trend else {
        panic!("expected a trend");
    };
    assert_eq!(trend.direction, TrendDirection::Increasing);

    let ForecastOutcome::Forecast(report) = &analysis.forecast else {
        panic!("expected a forecast");
    };
    assert_eq!(report.points.len(), 3);
    assert_eq!(report.points[0].month, "2024-07");
    for point in &report.points {
        assert!(point.predicted_amount >= 0.0);
        assert!(point.lower_bound >= 0.0);
        assert!(point.upper_bound >= point.lower_bound);
        assert_eq!(point.confidence_level, 0.95);
    }
}

#[test]
fn test_history_analysis_new_user() {
    let p = pipeline();
    let series = history(&[120.0], 5);

    let analysis = p.analyze_history(&series);

    assert!(analysis.anomalies.is_empty());
    assert!(matches!(
        analysis.trend,
        TrendOutcome::InsufficientData { buckets: 1, .. }
    ));
    assert!(matches!(
        analysis.forecast,
        ForecastOutcome::InsufficientData {
            observations: 5,
            required: 30
        }
    ));
}
