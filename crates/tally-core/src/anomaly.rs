//! Statistical anomaly detection over a user's amount history
//!
//! Z-score outlier flagging: an amount is anomalous when it sits more than
//! `threshold` population standard deviations from the mean. Results are
//! ephemeral and recomputed on every request.

use tracing::debug;

use crate::models::{AmountRecord, Anomaly};

/// Default z-score threshold (standard deviations from the mean)
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Minimum observations for reliable detection
const MIN_OBSERVATIONS: usize = 10;

/// Most-anomalous-first result cap
const MAX_ANOMALIES: usize = 20;

/// Detect anomalous amounts in a series, most anomalous first, capped at 20.
///
/// Fewer than 10 observations or a degenerate series (zero standard
/// deviation) returns an empty vec: insufficient data is a normal outcome
/// for new users, not an error.
pub fn detect(series: &[AmountRecord], threshold: f64) -> Vec<Anomaly> {
    if series.len() < MIN_OBSERVATIONS {
        debug!(
            observations = series.len(),
            required = MIN_OBSERVATIONS,
            "insufficient data for anomaly detection"
        );
        return Vec::new();
    }

    let amounts: Vec<f64> = series.iter().map(|r| r.amount).collect();
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return Vec::new();
    }

    let mut anomalies: Vec<Anomaly> = series
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let z_score = (record.amount - mean).abs() / std_dev;
            if z_score > threshold {
                Some(Anomaly {
                    index,
                    timestamp: record.timestamp,
                    merchant: record.merchant.clone(),
                    amount: record.amount,
                    mean,
                    z_score,
                    deviation: (record.amount - mean).abs(),
                })
            } else {
                None
            }
        })
        .collect();

    anomalies.sort_by(|a, b| {
        b.z_score
            .partial_cmp(&a.z_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    anomalies.truncate(MAX_ANOMALIES);

    debug!(count = anomalies.len(), threshold, "anomaly detection complete");
    anomalies
}
