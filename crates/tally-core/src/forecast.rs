//! Spending trend detection and forecasting
//!
//! Aggregates an amount series into calendar-month buckets and fits a simple
//! least-squares line with the bucket index as the single feature. The fit
//! is rebuilt on every call from the supplied series; unlike the classifier
//! model it has no cross-call memory and is never persisted.

use std::collections::BTreeMap;

use chrono::Datelike;
use tracing::debug;

use crate::models::{AmountRecord, ForecastPoint, TrendDirection, TrendReport};

/// z multiplier used when the caller's confidence level has no table entry
const DEFAULT_Z: f64 = 1.96;

/// Slope beyond which a trend is no longer `stable`, in currency units per
/// month. Fixed absolute thresholds, not scaled to the series' own
/// magnitude: users with very large or very small typical spending get
/// miscalibrated labels. Kept as-is for behavioral compatibility.
const TREND_SLOPE_THRESHOLD: f64 = 10.0;

/// Minimum monthly buckets for trend detection
const MIN_TREND_BUCKETS: usize = 3;

/// Outcome of a forecast request
#[derive(Debug, Clone)]
pub enum ForecastOutcome {
    Forecast(ForecastReport),
    /// Expected steady-state condition for new users, not an error
    InsufficientData { observations: usize, required: usize },
}

/// A completed forecast with fit diagnostics
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub points: Vec<ForecastPoint>,
    pub model: ModelInfo,
}

/// Diagnostics for the fitted regression
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Number of monthly buckets the line was fitted on
    pub training_months: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Standard deviation of fit residuals on observed buckets
    pub residual_std_error: f64,
}

/// Outcome of a trend detection request
#[derive(Debug, Clone)]
pub enum TrendOutcome {
    Trend(TrendReport),
    InsufficientData { buckets: usize, required: usize },
}

/// One calendar-month aggregation bucket
#[derive(Debug, Clone, Copy, PartialEq)]
struct MonthlyBucket {
    year: i32,
    month: u32,
    total: f64,
}

impl MonthlyBucket {
    fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    fn next_month(year: i32, month: u32) -> (i32, u32) {
        if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        }
    }
}

/// Least-squares line over (index, amount) points
#[derive(Debug, Clone, Copy)]
struct LinearFit {
    slope: f64,
    intercept: f64,
}

impl LinearFit {
    fn fit(ys: &[f64]) -> Self {
        let n = ys.len() as f64;
        let x_mean = (ys.len() as f64 - 1.0) / 2.0;
        let y_mean = ys.iter().sum::<f64>() / n;

        let mut num = 0.0;
        let mut den = 0.0;
        for (i, y) in ys.iter().enumerate() {
            let dx = i as f64 - x_mean;
            num += dx * (y - y_mean);
            den += dx * dx;
        }

        let slope = if den == 0.0 { 0.0 } else { num / den };
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
        }
    }

    fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Trend and forecast engine over monthly spending
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    /// Minimum raw observations before forecasting
    min_data_points: usize,
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self {
            min_data_points: 30,
        }
    }

    pub fn with_min_data_points(min: usize) -> Self {
        Self {
            min_data_points: min,
        }
    }

    /// Map a confidence level to its z multiplier (95% and 99% are known).
    pub fn z_for_level(level: f64) -> Option<f64> {
        if (level - 0.95).abs() < 1e-9 {
            Some(1.96)
        } else if (level - 0.99).abs() < 1e-9 {
            Some(2.576)
        } else {
            None
        }
    }

    /// Fit the monthly series and project `periods` future months.
    ///
    /// The z multiplier is looked up for 95%/99% levels; other levels use
    /// the default (callers with a bespoke level should use
    /// [`fit_and_forecast_with_z`](Self::fit_and_forecast_with_z)).
    pub fn fit_and_forecast(
        &self,
        series: &[AmountRecord],
        periods: usize,
        confidence_level: f64,
    ) -> ForecastOutcome {
        let z = Self::z_for_level(confidence_level).unwrap_or(DEFAULT_Z);
        self.fit_and_forecast_with_z(series, periods, confidence_level, z)
    }

    /// Fit and forecast with a caller-supplied z multiplier.
    pub fn fit_and_forecast_with_z(
        &self,
        series: &[AmountRecord],
        periods: usize,
        confidence_level: f64,
        z: f64,
    ) -> ForecastOutcome {
        if series.len() < self.min_data_points {
            debug!(
                observations = series.len(),
                required = self.min_data_points,
                "insufficient data for forecasting"
            );
            return ForecastOutcome::InsufficientData {
                observations: series.len(),
                required: self.min_data_points,
            };
        }

        let buckets = monthly_buckets(series);
        if buckets.len() < 2 {
            return ForecastOutcome::InsufficientData {
                observations: series.len(),
                required: self.min_data_points,
            };
        }

        let totals: Vec<f64> = buckets.iter().map(|b| b.total).collect();
        let fit = LinearFit::fit(&totals);

        // Fit diagnostics on the observed buckets
        let residuals: Vec<f64> = totals
            .iter()
            .enumerate()
            .map(|(i, y)| y - fit.predict(i as f64))
            .collect();
        let residual_std_error = {
            let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
            (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / residuals.len() as f64)
                .sqrt()
        };
        let y_mean = totals.iter().sum::<f64>() / totals.len() as f64;
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let ss_tot: f64 = totals.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r_squared = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        let last = buckets[buckets.len() - 1];
        let (mut year, mut month) = (last.year, last.month);
        let mut points = Vec::with_capacity(periods);

        for i in 1..=periods {
            let idx = (buckets.len() - 1 + i) as f64;
            let predicted = fit.predict(idx).max(0.0);

            // Simplified interval proxy: 10% of the predicted value scaled
            // by z, not the residual variance. Downstream consumers depend
            // on this numeric behavior; do not swap in a residual-based
            // interval without coordinating.
            let margin = z * (0.1 * predicted);

            (year, month) = MonthlyBucket::next_month(year, month);
            points.push(ForecastPoint {
                month: format!("{:04}-{:02}", year, month),
                predicted_amount: predicted,
                lower_bound: (predicted - margin).max(0.0),
                upper_bound: predicted + margin,
                confidence_level,
            });
        }

        debug!(
            months = buckets.len(),
            periods,
            slope = fit.slope,
            "forecast complete"
        );

        ForecastOutcome::Forecast(ForecastReport {
            points,
            model: ModelInfo {
                training_months: buckets.len(),
                slope: fit.slope,
                intercept: fit.intercept,
                r_squared,
                residual_std_error,
            },
        })
    }

    /// Classify the spending trend from the monthly slope.
    pub fn detect_trend(&self, series: &[AmountRecord]) -> TrendOutcome {
        let buckets = monthly_buckets(series);
        if buckets.len() < MIN_TREND_BUCKETS {
            return TrendOutcome::InsufficientData {
                buckets: buckets.len(),
                required: MIN_TREND_BUCKETS,
            };
        }

        let totals: Vec<f64> = buckets.iter().map(|b| b.total).collect();
        let fit = LinearFit::fit(&totals);

        let direction = if fit.slope > TREND_SLOPE_THRESHOLD {
            TrendDirection::Increasing
        } else if fit.slope < -TREND_SLOPE_THRESHOLD {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        TrendOutcome::Trend(TrendReport {
            direction,
            slope: fit.slope,
            description: format!(
                "Spending is {} by ${:.2} per month",
                direction,
                fit.slope.abs()
            ),
        })
    }

    /// Forecast each category slug in the series separately.
    ///
    /// Records with no category are grouped under `other`.
    pub fn forecast_by_category(
        &self,
        series: &[AmountRecord],
        periods: usize,
        confidence_level: f64,
    ) -> BTreeMap<String, ForecastOutcome> {
        let mut by_category: BTreeMap<String, Vec<AmountRecord>> = BTreeMap::new();
        for record in series {
            let slug = record.category.clone().unwrap_or_else(|| "other".into());
            by_category.entry(slug).or_default().push(record.clone());
        }

        by_category
            .into_iter()
            .map(|(slug, records)| {
                let outcome = self.fit_and_forecast(&records, periods, confidence_level);
                (slug, outcome)
            })
            .collect()
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate the series into chronological calendar-month buckets.
///
/// Months between the first and last observation with no records become
/// zero-total buckets, so the regression index tracks real elapsed time.
fn monthly_buckets(series: &[AmountRecord]) -> Vec<MonthlyBucket> {
    if series.is_empty() {
        return Vec::new();
    }

    let mut totals: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in series {
        let key = (record.timestamp.year(), record.timestamp.month());
        *totals.entry(key).or_insert(0.0) += record.amount;
    }

    let (&first, _) = totals.iter().next().unwrap();
    let (&last, _) = totals.iter().next_back().unwrap();

    let mut buckets = Vec::new();
    let (mut year, mut month) = first;
    loop {
        buckets.push(MonthlyBucket {
            year,
            month,
            total: totals.get(&(year, month)).copied().unwrap_or(0.0),
        });
        if (year, month) == last {
            break;
        }
        (year, month) = MonthlyBucket::next_month(year, month);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// One record per day across `monthly_totals.len()` months starting at
    /// 2024-01, each month's records summing to the given total.
    fn monthly_series(monthly_totals: &[f64], records_per_month: usize) -> Vec<AmountRecord> {
        let mut series = Vec::new();
        for (i, total) in monthly_totals.iter().enumerate() {
            let year = 2024 + (i / 12) as i32;
            let month = (i % 12) as u32 + 1;
            for d in 0..records_per_month {
                series.push(AmountRecord::new(
                    ts(year, month, d as u32 + 1),
                    total / records_per_month as f64,
                ));
            }
        }
        series
    }

    #[test]
    fn test_insufficient_observations() {
        let engine = ForecastEngine::new();
        let series = monthly_series(&[100.0, 100.0], 5); // 10 records < 30

        let outcome = engine.fit_and_forecast(&series, 3, 0.95);
        assert!(matches!(
            outcome,
            ForecastOutcome::InsufficientData {
                observations: 10,
                required: 30
            }
        ));
    }

    #[test]
    fn test_forecast_continues_month_labels() {
        let engine = ForecastEngine::new();
        let series = monthly_series(&[100.0, 110.0, 120.0, 130.0, 140.0, 150.0], 6);

        let ForecastOutcome::Forecast(report) = engine.fit_and_forecast(&series, 2, 0.95) else {
            panic!("expected forecast");
        };

        assert_eq!(report.points.len(), 2);
        assert_eq!(report.points[0].month, "2024-07");
        assert_eq!(report.points[1].month, "2024-08");
        assert_eq!(report.model.training_months, 6);
    }

    #[test]
    fn test_forecast_non_negative_under_steep_decline() {
        let engine = ForecastEngine::new();
        let series = monthly_series(&[500.0, 400.0, 300.0, 200.0, 100.0, 0.0], 6);

        let ForecastOutcome::Forecast(report) = engine.fit_and_forecast(&series, 6, 0.95) else {
            panic!("expected forecast");
        };

        for point in &report.points {
            assert!(point.predicted_amount >= 0.0);
            assert!(point.lower_bound >= 0.0);
            assert!(point.upper_bound >= point.lower_bound);
        }
        // The fitted slope really is steeply negative
        assert!(report.model.slope < -TREND_SLOPE_THRESHOLD);
    }

    #[test]
    fn test_forecast_margin_is_tenth_of_prediction() {
        let engine = ForecastEngine::new();
        let series = monthly_series(&[100.0, 110.0, 120.0, 130.0, 140.0, 150.0], 6);

        let ForecastOutcome::Forecast(report) = engine.fit_and_forecast(&series, 1, 0.95) else {
            panic!("expected forecast");
        };

        let p = &report.points[0];
        let margin = 1.96 * 0.1 * p.predicted_amount;
        assert!((p.upper_bound - p.predicted_amount - margin).abs() < 1e-9);
        assert!((p.predicted_amount - p.lower_bound - margin).abs() < 1e-9);
    }

    #[test]
    fn test_z_for_level() {
        assert_eq!(ForecastEngine::z_for_level(0.95), Some(1.96));
        assert_eq!(ForecastEngine::z_for_level(0.99), Some(2.576));
        assert_eq!(ForecastEngine::z_for_level(0.8), None);
    }

    #[test]
    fn test_trend_boundary_slope_is_stable() {
        let engine = ForecastEngine::new();
        // Exact slope of 10 per month: boundary is exclusive
        let series = monthly_series(&[100.0, 110.0, 120.0], 2);

        let TrendOutcome::Trend(report) = engine.detect_trend(&series) else {
            panic!("expected trend");
        };
        assert_eq!(report.direction, TrendDirection::Stable);
        assert!((report.slope - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_directions() {
        let engine = ForecastEngine::new();

        let up = monthly_series(&[100.0, 150.0, 200.0], 2);
        let TrendOutcome::Trend(report) = engine.detect_trend(&up) else {
            panic!("expected trend");
        };
        assert_eq!(report.direction, TrendDirection::Increasing);
        assert!(report.description.contains("increasing"));

        let down = monthly_series(&[200.0, 150.0, 100.0], 2);
        let TrendOutcome::Trend(report) = engine.detect_trend(&down) else {
            panic!("expected trend");
        };
        assert_eq!(report.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_trend_needs_three_buckets() {
        let engine = ForecastEngine::new();
        let series = monthly_series(&[100.0, 120.0], 10);

        assert!(matches!(
            engine.detect_trend(&series),
            TrendOutcome::InsufficientData {
                buckets: 2,
                required: 3
            }
        ));
    }

    #[test]
    fn test_buckets_cross_year_boundary() {
        let series = vec![
            AmountRecord::new(ts(2023, 11, 5), 100.0),
            AmountRecord::new(ts(2023, 12, 5), 110.0),
            AmountRecord::new(ts(2024, 1, 5), 120.0),
        ];

        let buckets = monthly_buckets(&series);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].label(), "2023-11");
        assert_eq!(buckets[2].label(), "2024-01");
    }

    #[test]
    fn test_gap_months_bucketed_as_zero() {
        let series = vec![
            AmountRecord::new(ts(2024, 1, 5), 100.0),
            AmountRecord::new(ts(2024, 3, 5), 120.0),
        ];

        let buckets = monthly_buckets(&series);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[1].label(), "2024-02");
        assert_eq!(buckets[1].total, 0.0);
    }

    #[test]
    fn test_forecast_by_category_partitions() {
        let engine = ForecastEngine::with_min_data_points(6);
        let mut series = monthly_series(&[100.0, 110.0, 120.0], 4);
        for r in &mut series {
            r.category = Some("food".into());
        }
        // A second category with too little data
        series.push(AmountRecord {
            timestamp: ts(2024, 1, 10),
            amount: 50.0,
            category: Some("transportation".into()),
            merchant: None,
        });

        let results = engine.forecast_by_category(&series, 2, 0.95);
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results.get("food"),
            Some(ForecastOutcome::Forecast(_))
        ));
        assert!(matches!(
            results.get("transportation"),
            Some(ForecastOutcome::InsufficientData { .. })
        ));
    }
}
