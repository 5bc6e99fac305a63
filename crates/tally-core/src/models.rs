//! Domain models for Tally

use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Payment method detected on a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    DebitCard,
    CreditCard,
    Transfer,
    MobileWallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::DebitCard => "debit_card",
            Self::CreditCard => "credit_card",
            Self::Transfer => "transfer",
            Self::MobileWallet => "mobile_wallet",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "debit_card" | "debit" => Ok(Self::DebitCard),
            "credit_card" | "credit" => Ok(Self::CreditCard),
            "transfer" => Ok(Self::Transfer),
            "mobile_wallet" | "wallet" => Ok(Self::MobileWallet),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single line item extracted from a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub description: String,
    pub price: f64,
}

/// Structured fields extracted from one receipt's raw text
///
/// Every field except `raw_text` is optional: a missing field is a normal
/// extraction outcome, not an error. The caller decides whether the record is
/// usable via [`ReceiptRecord::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub date: Option<NaiveDateTime>,
    pub merchant: Option<String>,
    pub total: Option<f64>,
    pub items: Vec<ReceiptItem>,
    pub payment_method: Option<PaymentMethod>,
    pub raw_text: String,
}

/// Soft-invariant flags raised during receipt validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFlags {
    /// Date is in the future relative to validation time
    pub future_date: bool,
    /// Date is more than 365 days in the past
    pub stale_date: bool,
}

impl ReceiptRecord {
    /// Parse confidence for this record.
    ///
    /// Weighted sum of structural evidence: date 0.3, positive total 0.4,
    /// merchant 0.2, any items 0.1, capped at 1.0. A valid total is the
    /// single most important signal for downstream usefulness.
    pub fn confidence(&self) -> f64 {
        let mut confidence: f64 = 0.0;

        if self.date.is_some() {
            confidence += 0.3;
        }
        if matches!(self.total, Some(t) if t > 0.0) {
            confidence += 0.4;
        }
        if self.merchant.is_some() {
            confidence += 0.2;
        }
        if !self.items.is_empty() {
            confidence += 0.1;
        }

        confidence.min(1.0)
    }

    /// Validate the record against the current wall clock.
    pub fn validate(&self) -> Result<ValidationFlags> {
        self.validate_at(Utc::now().naive_utc())
    }

    /// Validate the record relative to `now`.
    ///
    /// A record is usable only if the total is present and positive; anything
    /// else is a rejected input. Date problems are soft: a future date or a
    /// date older than a year is flagged and logged but does not invalidate
    /// the record.
    pub fn validate_at(&self, now: NaiveDateTime) -> Result<ValidationFlags> {
        let total = self
            .total
            .ok_or_else(|| Error::InvalidData("receipt has no total amount".into()))?;

        if total <= 0.0 {
            return Err(Error::InvalidData(format!(
                "receipt total must be positive, got {}",
                total
            )));
        }

        let mut flags = ValidationFlags::default();

        if let Some(date) = self.date {
            if date > now {
                warn!(date = %date, "receipt date is in the future");
                flags.future_date = true;
            } else if now - date > Duration::days(365) {
                warn!(date = %date, "receipt date is more than a year old");
                flags.stale_date = true;
            }
        }

        Ok(flags)
    }
}

/// One historical amount observation for a user
///
/// Supplied by the external persistence collaborator; the core never stores
/// these itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountRecord {
    pub timestamp: NaiveDateTime,
    pub amount: f64,
    pub category: Option<String>,
    pub merchant: Option<String>,
}

impl AmountRecord {
    pub fn new(timestamp: NaiveDateTime, amount: f64) -> Self {
        Self {
            timestamp,
            amount,
            category: None,
            merchant: None,
        }
    }
}

/// A statistically unusual transaction, recomputed per detection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// Index of the record in the supplied series
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub merchant: Option<String>,
    pub amount: f64,
    /// Population mean the amount was compared against
    pub mean: f64,
    pub z_score: f64,
    /// Absolute deviation from the mean
    pub deviation: f64,
}

/// One projected month of spending with uncertainty bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Month label in `YYYY-MM` form
    pub month: String,
    pub predicted_amount: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_level: f64,
}

/// Direction of the fitted spending trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fitted trend over a user's monthly spending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    /// Currency units per month
    pub slope: f64,
    pub description: String,
}

/// A labeled training sample for classifier retraining
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub merchant: Option<String>,
    pub description: Option<String>,
    /// Confirmed category slug
    pub category: String,
}

impl LabeledSample {
    /// Combined lower-cased text for this sample, or None if both fields are
    /// empty.
    pub fn text(&self) -> Option<String> {
        let combined = [self.merchant.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let trimmed = combined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        }
    }
}
