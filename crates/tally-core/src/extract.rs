//! Receipt field extraction from raw OCR text
//!
//! Turns unstructured OCR output into a [`ReceiptRecord`]:
//! - Date: ordered list of date-shaped patterns, first successful parse wins
//! - Total: all amount-shaped candidates collected, maximum value returned
//! - Merchant: uppercase-line heuristic, then known-name lookup, then first line
//! - Items: full-line "description + trailing amount" matches
//! - Payment method: fixed keyword table, first match wins
//!
//! Absent fields are normal outcomes, not errors; the parse confidence on the
//! record tells the caller how much structure was recovered.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};

use crate::models::{PaymentMethod, ReceiptItem, ReceiptRecord};

/// Known merchant name substrings, matched case-insensitively in the header
/// lines when no uppercase line is found.
const KNOWN_MERCHANTS: &[&str] = &[
    "walmart",
    "target",
    "costco",
    "kroger",
    "safeway",
    "whole foods",
    "trader joe",
    "walgreens",
    "cvs",
    "starbucks",
    "mcdonalds",
    "burger king",
    "home depot",
    "best buy",
    "ikea",
];

/// Payment method keyword table, scanned in declaration order.
const PAYMENT_KEYWORDS: &[(PaymentMethod, &[&str])] = &[
    (PaymentMethod::Cash, &["cash", "efectivo"]),
    (PaymentMethod::Card, &["tarjeta", "visa", "mastercard", "card"]),
    (PaymentMethod::DebitCard, &["debit", "debito"]),
    (PaymentMethod::CreditCard, &["credit", "credito"]),
    (PaymentMethod::Transfer, &["transfer", "transferencia"]),
    (
        PaymentMethod::MobileWallet,
        &["apple pay", "google pay", "paypal", "venmo"],
    ),
];

/// Receipt field extractor with pre-compiled patterns
pub struct ReceiptExtractor {
    date_patterns: Vec<Regex>,
    total_patterns: Vec<Regex>,
    currency_fallback: Regex,
    item_pattern: Regex,
}

impl ReceiptExtractor {
    pub fn new() -> Self {
        // Patterns are fixed string literals; compilation cannot fail at
        // runtime with user input, so unwrap here is equivalent to a
        // compile-time assertion (exercised by tests).
        let date_patterns = vec![
            Regex::new(r"\b(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})\b").unwrap(),
            Regex::new(r"\b(\d{1,2}\s+[a-z]+\s+\d{4})\b").unwrap(),
        ];

        let total_patterns = vec![
            Regex::new(r"(?i)total[:\s]+\$?\s*([0-9]+[.,][0-9]{2})").unwrap(),
            Regex::new(r"(?i)amount[:\s]+\$?\s*([0-9]+[.,][0-9]{2})").unwrap(),
            Regex::new(r"[$€]\s*([0-9]+[.,][0-9]{2})").unwrap(),
            Regex::new(r"([0-9]+[.,][0-9]{2})\s*[$€]").unwrap(),
        ];
        let currency_fallback = Regex::new(r"([0-9]+[.,][0-9]{2})").unwrap();

        let item_pattern = Regex::new(r"^(.+?)\s+(\d+[.,]\d{2})\s*€?$").unwrap();

        Self {
            date_patterns,
            total_patterns,
            currency_fallback,
            item_pattern,
        }
    }

    /// Parse raw OCR text into a structured receipt record.
    ///
    /// Never fails: fields that cannot be recovered are left empty and the
    /// record's confidence reflects what was found.
    pub fn parse(&self, text: &str) -> ReceiptRecord {
        let record = ReceiptRecord {
            date: self.extract_date(text),
            merchant: self.extract_merchant(text),
            total: self.extract_total(text),
            items: self.extract_items(text),
            payment_method: self.extract_payment_method(text),
            raw_text: text.to_string(),
        };

        debug!(
            merchant = ?record.merchant,
            total = ?record.total,
            items = record.items.len(),
            confidence = record.confidence(),
            "parsed receipt"
        );

        record
    }

    /// Extract the receipt date.
    ///
    /// Tries the patterns in order against lower-cased text; the first match
    /// that parses into a calendar date wins. None is an absent field, not an
    /// error.
    pub fn extract_date(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.to_lowercase();

        for pattern in &self.date_patterns {
            for caps in pattern.captures_iter(&text) {
                if let Some(date) = parse_date_str(&caps[1]) {
                    return Some(date);
                }
            }
        }

        warn!("could not extract date from receipt");
        None
    }

    /// Extract the total amount.
    ///
    /// Collects all amount-shaped candidates from the pattern list and
    /// returns the maximum: the total is the largest monetary figure on a
    /// receipt, line items and taxes being smaller parts of it.
    pub fn extract_total(&self, text: &str) -> Option<f64> {
        let mut amounts = Vec::new();

        for pattern in &self.total_patterns {
            for caps in pattern.captures_iter(text) {
                if let Ok(amount) = caps[1].replace(',', ".").parse::<f64>() {
                    amounts.push(amount);
                }
            }
        }

        if amounts.is_empty() {
            // Broader sweep: any bare currency-shaped number
            for caps in self.currency_fallback.captures_iter(text) {
                if let Ok(amount) = caps[1].replace(',', ".").parse::<f64>() {
                    amounts.push(amount);
                }
            }
        }

        let max = amounts.into_iter().fold(None, |acc: Option<f64>, x| {
            Some(acc.map_or(x, |a| a.max(x)))
        });

        if max.is_none() {
            warn!("could not extract total amount from receipt");
        }
        max
    }

    /// Extract the merchant name from the header lines.
    pub fn extract_merchant(&self, text: &str) -> Option<String> {
        let lines: Vec<&str> = text.lines().collect();

        for line in lines.iter().take(5) {
            let line = line.trim();

            // Uppercase lines are the most common merchant signature
            if line.len() > 3 && is_uppercase_line(line) {
                let cleaned: String = line
                    .chars()
                    .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
                    .collect();
                let cleaned = cleaned.trim();
                if cleaned.len() > 3 {
                    return Some(cleaned.to_string());
                }
            }

            let line_lower = line.to_lowercase();
            for merchant in KNOWN_MERCHANTS {
                if line_lower.contains(merchant) {
                    return Some(merchant.to_uppercase());
                }
            }
        }

        // Last resort: first non-empty line, truncated
        for line in &lines {
            let line = line.trim();
            if line.len() > 3 {
                return Some(line.chars().take(50).collect());
            }
        }

        None
    }

    /// Extract line items: a line either fully matches
    /// "description + trailing amount" or is skipped.
    pub fn extract_items(&self, text: &str) -> Vec<ReceiptItem> {
        let mut items = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            let Some(caps) = self.item_pattern.captures(line) else {
                continue;
            };

            let description = caps[1].trim().to_string();
            if let Ok(price) = caps[2].replace(',', ".").parse::<f64>() {
                items.push(ReceiptItem { description, price });
            }
        }

        items
    }

    /// Extract the payment method by keyword lookup, first match wins.
    pub fn extract_payment_method(&self, text: &str) -> Option<PaymentMethod> {
        let text_lower = text.to_lowercase();

        for (method, keywords) in PAYMENT_KEYWORDS {
            for keyword in *keywords {
                if text_lower.contains(keyword) {
                    return Some(*method);
                }
            }
        }

        None
    }
}

impl Default for ReceiptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// True if the line reads as an all-uppercase header (has letters and no
/// lowercase ones).
fn is_uppercase_line(line: &str) -> bool {
    line.chars().any(|c| c.is_alphabetic()) && !line.chars().any(|c| c.is_lowercase())
}

/// Parse a captured date string into a datetime at midnight.
///
/// Numeric forms are read day-first (receipts outside the US dominate the
/// training corpus); if the day slot exceeds 12 the month-first reading is
/// tried instead. Two-digit years pivot to 20xx.
fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    // Numeric: d/m/y or d-m-y
    let parts: Vec<&str> = s.split(['/', '-']).collect();
    if parts.len() == 3 {
        let a: u32 = parts[0].parse().ok()?;
        let b: u32 = parts[1].parse().ok()?;
        let mut year: i32 = parts[2].parse().ok()?;
        if year < 100 {
            year += 2000;
        }

        let date = NaiveDate::from_ymd_opt(year, b, a) // day-first
            .or_else(|| NaiveDate::from_ymd_opt(year, a, b))?;
        return date.and_hms_opt(0, 0, 0);
    }

    // Textual: "12 march 2024"
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() == 3 {
        let day: u32 = words[0].parse().ok()?;
        let month = month_from_name(words[1])?;
        let year: i32 = words[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0);
    }

    None
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: &[&str] = &[
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];

    MONTHS
        .iter()
        .position(|m| m.starts_with(name) && name.len() >= 3)
        .map(|i| i as u32 + 1)
}
