//! Text normalization for OCR output and merchant strings
//!
//! Every other component consumes these helpers: the extractor cleans raw
//! OCR text before pattern matching, the classifier tokenizes combined text
//! for its vectorizer, and merchant names are canonicalized before display
//! or keyword lookup.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Corporate suffixes stripped from merchant names
const MERCHANT_SUFFIXES: &[&str] = &[
    "S.L.U.", "S.L.", "S.A.", "SLU", "SL", "SA", "LTD", "INC", "CORP", "LLC",
];

/// Common English stop words excluded from classifier tokens
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to", "with",
];

/// Clean text by normalizing unicode, dropping control characters, and
/// collapsing whitespace.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let normalized: String = text.nfkd().filter(|c| !c.is_control()).collect();

    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove accents/diacritics via NFKD decomposition.
pub fn strip_accents(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonicalize a merchant/business name: uppercase, cleaned, corporate
/// suffixes removed.
pub fn normalize_merchant_name(merchant: &str) -> String {
    if merchant.is_empty() {
        return String::new();
    }

    let mut name = clean_text(&strip_accents(merchant)).to_uppercase();

    for suffix in MERCHANT_SUFFIXES {
        name = name.replace(suffix, "");
    }

    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase word tokens with stop words removed.
///
/// Splits on any non-alphanumeric character, so "NETFLIX.COM/BILL" yields
/// ["netflix", "com", "bill"].
pub fn tokenize(text: &str) -> Vec<String> {
    strip_accents(text)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Extract all numbers from a string, normalizing `,` decimal separators.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            current.push(c);
        } else if !current.is_empty() {
            if let Ok(n) = current.replace(',', ".").parse::<f64>() {
                numbers.push(n);
            }
            current.clear();
        }
    }

    if !current.is_empty() {
        if let Ok(n) = current.replace(',', ".").parse::<f64>() {
            numbers.push(n);
        }
    }

    numbers
}
