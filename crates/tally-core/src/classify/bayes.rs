//! Multinomial naive Bayes text model
//!
//! The statistical stage of the hybrid classifier: unigram + bigram token
//! counts with Laplace smoothing over a closed class set. State lives in
//! ordered maps so that fitting the same rows always produces the same model
//! and prediction is deterministic, which the snapshot round-trip depends on.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize;

/// A fitted multinomial naive Bayes model over n-gram features
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BayesModel {
    /// Per-class token counts
    token_counts: BTreeMap<String, BTreeMap<String, u64>>,
    /// Total token count per class
    class_totals: BTreeMap<String, u64>,
    /// Training document count per class
    class_docs: BTreeMap<String, u64>,
    /// All features seen during fitting
    vocabulary: BTreeSet<String>,
    /// Total training documents
    total_docs: u64,
}

impl BayesModel {
    /// Fit a fresh model from (text, class) rows.
    pub fn fit(rows: &[(String, String)]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Training("no training rows".into()));
        }

        let mut model = Self::default();

        for (text, class) in rows {
            let features = featurize(text);
            if features.is_empty() {
                continue;
            }

            *model.class_docs.entry(class.clone()).or_insert(0) += 1;
            model.total_docs += 1;

            let counts = model.token_counts.entry(class.clone()).or_default();
            for feature in features {
                *counts.entry(feature.clone()).or_insert(0) += 1;
                *model.class_totals.entry(class.clone()).or_insert(0) += 1;
                model.vocabulary.insert(feature);
            }
        }

        if model.total_docs == 0 {
            return Err(Error::Training("no usable training rows".into()));
        }

        Ok(model)
    }

    /// Number of classes the model knows.
    pub fn class_count(&self) -> usize {
        self.class_docs.len()
    }

    /// Training documents the model was fitted on.
    pub fn training_docs(&self) -> u64 {
        self.total_docs
    }

    /// Predict a probability distribution over classes for `text`, sorted
    /// descending by probability (class name breaks ties, so output is
    /// stable).
    ///
    /// Tokens outside the fitted vocabulary are ignored; a text with no
    /// known tokens still gets a distribution from the class priors alone.
    pub fn predict(&self, text: &str) -> Result<Vec<(String, f64)>> {
        if self.class_docs.is_empty() {
            return Err(Error::Prediction("model has no classes".into()));
        }

        let features: Vec<String> = featurize(text)
            .into_iter()
            .filter(|f| self.vocabulary.contains(f))
            .collect();

        let vocab_size = self.vocabulary.len() as f64;
        let mut log_scores: Vec<(String, f64)> = Vec::with_capacity(self.class_docs.len());

        for (class, docs) in &self.class_docs {
            let prior = (*docs as f64 / self.total_docs as f64).ln();
            let class_total = *self.class_totals.get(class).unwrap_or(&0) as f64;
            let counts = self.token_counts.get(class);

            let mut score = prior;
            for feature in &features {
                let count = counts
                    .and_then(|c| c.get(feature))
                    .copied()
                    .unwrap_or(0) as f64;
                // Laplace smoothing
                score += ((count + 1.0) / (class_total + vocab_size)).ln();
            }

            log_scores.push((class.clone(), score));
        }

        // Log scores to a normalized distribution (log-sum-exp)
        let max = log_scores
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut probs: Vec<(String, f64)> = log_scores
            .into_iter()
            .map(|(c, s)| (c, (s - max).exp()))
            .collect();
        let sum: f64 = probs.iter().map(|(_, p)| *p).sum();
        for (_, p) in &mut probs {
            *p /= sum;
        }

        probs.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(probs)
    }
}

/// Unigram + bigram features from normalized tokens.
fn featurize(text: &str) -> Vec<String> {
    let tokens = normalize::tokenize(text);
    let mut features = tokens.clone();

    for pair in tokens.windows(2) {
        features.push(format!("{} {}", pair[0], pair[1]));
    }

    features
}
