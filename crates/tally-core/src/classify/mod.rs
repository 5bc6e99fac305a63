//! Hybrid category classification
//!
//! Two-stage strategy over a combined merchant + description string:
//! 1. Rule stage: keyword scoring against the category table. Deterministic
//!    and explainable; trusted outright when its confidence clears 0.8.
//! 2. Statistical stage: the naive Bayes model. Used when keyword evidence is
//!    weak, but a low-confidence model prediction loses to any keyword signal
//!    at all, and a model failure falls back to the rule result.
//!
//! The trained model is the only process-wide shared state in the pipeline.
//! It sits behind `RwLock<Arc<BayesModel>>`: readers clone the `Arc` and
//! never block each other, retraining builds a whole new model off-lock and
//! swaps the handle, so a reader sees either the old or the new model and
//! never a partial one.

mod bayes;
mod store;

pub use bayes::BayesModel;
pub use store::SnapshotStore;

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::categories::{CategoryLabel, CategoryTable};
use crate::error::Result;
use crate::models::LabeledSample;

/// Rule-stage confidence above which the statistical stage is skipped
const RULE_TRUST_THRESHOLD: f64 = 0.8;

/// Statistical confidence below which any rule signal is preferred
const MODEL_DOUBT_THRESHOLD: f64 = 0.5;

/// A category assignment with its blended confidence
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub category: CategoryLabel,
    pub confidence: f64,
}

/// Outcome of a retrain request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// Model was replaced and a snapshot write attempted
    Retrained { samples: usize },
    /// Fewer usable samples than the configured minimum; nothing changed
    InsufficientData { provided: usize, required: usize },
}

/// The hybrid rule + statistical classifier
pub struct HybridClassifier {
    table: CategoryTable,
    model: RwLock<Arc<BayesModel>>,
    store: Option<SnapshotStore>,
    min_training_samples: usize,
}

impl HybridClassifier {
    /// Build a classifier with no persistence, bootstrapped from the
    /// category keyword table.
    pub fn bootstrap(table: CategoryTable) -> Result<Self> {
        let model = bootstrap_model(&table)?;
        Ok(Self {
            table,
            model: RwLock::new(Arc::new(model)),
            store: None,
            min_training_samples: 10,
        })
    }

    /// Build a classifier backed by a snapshot store: the persisted model is
    /// loaded if present, otherwise the bootstrap model is fitted (and not
    /// saved until the first retrain).
    pub fn with_store(table: CategoryTable, store: SnapshotStore) -> Result<Self> {
        let model = match store.load()? {
            Some(model) => model,
            None => {
                info!("no usable model snapshot, bootstrapping from keyword table");
                bootstrap_model(&table)?
            }
        };

        Ok(Self {
            table,
            model: RwLock::new(Arc::new(model)),
            store: Some(store),
            min_training_samples: 10,
        })
    }

    pub fn with_min_training_samples(mut self, min: usize) -> Self {
        self.min_training_samples = min;
        self
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    fn current_model(&self) -> Arc<BayesModel> {
        self.model.read().unwrap().clone()
    }

    /// Classify a text fragment into a category.
    ///
    /// Always returns a complete result: worst case is the `other` fallback
    /// with low confidence. Never fails.
    pub fn classify(
        &self,
        text: &str,
        merchant: Option<&str>,
        description: Option<&str>,
    ) -> ClassificationResult {
        let combined = combine_text(text, merchant, description);

        let (rule_category, rule_confidence) = self.classify_by_rules(&combined);

        // Strong keyword evidence beats a statistical guess
        if rule_confidence > RULE_TRUST_THRESHOLD {
            debug!(category = %rule_category, confidence = rule_confidence, "rule stage short-circuit");
            return ClassificationResult {
                category: rule_category,
                confidence: rule_confidence,
            };
        }

        match self.current_model().predict(&combined) {
            Ok(probs) if !probs.is_empty() => {
                let (slug, confidence) = &probs[0];

                // A hesitant model loses to any keyword signal at all
                if *confidence < MODEL_DOUBT_THRESHOLD && rule_confidence > 0.0 {
                    return ClassificationResult {
                        category: rule_category,
                        confidence: rule_confidence,
                    };
                }

                let category = self
                    .table
                    .label(slug)
                    .unwrap_or_else(|| self.table.other());
                ClassificationResult {
                    category,
                    confidence: *confidence,
                }
            }
            result => {
                if let Err(e) = result {
                    warn!(error = %e, "statistical stage failed, using rule fallback");
                }
                if rule_confidence > 0.0 {
                    ClassificationResult {
                        category: rule_category,
                        confidence: rule_confidence,
                    }
                } else {
                    ClassificationResult {
                        category: self.table.other(),
                        confidence: 0.3,
                    }
                }
            }
        }
    }

    /// Rank categories for a text by model probability, descending.
    ///
    /// Falls back to the single rule-based guess if the model cannot
    /// predict.
    pub fn suggest(&self, text: &str, top_n: usize) -> Vec<(CategoryLabel, f64)> {
        let text = text.to_lowercase();

        match self.current_model().predict(&text) {
            Ok(probs) => probs
                .into_iter()
                .take(top_n)
                .filter_map(|(slug, p)| self.table.label(&slug).map(|l| (l, p)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "suggestion model failed, using rule fallback");
                let (category, confidence) = self.classify_by_rules(&text);
                vec![(category, confidence)]
            }
        }
    }

    /// Rule stage: keyword occurrence scoring.
    ///
    /// Exact full-string match scores 3, substring containment scores 1;
    /// the highest-scoring category wins with confidence
    /// `min(0.5 + 0.2 * matches, 1.0)`. No matches is (`other`, 0.0).
    pub fn classify_by_rules(&self, text: &str) -> (CategoryLabel, f64) {
        let text = text.to_lowercase();
        let trimmed = text.trim();

        let mut best: Option<CategoryLabel> = None;
        let mut max_matches = 0u32;

        for category in self.table.iter() {
            let mut matches = 0u32;

            for keyword in &category.keywords {
                let keyword = keyword.to_lowercase();
                if keyword == trimmed {
                    matches += 3;
                } else if text.contains(&keyword) {
                    matches += 1;
                }
            }

            if matches > max_matches {
                max_matches = matches;
                best = self.table.label(&category.slug);
            }
        }

        match best {
            Some(category) if max_matches > 0 => {
                let confidence = (0.5 + f64::from(max_matches) * 0.2).min(1.0);
                (category, confidence)
            }
            _ => (self.table.other(), 0.0),
        }
    }

    /// Retrain the model from user-confirmed samples.
    ///
    /// Fewer than the configured minimum of usable samples is a logged no-op,
    /// not an error. On success the in-memory model is swapped first; a
    /// snapshot write failure afterwards is logged but does not roll the
    /// swap back; the retrained model stays authoritative for this process.
    pub fn train_with_user_data(&self, samples: &[LabeledSample]) -> Result<TrainingOutcome> {
        let mut rows: Vec<(String, String)> = Vec::with_capacity(samples.len());

        for sample in samples {
            if self.table.get(&sample.category).is_none() {
                warn!(category = %sample.category, "skipping sample with unknown category slug");
                continue;
            }
            if let Some(text) = sample.text() {
                rows.push((text, sample.category.clone()));
            }
        }

        if rows.len() < self.min_training_samples {
            warn!(
                provided = rows.len(),
                required = self.min_training_samples,
                "insufficient data for retraining"
            );
            return Ok(TrainingOutcome::InsufficientData {
                provided: rows.len(),
                required: self.min_training_samples,
            });
        }

        let model = BayesModel::fit(&rows)?;
        let model = Arc::new(model);

        *self.model.write().unwrap() = model.clone();
        info!(samples = rows.len(), "classifier model retrained");

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&model) {
                warn!(error = %e, "model snapshot write failed; in-memory model remains active");
            }
        }

        Ok(TrainingOutcome::Retrained {
            samples: rows.len(),
        })
    }
}

/// Combine the classification inputs into one lower-cased string.
fn combine_text(text: &str, merchant: Option<&str>, description: Option<&str>) -> String {
    [Some(text), merchant, description]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fit the bootstrap model from the keyword table alone.
///
/// Each keyword plus two templated variants becomes a synthetic training
/// row, so the classifier is never untrained even on first run.
fn bootstrap_model(table: &CategoryTable) -> Result<BayesModel> {
    let mut rows = Vec::new();

    for category in table.iter() {
        for keyword in &category.keywords {
            rows.push((keyword.clone(), category.slug.clone()));
            rows.push((format!("purchase at {}", keyword), category.slug.clone()));
            rows.push((format!("{} store", keyword), category.slug.clone()));
        }
    }

    let model = BayesModel::fit(&rows)?;
    info!(
        classes = model.class_count(),
        rows = rows.len(),
        "bootstrap model fitted from keyword table"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> HybridClassifier {
        HybridClassifier::bootstrap(CategoryTable::builtin()).unwrap()
    }

    fn samples(pairs: &[(&str, &str)]) -> Vec<LabeledSample> {
        pairs
            .iter()
            .map(|(m, c)| LabeledSample {
                merchant: Some(m.to_string()),
                description: None,
                category: c.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_rule_short_circuit_on_exact_keyword() {
        let c = classifier();

        // Exact full-string match scores 3 => confidence 0.5 + 0.6 = 1.0,
        // which bypasses the statistical stage entirely.
        let result = c.classify("walmart", None, None);
        let rule = c.classify_by_rules("walmart");

        assert_eq!(result.category.as_str(), "food");
        assert!(result.confidence >= 0.8);
        assert_eq!(result.category, rule.0);
        assert!((result.confidence - rule.1).abs() < 1e-9);
    }

    #[test]
    fn test_rule_stage_zero_matches_is_other() {
        let c = classifier();
        let (category, confidence) = c.classify_by_rules("xyzzy plugh");
        assert_eq!(category.as_str(), "other");
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_rule_stage_substring_scoring() {
        let c = classifier();
        let (category, confidence) = c.classify_by_rules("dinner at a restaurant bar");
        assert_eq!(category.as_str(), "food");
        // restaurant + bar = 2 containment matches
        assert!((confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let c = classifier();
        let a = c.classify("uber trip downtown", None, None);
        let b = c.classify("uber trip downtown", None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_low_signal_fallback_bounded() {
        let c = classifier();
        // No keyword matches and nothing the model was trained on
        let result = c.classify("zzqp vvxw", None, None);
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn test_classify_combines_merchant_and_description() {
        let c = classifier();
        let result = c.classify("", Some("STARBUCKS"), Some("morning coffee"));
        assert_eq!(result.category.as_str(), "food");
    }

    #[test]
    fn test_suggest_ranks_all_categories() {
        let c = classifier();
        let suggestions = c.suggest("netflix subscription", 3);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].0.as_str(), "entertainment");
        // Descending order
        assert!(suggestions[0].1 >= suggestions[1].1);
        assert!(suggestions[1].1 >= suggestions[2].1);
    }

    #[test]
    fn test_train_requires_minimum_samples() {
        let c = classifier();
        let few = samples(&[("walmart", "food"); 9]);
        let outcome = c.train_with_user_data(&few).unwrap();
        assert!(matches!(
            outcome,
            TrainingOutcome::InsufficientData {
                provided: 9,
                required: 10
            }
        ));
    }

    #[test]
    fn test_train_skips_unknown_category_slugs() {
        let c = classifier();
        let mixed = samples(&[
            ("walmart", "food"),
            ("kroger", "food"),
            ("safeway", "food"),
            ("shell", "transportation"),
            ("uber", "transportation"),
            ("netflix", "entertainment"),
            ("spotify", "entertainment"),
            ("cvs", "health"),
            ("gym", "health"),
            ("mystery shop", "not_a_category"),
        ]);
        // Only 9 usable after the unknown slug is dropped
        let outcome = c.train_with_user_data(&mixed).unwrap();
        assert!(matches!(outcome, TrainingOutcome::InsufficientData { provided: 9, .. }));
    }

    #[test]
    fn test_train_replaces_model() {
        let c = classifier();
        let data = samples(&[
            ("acme tutoring", "education"),
            ("acme tutoring llc", "education"),
            ("acme tutoring center", "education"),
            ("acme tutoring online", "education"),
            ("walmart", "food"),
            ("kroger", "food"),
            ("shell", "transportation"),
            ("uber", "transportation"),
            ("netflix", "entertainment"),
            ("cvs pharmacy", "health"),
        ]);

        let outcome = c.train_with_user_data(&data).unwrap();
        assert!(matches!(outcome, TrainingOutcome::Retrained { samples: 10 }));

        let result = c.classify("acme tutoring", None, None);
        assert_eq!(result.category.as_str(), "education");
    }

    #[test]
    fn test_snapshot_round_trip_preserves_outputs() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("classifier.json"));

        let table = CategoryTable::builtin();
        let c = HybridClassifier::with_store(table.clone(), store.clone()).unwrap();

        let data = samples(&[
            ("corner bakery", "food"),
            ("corner bakery cafe", "food"),
            ("city metro pass", "transportation"),
            ("city parking garage", "transportation"),
            ("rent may", "housing"),
            ("rent june", "housing"),
            ("cvs pharmacy", "health"),
            ("steam games", "entertainment"),
            ("campus bookstore", "education"),
            ("amazon order", "shopping"),
        ]);
        c.train_with_user_data(&data).unwrap();

        let held_out = [
            "corner bakery",
            "city metro pass",
            "rent may",
            "steam games",
            "completely unknown merchant",
        ];
        let before: Vec<_> = held_out
            .iter()
            .map(|t| c.classify(t, None, None))
            .collect();

        // A fresh classifier loading the persisted snapshot must agree
        let reloaded = HybridClassifier::with_store(table, store).unwrap();
        let after: Vec<_> = held_out
            .iter()
            .map(|t| reloaded.classify(t, None, None))
            .collect();

        assert_eq!(before, after);
    }
}
