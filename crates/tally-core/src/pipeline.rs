//! Pipeline orchestration
//!
//! Sequences the core components for the surrounding request-handling layer:
//! extractor → classifier → optional persistence hand-off for receipts, and
//! detector → trend → forecast for historical series. The orchestrator is a
//! pure transformation over data supplied by its collaborators and holds no
//! persistent state of its own (the classifier's model handle is the only
//! process-wide state, and the classifier owns it).

use tracing::info;

use crate::anomaly;
use crate::categories::CategoryTable;
use crate::classify::{ClassificationResult, HybridClassifier, SnapshotStore, TrainingOutcome};
use crate::error::Result;
use crate::extract::ReceiptExtractor;
use crate::forecast::{ForecastEngine, ForecastOutcome, TrendOutcome};
use crate::models::{AmountRecord, Anomaly, LabeledSample, ReceiptRecord, ValidationFlags};

/// Configuration inputs consumed by the core pipeline
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Minimum labeled samples before a retrain takes effect
    pub min_training_samples: usize,
    /// Minimum raw observations before forecasting
    pub min_forecast_points: usize,
    /// Months to project when the caller does not say
    pub default_forecast_periods: usize,
    /// Confidence level for forecast bounds
    pub default_confidence_level: f64,
    /// Z-score threshold for anomaly detection
    pub anomaly_threshold: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            min_training_samples: 10,
            min_forecast_points: 30,
            default_forecast_periods: 3,
            default_confidence_level: 0.95,
            anomaly_threshold: 3.0,
        }
    }
}

/// A receipt after extraction and classification
#[derive(Debug, Clone)]
pub struct ProcessedReceipt {
    pub record: ReceiptRecord,
    pub classification: ClassificationResult,
    /// Structural parse confidence of the record (weights in
    /// [`ReceiptRecord::confidence`]); independent of the classification
    /// confidence
    pub parse_confidence: f64,
    /// Whether the record passed validation (present positive total)
    pub usable: bool,
    pub flags: ValidationFlags,
}

/// Combined analysis of a historical amount series
#[derive(Debug, Clone)]
pub struct HistoryAnalysis {
    pub anomalies: Vec<Anomaly>,
    pub trend: TrendOutcome,
    pub forecast: ForecastOutcome,
}

/// External persistence collaborator for derived receipt records.
///
/// The core never owns storage; callers that want a processed receipt kept
/// implement this and hand it to [`Pipeline::persist_to`].
pub trait RecordSink {
    fn store_receipt(&self, receipt: &ProcessedReceipt) -> Result<()>;
}

/// The expense intelligence pipeline
pub struct Pipeline {
    extractor: ReceiptExtractor,
    classifier: HybridClassifier,
    engine: ForecastEngine,
    config: CoreConfig,
}

impl Pipeline {
    /// Build a pipeline with no model persistence (bootstrap classifier).
    pub fn new(table: CategoryTable, config: CoreConfig) -> Result<Self> {
        let classifier = HybridClassifier::bootstrap(table)?
            .with_min_training_samples(config.min_training_samples);
        Ok(Self::assemble(classifier, config))
    }

    /// Build a pipeline whose classifier model persists across restarts.
    pub fn with_store(table: CategoryTable, store: SnapshotStore, config: CoreConfig) -> Result<Self> {
        let classifier = HybridClassifier::with_store(table, store)?
            .with_min_training_samples(config.min_training_samples);
        Ok(Self::assemble(classifier, config))
    }

    fn assemble(classifier: HybridClassifier, config: CoreConfig) -> Self {
        let engine = ForecastEngine::with_min_data_points(config.min_forecast_points);
        Self {
            extractor: ReceiptExtractor::new(),
            classifier,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn classifier(&self) -> &HybridClassifier {
        &self.classifier
    }

    /// Run raw OCR text through extraction and classification.
    ///
    /// Always produces a complete result: missing fields lower the parse
    /// confidence and unclassifiable text lands in `other`, but nothing
    /// here fails on bad input.
    pub fn process_receipt(&self, raw_text: &str) -> ProcessedReceipt {
        let record = self.extractor.parse(raw_text);

        let merchant = record.merchant.clone().unwrap_or_default();
        let item_text = record
            .items
            .iter()
            .map(|i| i.description.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let classification = self.classifier.classify(
            &merchant,
            record.merchant.as_deref(),
            if item_text.is_empty() {
                None
            } else {
                Some(&item_text)
            },
        );

        let parse_confidence = record.confidence();
        let (usable, flags) = match record.validate() {
            Ok(flags) => (true, flags),
            Err(_) => (false, ValidationFlags::default()),
        };

        info!(
            merchant = ?record.merchant,
            category = %classification.category,
            parse_confidence,
            usable,
            "receipt processed"
        );

        ProcessedReceipt {
            record,
            classification,
            parse_confidence,
            usable,
            flags,
        }
    }

    /// Hand a processed receipt to the external persistence collaborator.
    pub fn persist_to(&self, sink: &dyn RecordSink, receipt: &ProcessedReceipt) -> Result<()> {
        sink.store_receipt(receipt)
    }

    /// Analyze a user's historical series: anomalies, trend, and forecast.
    pub fn analyze_history(&self, series: &[AmountRecord]) -> HistoryAnalysis {
        HistoryAnalysis {
            anomalies: anomaly::detect(series, self.config.anomaly_threshold),
            trend: self.engine.detect_trend(series),
            forecast: self.engine.fit_and_forecast(
                series,
                self.config.default_forecast_periods,
                self.config.default_confidence_level,
            ),
        }
    }

    /// Retrain the classifier from user-confirmed samples.
    pub fn train_classifier(&self, samples: &[LabeledSample]) -> Result<TrainingOutcome> {
        self.classifier.train_with_user_data(samples)
    }
}
