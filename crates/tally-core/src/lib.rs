//! Tally Core Library
//!
//! The expense intelligence pipeline:
//! - Text normalization for OCR output and merchant strings
//! - Receipt field extraction (date, merchant, total, items, payment method)
//! - Hybrid rule + statistical category classification with a persistable
//!   trained model
//! - Z-score anomaly detection over amount histories
//! - Monthly trend detection and linear forecasting with confidence bounds
//! - Pipeline orchestration for the surrounding request-handling layer

pub mod anomaly;
pub mod categories;
pub mod classify;
pub mod error;
pub mod extract;
pub mod forecast;
pub mod models;
pub mod normalize;
pub mod pipeline;

pub use categories::{CategoryInfo, CategoryLabel, CategoryTable};
pub use classify::{
    BayesModel, ClassificationResult, HybridClassifier, SnapshotStore, TrainingOutcome,
};
pub use error::{Error, Result};
pub use extract::ReceiptExtractor;
pub use forecast::{ForecastEngine, ForecastOutcome, ForecastReport, ModelInfo, TrendOutcome};
pub use models::{
    AmountRecord, Anomaly, ForecastPoint, LabeledSample, PaymentMethod, ReceiptItem,
    ReceiptRecord, TrendDirection, TrendReport, ValidationFlags,
};
pub use pipeline::{
    CoreConfig, HistoryAnalysis, Pipeline, ProcessedReceipt, RecordSink,
};
