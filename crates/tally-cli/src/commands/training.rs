//! Classifier retraining command

use std::path::Path;

use anyhow::Result;

use tally_core::TrainingOutcome;

use super::{build_pipeline, load_samples};
use crate::cli::Cli;

pub fn cmd_train(cli: &Cli, file: &Path) -> Result<()> {
    let samples = load_samples(file)?;
    let pipeline = build_pipeline(cli)?;

    match pipeline.train_classifier(&samples)? {
        TrainingOutcome::Retrained { samples } => {
            println!("Classifier retrained on {samples} samples");
        }
        TrainingOutcome::InsufficientData { provided, required } => {
            // Expected for users still accumulating confirmations, not an error
            println!(
                "Not enough labeled samples to retrain: {provided} of {required} required. \
                 The existing model is unchanged."
            );
        }
    }
    Ok(())
}
