// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch so learning curves can be
// plotted after (or during) a run.
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,train_loss,val_loss,accuracy,macro_f1,micro_f1,learning_rate
//   1,1.386120,1.352004,0.412500,0.380211,0.412500,0.000250
//   2,1.201877,1.190342,0.537500,0.512004,0.537500,0.000498
//
// learning_rate is the rate used by the last optimiser step of
// the epoch. val_loss and the metric columns are NaN when the
// epoch had no validation windows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::ml::metrics::EpochSummary;

pub const CSV_HEADER: &str = "epoch,train_loss,val_loss,accuracy,macro_f1,micro_f1,learning_rate";

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number, starting at 1
    pub epoch: usize,

    /// Sample-weighted cross-entropy over the training set
    pub train_loss: f64,

    pub val_loss: f64,

    /// Validation accuracy in [0, 1]
    pub accuracy: f64,

    pub macro_f1: f64,

    pub micro_f1: f64,

    pub learning_rate: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val: &EpochSummary, learning_rate: f64) -> Self {
        Self {
            epoch,
            train_loss,
            val_loss: val.loss,
            accuracy: val.accuracy,
            macro_f1: val.macro_f1,
            micro_f1: val.micro_f1,
            learning_rate,
        }
    }

    /// Row without validation results (empty validation set).
    pub fn train_only(epoch: usize, train_loss: f64, learning_rate: f64) -> Self {
        Self {
            epoch,
            train_loss,
            val_loss: f64::NAN,
            accuracy: f64::NAN,
            macro_f1: f64::NAN,
            micro_f1: f64::NAN,
            learning_rate,
        }
    }
}

/// Logs epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open `<dir>/metrics.csv`, writing the header if the file is new.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Keep existing rows so repeated runs append
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.8}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.accuracy,
            m.macro_f1,
            m.micro_f1,
            m.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}, macro_f1={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.macro_f1,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> EpochSummary {
        EpochSummary { loss: 0.5, accuracy: 0.75, macro_f1: 0.7, micro_f1: 0.75, samples: 8 }
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let tmp = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 1.0, &summary(), 2.5e-4)).unwrap();

        // Reopening must not rewrite the header
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&EpochMetrics::train_only(2, 0.9, 5e-4)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,1.000000,0.500000,0.750000,0.700000,0.750000,"));
        assert!(lines[2].starts_with("2,0.900000,NaN"));
    }
}
