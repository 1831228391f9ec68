// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between recorded CSV files and tensor batches.
//
//   <dir>/<label>/*.csv
//       │
//       ▼
//   CsvWindowLoader   → fixed-length windows + label strings
//       │
//       ▼
//   LabelEncoder      → label strings → class indices
//       │
//       ▼
//   split_train_val   → seeded train / validation split
//       │
//       ▼
//   WindowDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   WindowBatcher     → stacks windows into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads `<dir>/<label>/*.csv` recordings into windows
pub mod loader;

/// Label string ↔ class index mapping
pub mod label_encoder;

/// Implements Burn's Dataset trait for sensor windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded shuffle and train/validation split
pub mod splitter;

use anyhow::{Context, Result};

use crate::data::label_encoder::LabelEncoder;
use crate::domain::window::SensorWindow;

/// Attach class indices to raw (label, values) pairs.
pub fn encode_windows(
    samples:    Vec<(String, Vec<f32>)>,
    encoder:    &LabelEncoder,
    window_len: usize,
    feat_dim:   usize,
) -> Result<Vec<SensorWindow>> {
    samples
        .into_iter()
        .map(|(label, values)| {
            let class = encoder.encode(&label)?;
            let got   = values.len();
            SensorWindow::new(values, window_len, feat_dim, class).with_context(|| {
                format!(
                    "window for '{}' has {} values, expected {}×{}",
                    label, got, window_len, feat_dim
                )
            })
        })
        .collect()
}
