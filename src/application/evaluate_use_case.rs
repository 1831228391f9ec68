// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a trained checkpoint on a directory of labelled
// recordings:
//
//   Step 1: Read snapshot config       (Layer 6 - infra)
//   Step 2: Load windows of that size  (Layer 4 - data)
//   Step 3: Encode with saved labels   (Layer 4 - data)
//   Step 4: Load weights and evaluate  (Layer 5 - ml)
//
// Labels are encoded with the list saved at training time, so
// class indices line up with the head. A label the model was
// never trained on is an error.

use anyhow::{bail, Result};

use crate::data::{encode_windows, label_encoder::LabelEncoder, loader::CsvWindowLoader};
use crate::domain::traits::WindowSource;
use crate::infra::checkpoint::{Artifact, CheckpointManager};
use crate::ml::{
    inferencer::{EvaluationReport, Inferencer},
    InferBackend,
};

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    data_dir:       String,
    artifact:       Artifact,
    batch_size:     usize,
}

impl EvaluateUseCase {
    pub fn new(
        checkpoint_dir: impl Into<String>,
        data_dir:       impl Into<String>,
        artifact:       Artifact,
        batch_size:     usize,
    ) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            data_dir:       data_dir.into(),
            artifact,
            batch_size,
        }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        // ── Step 1: Snapshot config ───────────────────────────────────────────
        let ckpt_manager = CheckpointManager::open(&self.checkpoint_dir)?;
        let snapshot     = ckpt_manager.load_config()?;
        let encoder_cfg  = &snapshot.model.encoder;

        // ── Step 2: Windows shaped like the training data ─────────────────────
        let loader = CsvWindowLoader::new(&self.data_dir).with_window_len(encoder_cfg.max_len);
        if loader.feat_dim() != encoder_cfg.feat_dim {
            bail!(
                "model expects {} channels, loader provides {}",
                encoder_cfg.feat_dim,
                loader.feat_dim()
            );
        }
        let raw = loader.load_all()?;
        if raw.is_empty() {
            bail!("no windows found in '{}'", self.data_dir);
        }

        // ── Step 3: Encode with the training label order ──────────────────────
        let labels  = LabelEncoder::from_labels(snapshot.labels.clone());
        let windows = encode_windows(raw, &labels, loader.window_len(), loader.feat_dim())?;

        // ── Step 4: Evaluate ──────────────────────────────────────────────────
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(&ckpt_manager, self.artifact)?
            .with_batch_size(self.batch_size);

        tracing::info!(
            "Evaluating '{}' checkpoint on {} windows",
            self.artifact,
            windows.len()
        );
        inferencer.evaluate(&windows)
    }
}
