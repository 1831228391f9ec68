// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained model from the checkpoint directory and
// runs it without gradients.
//
//   predict_proba → softmax probabilities per window
//   classify      → argmax class index per window
//   evaluate      → loss, accuracy, macro/micro F1, per-class F1
//
// Probabilities are only an output of this API; the metrics are
// always computed from argmax indices.

use anyhow::{bail, Context, Result};
use burn::prelude::*;

use crate::data::label_encoder::LabelEncoder;
use crate::domain::traits::WindowClassifier;
use crate::domain::window::SensorWindow;
use crate::infra::checkpoint::{Artifact, CheckpointManager};
use crate::ml::{
    metrics::{argmax_indices, ConfusionMatrix, EpochSummary},
    model::MotionClassifier,
    trainer::{batches_of, evaluate_batches},
    InferBackend,
};

const DEFAULT_BATCH_SIZE: usize = 64;

/// Result of evaluating a labelled set of windows.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub summary:      EpochSummary,
    /// (label, F1) for every known class, in index order
    pub per_class_f1: Vec<(String, f64)>,
    pub confusion:    ConfusionMatrix,
}

pub struct Inferencer<B: Backend = InferBackend> {
    model:      MotionClassifier<B>,
    labels:     LabelEncoder,
    batch_size: usize,
    device:     B::Device,
}

impl Inferencer<InferBackend> {
    /// Load `artifact` from the checkpoint directory onto the default GPU.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, artifact: Artifact) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::from_checkpoint_on(ckpt_manager, artifact, device)
    }
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint_on(
        ckpt_manager: &CheckpointManager,
        artifact:     Artifact,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        if cfg.labels.len() != cfg.model.n_classes {
            bail!(
                "snapshot config lists {} labels for {} classes",
                cfg.labels.len(),
                cfg.model.n_classes
            );
        }

        let model = cfg.model.init_for_record::<B>(&device)?;
        let model = ckpt_manager.load_model(model, artifact, &device)?;
        tracing::info!("Model loaded from '{}' checkpoint", artifact);

        Ok(Self::from_model(model, LabelEncoder::from_labels(cfg.labels), device))
    }

    pub fn from_model(model: MotionClassifier<B>, labels: LabelEncoder, device: B::Device) -> Self {
        Self { model, labels, batch_size: DEFAULT_BATCH_SIZE, device }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Softmax probabilities, one row of n_classes values per window.
    pub fn predict_proba(&self, windows: &[SensorWindow]) -> Result<Vec<Vec<f32>>> {
        let n_classes = self.model.n_classes();
        let mut rows  = Vec::with_capacity(windows.len());

        for batch in batches_of::<B>(windows, self.batch_size, &self.device) {
            let probs: Vec<f32> = self
                .model
                .predict_proba(batch.sequences)?
                .into_data()
                .to_vec()
                .map_err(|e| anyhow::anyhow!("cannot read probabilities: {e:?}"))?;
            rows.extend(probs.chunks(n_classes).map(<[f32]>::to_vec));
        }
        Ok(rows)
    }

    /// Label name of the predicted class for each window.
    pub fn predict_labels(&self, windows: &[SensorWindow]) -> Result<Vec<String>> {
        self.classify(windows)?
            .into_iter()
            .map(|idx| {
                self.labels
                    .decode(idx)
                    .map(str::to_string)
                    .with_context(|| format!("class index {idx} has no label"))
            })
            .collect()
    }

    /// Run the model over labelled windows and score it.
    pub fn evaluate(&self, windows: &[SensorWindow]) -> Result<EvaluationReport> {
        if windows.is_empty() {
            bail!("no windows to evaluate");
        }

        let n_classes = self.model.n_classes();
        let acc = evaluate_batches(
            &self.model,
            batches_of::<B>(windows, self.batch_size, &self.device),
            n_classes,
        )?;

        let confusion = acc.confusion().clone();
        let per_class_f1 = confusion
            .per_class_f1()
            .into_iter()
            .enumerate()
            .map(|(idx, f1)| {
                let name = self.labels.decode(idx).unwrap_or("?").to_string();
                (name, f1)
            })
            .collect();

        Ok(EvaluationReport { summary: acc.summary(), per_class_f1, confusion })
    }
}

impl<B: Backend> WindowClassifier for Inferencer<B> {
    fn classify(&self, windows: &[SensorWindow]) -> Result<Vec<usize>> {
        let mut predictions = Vec::with_capacity(windows.len());
        for batch in batches_of::<B>(windows, self.batch_size, &self.device) {
            let logits = self.model.forward(batch.sequences)?;
            predictions.extend(argmax_indices(logits));
        }
        Ok(predictions)
    }
}
