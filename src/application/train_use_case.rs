// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load training windows       (Layer 4 - data)
//   Step 2: Fit the label encoder       (Layer 4 - data)
//   Step 3: Load or split validation    (Layer 4 - data)
//   Step 4: Build datasets              (Layer 4 - data)
//   Step 5: Save snapshot config        (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)
//
// Directories named explicitly (validation recordings, a
// pretrained encoder's checkpoints) must exist: a typo fails
// before any data is read instead of silently dropping
// validation or starting from random weights.
//
// Reference: Burn Book §5 (Training)

use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::WindowDataset,
    encode_windows,
    label_encoder::LabelEncoder,
    loader::CsvWindowLoader,
    splitter::split_train_val,
};
use crate::domain::traits::WindowSource;
use crate::domain::window::{FEATURE_DIM, WINDOW_LEN};
use crate::infra::checkpoint::{Artifact, CheckpointManager, SnapshotConfig};
use crate::ml::{
    config::{ActivationKind, ClassifierConfig, EncoderConfig, NormKind, PositionalEncodingKind},
    model::MotionClassifierConfig,
    trainer::{run_training, PretrainedEncoder, TrainingPlan, TrainingReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run, flat so the CLI maps onto it
// one flag per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_dir:       String,
    /// Separate validation recordings; when absent a seeded
    /// fraction of the training windows is held out
    pub val_dir:         Option<String>,
    pub checkpoint_dir:  String,
    pub val_fraction:    f64,
    pub seed:            u64,
    pub epochs:          usize,
    pub batch_size:      usize,
    pub lr:              f64,
    pub warmup:          usize,
    pub weight_decay:    f64,
    pub max_len:         usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub dim_feedforward: usize,
    pub dropout:         f64,
    pub pos_encoding:    PositionalEncodingKind,
    pub activation:      ActivationKind,
    pub norm:            NormKind,
    pub freeze:          bool,
    /// Checkpoint directory of an earlier run whose encoder
    /// weights seed this one
    pub pretrained_encoder:  Option<String>,
    pub pretrained_artifact: Artifact,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_dir:       "data/supervised/train".to_string(),
            val_dir:         None,
            checkpoint_dir:  "checkpoints".to_string(),
            val_fraction:    0.2,
            seed:            42,
            epochs:          10,
            batch_size:      16,
            lr:              5e-4,
            warmup:          200,
            weight_decay:    1e-6,
            max_len:         WINDOW_LEN,
            d_model:         128,
            num_heads:       4,
            num_layers:      4,
            dim_feedforward: 512,
            dropout:         0.1,
            pos_encoding:    PositionalEncodingKind::Learnable,
            activation:      ActivationKind::Gelu,
            norm:            NormKind::BatchNorm,
            freeze:          false,
            pretrained_encoder:  None,
            pretrained_artifact: Artifact::BestF1,
        }
    }
}

impl TrainConfig {
    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::new()
            .with_feat_dim(FEATURE_DIM)
            .with_max_len(self.max_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_dim_feedforward(self.dim_feedforward)
            .with_dropout(self.dropout)
            .with_pos_encoding(self.pos_encoding)
            .with_activation(self.activation)
            .with_norm(self.norm)
            .with_freeze(self.freeze)
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new()
            .with_learning_rate(self.lr)
            .with_warmup(self.warmup)
            .with_weight_decay(self.weight_decay)
    }

    pub fn plan(&self, n_classes: usize) -> TrainingPlan {
        TrainingPlan {
            model:      MotionClassifierConfig::new(self.encoder_config(), n_classes),
            classifier: self.classifier_config(),
            epochs:     self.epochs,
            batch_size: self.batch_size,
            seed:       self.seed,
            pretrained: self.pretrained_encoder.as_ref().map(|dir| PretrainedEncoder {
                dir:      dir.into(),
                artifact: self.pretrained_artifact,
            }),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // Fail on a bad architecture before touching the data
        cfg.encoder_config().validate()?;
        cfg.classifier_config().validate()?;
        if let Some(dir) = &cfg.val_dir {
            if !Path::new(dir).is_dir() {
                bail!("validation directory '{}' does not exist", dir);
            }
        }
        if let Some(dir) = &cfg.pretrained_encoder {
            if !Path::new(dir).is_dir() {
                bail!("pretrained encoder directory '{}' does not exist", dir);
            }
        }

        // ── Step 1: Load training windows ─────────────────────────────────────
        tracing::info!("Loading training windows from '{}'", cfg.train_dir);
        let loader    = CsvWindowLoader::new(&cfg.train_dir).with_window_len(cfg.max_len);
        let raw_train = loader.load_all()?;
        if raw_train.is_empty() {
            bail!("no training windows found in '{}'", cfg.train_dir);
        }

        // ── Step 2: Fit label encoder on the training labels ──────────────────
        let labels = LabelEncoder::fit(raw_train.iter().map(|(label, _)| label.as_str()));
        if labels.n_classes() < 2 {
            bail!(
                "need at least two activity classes, found [{}]",
                labels.labels().join(", ")
            );
        }
        tracing::info!("Classes: [{}]", labels.labels().join(", "));

        let train_windows = encode_windows(raw_train, &labels, loader.window_len(), loader.feat_dim())?;

        // ── Step 3: Validation windows ────────────────────────────────────────
        let (train_windows, val_windows) = match &cfg.val_dir {
            Some(dir) => {
                tracing::info!("Loading validation windows from '{}'", dir);
                let val_loader = CsvWindowLoader::new(dir).with_window_len(cfg.max_len);
                let raw_val    = val_loader.load_all()?;
                if raw_val.is_empty() {
                    bail!("no validation windows found in '{}'", dir);
                }
                let val = encode_windows(raw_val, &labels, val_loader.window_len(), val_loader.feat_dim())?;
                (train_windows, val)
            }
            None => split_train_val(train_windows, 1.0 - cfg.val_fraction, cfg.seed),
        };
        tracing::info!(
            "Split: {} train, {} validation",
            train_windows.len(),
            val_windows.len()
        );

        // ── Step 4: Build Burn datasets ───────────────────────────────────────
        let train_dataset = WindowDataset::new(train_windows);
        let val_dataset   = WindowDataset::new(val_windows);
        tracing::debug!("Train class counts: {:?}", train_dataset.class_counts(labels.n_classes()));

        // ── Step 5: Save snapshot config for evaluation ───────────────────────
        let plan = cfg.plan(labels.n_classes());
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(&SnapshotConfig {
            model:      plan.model.clone(),
            classifier: plan.classifier.clone(),
            labels:     labels.labels().to_vec(),
            seed:       cfg.seed,
        })?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(&plan, train_dataset, val_dataset, &ckpt_manager)
    }
}
