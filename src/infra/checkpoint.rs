// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights with Burn's full-precision
// MessagePack recorder, plus the JSON config needed to rebuild
// the module before its weights are loaded.
//
// Directory layout:
//   checkpoints/
//     snapshot_config.json  ← model config, optimiser settings,
//                             label names, seed
//     best_f1.mpk           ← epoch with the highest macro F1
//     best_val_loss.mpk     ← epoch with the lowest validation loss
//     last.mpk              ← most recent epoch
//     metrics.csv           ← see infra::metrics
//
// Full precision (f32) records are used so a restored model
// reproduces the saved one's outputs exactly.
//
// ModelSnapshot is the in-memory counterpart: config plus record
// bytes, enough to rebuild an equivalent model on any backend.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, str::FromStr};

use crate::domain::error::{ModelError, ModelResult};
use crate::ml::config::{ClassifierConfig, EncoderConfig};
use crate::ml::encoder::SequenceEncoder;
use crate::ml::model::{MotionClassifier, MotionClassifierConfig};

// ─── Artifact ─────────────────────────────────────────────────────────────────
/// Which saved weights to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    BestF1,
    BestValLoss,
    Last,
}

impl Artifact {
    pub fn file_stem(&self) -> &'static str {
        match self {
            Artifact::BestF1      => "best_f1",
            Artifact::BestValLoss => "best_val_loss",
            Artifact::Last        => "last",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for Artifact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "best_f1"       => Ok(Artifact::BestF1),
            "best_val_loss" => Ok(Artifact::BestValLoss),
            "last"          => Ok(Artifact::Last),
            other => Err(format!(
                "unknown artifact '{other}' (expected best_f1, best_val_loss or last)"
            )),
        }
    }
}

// ─── SnapshotConfig ───────────────────────────────────────────────────────────
/// Everything needed to rebuild a trained model and decode its outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub model:      MotionClassifierConfig,
    pub classifier: ClassifierConfig,
    /// Class names; position = class index
    pub labels:     Vec<String>,
    pub seed:       u64,
}

// ─── ModelSnapshot ────────────────────────────────────────────────────────────
/// Config plus serialized weights, held in memory.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub config: MotionClassifierConfig,
    pub bytes:  Vec<u8>,
}

impl ModelSnapshot {
    pub fn capture<B: Backend>(
        model:  &MotionClassifier<B>,
        config: &MotionClassifierConfig,
    ) -> ModelResult<Self> {
        let bytes = BinBytesRecorder::<FullPrecisionSettings>::default()
            .record(model.clone().into_record(), ())
            .map_err(|e| ModelError::Snapshot(e.to_string()))?;
        Ok(Self { config: config.clone(), bytes })
    }

    /// Rebuild the model on `device`; outputs match the captured model.
    pub fn restore<B: Backend>(&self, device: &B::Device) -> ModelResult<MotionClassifier<B>> {
        let model  = self.config.init_for_record::<B>(device)?;
        let record = BinBytesRecorder::<FullPrecisionSettings>::default()
            .load(self.bytes.clone(), device)
            .map_err(|e| ModelError::Snapshot(e.to_string()))?;
        Ok(model.load_record(record).apply_freeze())
    }
}

// ─── BestTracker ──────────────────────────────────────────────────────────────
/// Which tracked metrics improved this epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Improvement {
    pub f1:       bool,
    pub val_loss: bool,
}

/// Tracks best macro F1 (max) and best validation loss (min) separately.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best_f1:       Option<f64>,
    best_val_loss: Option<f64>,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one epoch. NaN values never count as an improvement.
    pub fn update(&mut self, macro_f1: f64, val_loss: f64) -> Improvement {
        let f1 = !macro_f1.is_nan() && self.best_f1.map_or(true, |best| macro_f1 > best);
        if f1 {
            self.best_f1 = Some(macro_f1);
        }

        let val_loss_improved =
            !val_loss.is_nan() && self.best_val_loss.map_or(true, |best| val_loss < best);
        if val_loss_improved {
            self.best_val_loss = Some(val_loss);
        }

        Improvement { f1, val_loss: val_loss_improved }
    }

    pub fn best_f1(&self) -> Option<f64> {
        self.best_f1
    }

    pub fn best_val_loss(&self) -> Option<f64> {
        self.best_val_loss
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Owns the checkpoint directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Open (and create if needed) a checkpoint directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open a directory written by an earlier run; it must exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("Checkpoint directory '{}' does not exist", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
    }

    fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        // The recorder appends the .mpk extension
        self.dir.join(artifact.file_stem())
    }

    pub fn has_artifact(&self, artifact: Artifact) -> bool {
        self.artifact_path(artifact).with_extension("mpk").exists()
    }

    /// Write the weights of `model` under the given artifact name.
    pub fn save_model<B: Backend>(
        &self,
        model:    &MotionClassifier<B>,
        artifact: Artifact,
    ) -> Result<()> {
        let path = self.artifact_path(artifact);
        Self::recorder()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", artifact);
        Ok(())
    }

    /// Load saved weights into a freshly built `model`.
    pub fn load_model<B: Backend>(
        &self,
        model:    MotionClassifier<B>,
        artifact: Artifact,
        device:   &B::Device,
    ) -> Result<MotionClassifier<B>> {
        if !self.has_artifact(artifact) {
            bail!(
                "No '{}' checkpoint in '{}'. Have you run 'train' first?",
                artifact,
                self.dir.display()
            );
        }

        let path = self.artifact_path(artifact);
        let record = Self::recorder()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        tracing::info!("Loaded checkpoint '{}'", artifact);
        Ok(model.load_record(record).apply_freeze())
    }

    /// Encoder of a saved model, for warm-starting one built from `target`.
    pub fn load_encoder<B: Backend>(
        &self,
        target:   &EncoderConfig,
        artifact: Artifact,
        device:   &B::Device,
    ) -> Result<SequenceEncoder<B>> {
        let saved = self.load_config()?;
        target
            .check_compatible(&saved.model.encoder)
            .with_context(|| format!("Cannot reuse the encoder in '{}'", self.dir.display()))?;

        let model = self.load_model(saved.model.init_for_record::<B>(device)?, artifact, device)?;
        Ok(model.encoder)
    }

    /// Write snapshot_config.json. Called before training starts.
    pub fn save_config(&self, cfg: &SnapshotConfig) -> Result<()> {
        let path = self.dir.join("snapshot_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved snapshot config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<SnapshotConfig> {
        let path = self.dir.join("snapshot_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'evaluate'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed snapshot config '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{EncoderConfig, NormKind};
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn tiny_config() -> MotionClassifierConfig {
        let encoder = EncoderConfig::new()
            .with_max_len(10)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_dim_feedforward(32)
            .with_dropout(0.0)
            .with_norm(NormKind::LayerNorm);
        MotionClassifierConfig::new(encoder, 4)
    }

    fn logits(model: &MotionClassifier<TestBackend>, x: Tensor<TestBackend, 3>) -> Vec<f32> {
        model.forward(x).unwrap().into_data().to_vec().unwrap()
    }

    #[test]
    fn test_snapshot_round_trip_is_exact() {
        let device = Default::default();
        let config = tiny_config();
        let model  = config.init::<TestBackend>(&device, 5).unwrap();
        let x = Tensor::<TestBackend, 3>::random([3, 10, 19], Distribution::Normal(0.0, 1.0), &device);

        let snapshot = ModelSnapshot::capture(&model, &config).unwrap();
        let restored = snapshot.restore::<TestBackend>(&device).unwrap();

        assert_eq!(logits(&model, x.clone()), logits(&restored, x));
    }

    #[test]
    fn test_file_round_trip_is_exact() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = tiny_config();
        let model  = config.init::<TestBackend>(&device, 9).unwrap();
        let x = Tensor::<TestBackend, 3>::random([2, 10, 19], Distribution::Normal(0.0, 1.0), &device);

        let manager = CheckpointManager::new(tmp.path()).unwrap();
        manager.save_model(&model, Artifact::BestF1).unwrap();
        assert!(manager.has_artifact(Artifact::BestF1));
        assert!(!manager.has_artifact(Artifact::Last));

        let fresh  = config.init_for_record::<TestBackend>(&device).unwrap();
        let loaded = manager.load_model(fresh, Artifact::BestF1, &device).unwrap();
        assert_eq!(logits(&model, x.clone()), logits(&loaded, x));
    }

    #[test]
    fn test_missing_artifact_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let model = tiny_config().init::<TestBackend>(&device, 0).unwrap();
        let err = manager.load_model(model, Artifact::Last, &device).unwrap_err();
        assert!(err.to_string().contains("No 'last' checkpoint"));
    }

    #[test]
    fn test_config_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path().join("nested")).unwrap();
        let cfg = SnapshotConfig {
            model:      tiny_config(),
            classifier: ClassifierConfig::new(),
            labels:     vec!["run".into(), "sit".into(), "walk".into(), "jump".into()],
            seed:       42,
        };
        manager.save_config(&cfg).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.labels, cfg.labels);
        assert_eq!(loaded.seed, 42);
        assert_eq!(loaded.model.n_classes, 4);
        assert_eq!(loaded.model.encoder.d_model, 16);
        assert_eq!(loaded.model.encoder.norm, NormKind::LayerNorm);
    }

    #[test]
    fn test_open_requires_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let absent = tmp.path().join("typo");
        assert!(CheckpointManager::open(&absent).is_err());
        assert!(!absent.exists());
        assert!(CheckpointManager::open(tmp.path()).is_ok());
    }

    #[test]
    fn test_load_encoder_checks_architecture() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = tiny_config();
        let model  = config.init::<TestBackend>(&device, 4).unwrap();

        let manager = CheckpointManager::new(tmp.path()).unwrap();
        manager.save_config(&SnapshotConfig {
            model:      config.clone(),
            classifier: ClassifierConfig::new(),
            labels:     vec!["a".into(), "b".into(), "c".into(), "d".into()],
            seed:       4,
        }).unwrap();
        manager.save_model(&model, Artifact::Last).unwrap();

        let encoder = manager
            .load_encoder::<TestBackend>(&config.encoder, Artifact::Last, &device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::random([2, 10, 19], Distribution::Normal(0.0, 1.0), &device);
        let expected: Vec<f32> = model.encoder.encode(x.clone()).unwrap().into_data().to_vec().unwrap();
        let actual: Vec<f32>   = encoder.encode(x).unwrap().into_data().to_vec().unwrap();
        assert_eq!(expected, actual);

        let wider = config.encoder.clone().with_dim_feedforward(64);
        let err = manager
            .load_encoder::<TestBackend>(&wider, Artifact::Last, &device)
            .unwrap_err();
        assert!(format!("{err:#}").contains("dim_feedforward=32"));
    }

    #[test]
    fn test_best_tracker_monitors_independently() {
        let mut tracker = BestTracker::new();
        assert_eq!(tracker.update(0.5, 1.0), Improvement { f1: true, val_loss: true });
        // F1 improves, loss gets worse
        assert_eq!(tracker.update(0.6, 1.2), Improvement { f1: true, val_loss: false });
        // Loss improves, F1 gets worse
        assert_eq!(tracker.update(0.4, 0.9), Improvement { f1: false, val_loss: true });
        assert_eq!(tracker.best_f1(), Some(0.6));
        assert_eq!(tracker.best_val_loss(), Some(0.9));
        assert_eq!(tracker.update(f64::NAN, f64::NAN), Improvement::default());
    }

    #[test]
    fn test_artifact_parsing() {
        assert_eq!("best-f1".parse::<Artifact>().unwrap(), Artifact::BestF1);
        assert_eq!("BEST_VAL_LOSS".parse::<Artifact>().unwrap(), Artifact::BestValLoss);
        assert!("first".parse::<Artifact>().is_err());
        assert_eq!(Artifact::Last.to_string(), "last");
        assert_eq!(serde_json::to_string(&Artifact::BestValLoss).unwrap(), "\"best_val_loss\"");
    }
}
