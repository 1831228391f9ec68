// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu> in
//     the binary, Autodiff<NdArray> in tests)
//   - model.valid() drops autodiff for validation; dropout is
//     inactive there and BatchNorm uses its running statistics
//   - The learning rate is recomputed before every optimiser
//     step from the warmup + cosine schedule
//   - A non-finite training loss stops the run with a
//     Divergence error instead of silently corrupting weights
//
// With a pretrained encoder set in the plan, its weights replace
// the freshly initialised encoder before the first step; with
// `freeze` they then stay fixed for the whole run.
//
// After every epoch:
//   last.mpk           always
//   best_f1.mpk        when macro F1 beats every earlier epoch
//   best_val_loss.mpk  when val loss beats every earlier epoch
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::path::PathBuf;

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{WindowBatch, WindowBatcher},
    dataset::WindowDataset,
};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::window::SensorWindow;
use crate::infra::{
    checkpoint::{Artifact, BestTracker, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    config::ClassifierConfig,
    metrics::MetricsAccumulator,
    model::{MotionClassifier, MotionClassifierConfig},
    scheduler::WarmupCosineSchedule,
    TrainBackend,
};

/// Encoder weights to start from: a checkpoint directory and artifact.
#[derive(Debug, Clone)]
pub struct PretrainedEncoder {
    pub dir:      PathBuf,
    pub artifact: Artifact,
}

/// Everything the loop needs besides the data.
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    pub model:      MotionClassifierConfig,
    pub classifier: ClassifierConfig,
    pub epochs:     usize,
    pub batch_size: usize,
    pub seed:       u64,
    pub pretrained: Option<PretrainedEncoder>,
}

/// What a finished run reports back.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history:       Vec<EpochMetrics>,
    pub best_f1:       Option<f64>,
    pub best_val_loss: Option<f64>,
}

pub fn run_training(
    plan:          &TrainingPlan,
    train_dataset: WindowDataset,
    val_dataset:   WindowDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainingReport> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<TrainBackend>(plan, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    plan:          &TrainingPlan,
    train_dataset: WindowDataset,
    val_dataset:   WindowDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainingReport> {
    if train_dataset.sample_count() == 0 {
        bail!("training set is empty; nothing to train on");
    }
    if plan.batch_size == 0 {
        bail!("batch size must be positive");
    }
    plan.classifier.validate()?;

    let n_classes = plan.model.n_classes;
    let has_val   = val_dataset.sample_count() > 0;
    if !has_val {
        tracing::warn!("Validation set is empty: metrics and best-model checkpoints are skipped");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: MotionClassifier<B> = plan.model.init(&device, plan.seed)?;
    if let Some(source) = &plan.pretrained {
        let encoder = CheckpointManager::open(&source.dir)?
            .load_encoder::<B>(&plan.model.encoder, source.artifact, &device)?;
        model = model.with_pretrained_encoder(encoder)?;
        tracing::info!(
            "Encoder initialised from '{}' in '{}' (frozen={})",
            source.artifact,
            source.dir.display(),
            model.is_frozen()
        );
    }

    // ── Adam with L2 weight decay ─────────────────────────────────────────────
    let optim_cfg = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(plan.classifier.weight_decay as f32)));
    let mut optim = optim_cfg.init::<B, MotionClassifier<B>>();

    // ── Learning-rate schedule over every optimiser step of the run ───────────
    let steps_per_epoch = train_dataset.steps_per_epoch(plan.batch_size);
    let total_steps     = plan.epochs * steps_per_epoch;
    let mut schedule = WarmupCosineSchedule::new(
        plan.classifier.learning_rate,
        plan.classifier.warmup,
        total_steps,
    )?;
    tracing::info!(
        "Training: {} epochs × {} steps, warmup {}, {} train / {} val windows",
        plan.epochs,
        steps_per_epoch,
        plan.classifier.warmup,
        train_dataset.sample_count(),
        val_dataset.sample_count(),
    );

    // ── Data loaders ──────────────────────────────────────────────────────────
    // Shuffle order is seeded so the same seed replays the same batches
    let train_loader = DataLoaderBuilder::new(WindowBatcher::<B>::new(device.clone()))
        .batch_size(plan.batch_size)
        .shuffle(plan.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(WindowBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(plan.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let logger      = MetricsLogger::new(ckpt_manager.dir().clone())?;
    let mut tracker = BestTracker::new();
    let mut history = Vec::with_capacity(plan.epochs);
    let mut last_lr = 0.0;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=plan.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_metrics = MetricsAccumulator::new(n_classes);

        for batch in train_loader.iter() {
            let step    = schedule.current_step();
            let targets = batch.labels.clone();
            let (loss, logits) = model.forward_loss(batch.sequences, batch.labels)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            check_finite(loss_val, epoch, step)?;
            train_metrics.update_from_logits(loss_val, logits, targets);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            last_lr   = schedule.current_lr();
            model     = optim.step(last_lr, model, grads);
            schedule.advance();
        }

        let train_loss = train_metrics.avg_loss();

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let row = if has_val {
            let val = evaluate_batches(&model_valid, val_loader.iter(), n_classes)?.summary();

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | acc={:.1}% | macro_f1={:.4} | lr={:.2e}",
                epoch, plan.epochs, train_loss, val.loss,
                val.accuracy * 100.0, val.macro_f1, last_lr,
            );

            let improved = tracker.update(val.macro_f1, val.loss);
            if improved.f1 {
                ckpt_manager.save_model(&model_valid, Artifact::BestF1)?;
                tracing::info!("New best macro F1 {:.4} at epoch {}", val.macro_f1, epoch);
            }
            if improved.val_loss {
                ckpt_manager.save_model(&model_valid, Artifact::BestValLoss)?;
                tracing::info!("New best val loss {:.4} at epoch {}", val.loss, epoch);
            }

            EpochMetrics::new(epoch, train_loss, &val, last_lr)
        } else {
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | lr={:.2e}",
                epoch, plan.epochs, train_loss, last_lr,
            );
            EpochMetrics::train_only(epoch, train_loss, last_lr)
        };

        ckpt_manager.save_model(&model_valid, Artifact::Last)?;
        logger.log(&row)?;
        history.push(row);
    }

    tracing::info!("Training complete!");
    Ok(TrainingReport {
        history,
        best_f1:       tracker.best_f1(),
        best_val_loss: tracker.best_val_loss(),
    })
}

/// Loss and confusion counts over a stream of batches, without gradients.
pub fn evaluate_batches<B: Backend>(
    model:     &MotionClassifier<B>,
    batches:   impl Iterator<Item = WindowBatch<B>>,
    n_classes: usize,
) -> ModelResult<MetricsAccumulator> {
    let mut acc = MetricsAccumulator::new(n_classes);
    for batch in batches {
        let targets = batch.labels.clone();
        let (loss, logits) = model.forward_loss(batch.sequences, batch.labels)?;
        acc.update_from_logits(loss.into_scalar().elem::<f64>(), logits, targets);
    }
    Ok(acc)
}

/// Stack `windows` into batches of at most `batch_size`, in order.
pub fn batches_of<'a, B: Backend>(
    windows:    &'a [SensorWindow],
    batch_size: usize,
    device:     &B::Device,
) -> impl Iterator<Item = WindowBatch<B>> + 'a {
    let batcher = WindowBatcher::<B>::new(device.clone());
    windows
        .chunks(batch_size.max(1))
        .map(move |chunk| batcher.batch(chunk.to_vec()))
}

fn check_finite(loss: f64, epoch: usize, step: usize) -> ModelResult<()> {
    if loss.is_finite() {
        Ok(())
    } else {
        tracing::error!("Non-finite loss {} at epoch {}, step {}", loss, epoch, step);
        Err(ModelError::Divergence { epoch, step, loss })
    }
}
