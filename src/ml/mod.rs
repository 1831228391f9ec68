// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, optimisation and metric code lives here.
//
//   config.rs      — EncoderConfig, ClassifierConfig and the
//                    positional / activation / norm kinds
//   positional.rs  — learnable and sinusoidal position tables
//   encoder.rs     — input projection + stacked encoder blocks
//                    (self-attention, feedforward, BatchNorm or
//                    LayerNorm after each residual)
//   pooling.rs     — global temporal attention pooling
//   head.rs        — linear classification head
//   forward.rs     — shared Forward capability of the stages
//   model.rs       — MotionClassifier, the composed model
//   scheduler.rs   — warmup + cosine learning-rate schedule
//   metrics.rs     — confusion matrix, accuracy, macro/micro F1
//   trainer.rs     — epoch loop, validation, checkpointing
//   inferencer.rs  — loads a checkpoint, predicts and evaluates
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

use burn::backend::{Autodiff, Wgpu};

/// Backend used for training (gradients on the GPU).
pub type TrainBackend = Autodiff<Wgpu>;

/// Backend used for inference and evaluation.
pub type InferBackend = Wgpu;

/// Encoder, optimiser and kind configuration
pub mod config;

/// Shared forward-pass capability
pub mod forward;

/// Positional encodings
pub mod positional;

/// Transformer encoder over sensor windows
pub mod encoder;

/// Global temporal attention pooling
pub mod pooling;

/// Linear classification head
pub mod head;

/// Composed motion classifier
pub mod model;

/// Warmup + cosine learning-rate schedule
pub mod scheduler;

/// Accuracy and F1 metrics
pub mod metrics;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads a checkpoint and classifies windows
pub mod inferencer;
