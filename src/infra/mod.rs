// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence shared by training and evaluation:
//
//   checkpoint.rs — model records and the snapshot config
//                   Named full-precision MessagePack records
//                   for best_f1 / best_val_loss / last, plus
//                   snapshot_config.json so evaluation can
//                   rebuild the exact architecture and labels.
//
//   metrics.rs    — per-epoch CSV log (loss, accuracy, F1,
//                   learning rate) for plotting learning curves
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
