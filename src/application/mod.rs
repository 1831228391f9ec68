// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training or evaluating a classifier).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - File access only through Layer 4 and Layer 6
//   - Only workflow coordination

/// The training workflow
pub mod train_use_case;

/// Scoring a trained checkpoint on labelled recordings
pub mod evaluate_use_case;
