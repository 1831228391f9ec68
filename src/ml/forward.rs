// ============================================================
// Layer 5 — Forward Capability
// ============================================================
// The three stages of the classifier (encoder, pooling, head)
// each implement this trait and are composed explicitly by
// MotionClassifier:
//
//   SequenceEncoder          Forward<B, 3, 3>  [b, L, F] → [b, L, d]
//   GlobalTemporalAttention  Forward<B, 3, 2>  [b, L, d] → [b, d]
//   ClassificationHead       Forward<B, 2, 2>  [b, d]    → [b, C]

use burn::prelude::*;

pub trait Forward<B: Backend, const D_IN: usize, const D_OUT: usize> {
    fn forward(&self, input: Tensor<B, D_IN>) -> Tensor<B, D_OUT>;
}
