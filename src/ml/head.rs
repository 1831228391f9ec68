// ============================================================
// Layer 5 — Classification Head
// ============================================================
// Linear map from the pooled vector to raw class logits.
// No softmax here: the loss uses log-softmax internally and
// the metrics take argmax indices.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::ml::forward::Forward;

#[derive(Module, Debug)]
pub struct ClassificationHead<B: Backend> {
    pub linear:    Linear<B>,
    pub n_classes: usize,
}

impl<B: Backend> ClassificationHead<B> {
    pub fn new(d_model: usize, n_classes: usize, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(d_model, n_classes).init(device),
            n_classes,
        }
    }
}

impl<B: Backend> Forward<B, 2, 2> for ClassificationHead<B> {
    /// pooled: [batch, d_model] → logits: [batch, n_classes]
    fn forward(&self, pooled: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(pooled)
    }
}
