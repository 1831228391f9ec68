// ============================================================
// Layer 5 — Global Temporal Attention
// ============================================================
// Collapses [batch, seq_len, d_model] into [batch, d_model]
// with a learned weighted sum over time steps:
//
//   score_t  = w · tanh(W h_t + b) + c          (scalar per step)
//   alpha    = softmax(score) over t            (Σ_t alpha_t = 1)
//   pooled   = Σ_t alpha_t · h_t
//
// Unlike mean/max pooling the network decides which steps of
// the window carry the motion that matters. Dropout is applied
// to alpha during training only.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};

use crate::ml::forward::Forward;

#[derive(Config, Debug)]
pub struct TemporalAttentionConfig {
    pub d_model: usize,

    #[config(default = 0.1)]
    pub dropout: f64,
}

impl TemporalAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GlobalTemporalAttention<B> {
        GlobalTemporalAttention {
            score_hidden: LinearConfig::new(self.d_model, self.d_model).init(device),
            score_out:    LinearConfig::new(self.d_model, 1).init(device),
            dropout:      DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct GlobalTemporalAttention<B: Backend> {
    pub score_hidden: Linear<B>,
    pub score_out:    Linear<B>,
    pub dropout:      Dropout,
}

impl<B: Backend> GlobalTemporalAttention<B> {
    /// Normalised importance of each step: [batch, seq_len], rows sum to 1
    pub fn attention_weights(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, seq_len, _] = x.dims();
        let scores = self.score_out.forward(tanh(self.score_hidden.forward(x))); // [b, L, 1]
        softmax(scores.reshape([batch, seq_len]), 1)
    }
}

impl<B: Backend> Forward<B, 3, 2> for GlobalTemporalAttention<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, _, d_model] = x.dims();
        let weights = self.dropout.forward(self.attention_weights(x.clone()));
        (x * weights.unsqueeze_dim::<3>(2))
            .sum_dim(1)
            .reshape([batch, d_model])
    }
}
