// ============================================================
// Layer 5 — Positional Encoding
// ============================================================
// Self-attention is permutation-invariant, so each time step
// gets an additive (seq_len × d_model) vector that depends on
// its position.
//
// Two interchangeable schemes implement `PositionEncoder`:
//   LearnablePositionalEncoding  — trainable table
//   SinusoidalPositionalEncoding — fixed sin/cos table
//
//   PE(pos, 2i)   = sin(pos / 10000^(2i/d_model))
//   PE(pos, 2i+1) = cos(pos / 10000^(2i/d_model))
//
// `PositionalEncoding` holds exactly one of them and is what
// the encoder owns; the encoder never looks at the kind.

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
};

use crate::ml::config::PositionalEncodingKind;

/// Capability shared by every positional scheme.
pub trait PositionEncoder<B: Backend> {
    /// Additive encoding for the first `seq_len` positions: [seq_len, d_model]
    fn encoding(&self, seq_len: usize) -> Tensor<B, 2>;

    /// Add the encoding to x: [batch, seq_len, d_model]
    fn add_to(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, seq_len, _] = x.dims();
        x + self.encoding(seq_len).unsqueeze::<3>()
    }
}

// ─── Learnable ────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct LearnablePositionalEncoding<B: Backend> {
    /// [max_len, d_model], updated by the optimiser like any weight
    pub table: Param<Tensor<B, 2>>,
}

impl<B: Backend> LearnablePositionalEncoding<B> {
    pub fn new(max_len: usize, d_model: usize, device: &B::Device) -> Self {
        let table = Initializer::Uniform { min: -0.02, max: 0.02 }.init([max_len, d_model], device);
        Self { table }
    }
}

impl<B: Backend> PositionEncoder<B> for LearnablePositionalEncoding<B> {
    fn encoding(&self, seq_len: usize) -> Tensor<B, 2> {
        self.table.val().slice([0..seq_len])
    }
}

// ─── Sinusoidal ───────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SinusoidalPositionalEncoding<B: Backend> {
    /// [max_len, d_model], constant
    pub table: Tensor<B, 2>,
}

impl<B: Backend> SinusoidalPositionalEncoding<B> {
    pub fn new(max_len: usize, d_model: usize, device: &B::Device) -> Self {
        let values = sinusoid_table(max_len, d_model);
        let table = Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([max_len, d_model]);
        Self { table }
    }
}

impl<B: Backend> PositionEncoder<B> for SinusoidalPositionalEncoding<B> {
    fn encoding(&self, seq_len: usize) -> Tensor<B, 2> {
        self.table.clone().slice([0..seq_len])
    }
}

/// Row-major (max_len × d_model) sinusoid table.
pub fn sinusoid_table(max_len: usize, d_model: usize) -> Vec<f32> {
    let mut values = vec![0.0f32; max_len * d_model];
    for pos in 0..max_len {
        for i in (0..d_model).step_by(2) {
            let angle = pos as f64 / 10_000f64.powf(i as f64 / d_model as f64);
            values[pos * d_model + i] = angle.sin() as f32;
            if i + 1 < d_model {
                values[pos * d_model + i + 1] = angle.cos() as f32;
            }
        }
    }
    values
}

// ─── Selector ─────────────────────────────────────────────────────────────────

/// The positional scheme chosen by the encoder configuration.
#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    learnable: Option<LearnablePositionalEncoding<B>>,
    fixed:     Option<SinusoidalPositionalEncoding<B>>,
}

impl<B: Backend> PositionalEncoding<B> {
    pub fn new(
        kind:    PositionalEncodingKind,
        max_len: usize,
        d_model: usize,
        device:  &B::Device,
    ) -> Self {
        match kind {
            PositionalEncodingKind::Learnable => Self {
                learnable: Some(LearnablePositionalEncoding::new(max_len, d_model, device)),
                fixed:     None,
            },
            PositionalEncodingKind::Fixed => Self {
                learnable: None,
                fixed:     Some(SinusoidalPositionalEncoding::new(max_len, d_model, device)),
            },
        }
    }

    pub fn kind(&self) -> PositionalEncodingKind {
        if self.learnable.is_some() {
            PositionalEncodingKind::Learnable
        } else {
            PositionalEncodingKind::Fixed
        }
    }

    /// x: [batch, seq_len, d_model] → same shape with positions added
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match (&self.learnable, &self.fixed) {
            (Some(learnable), _) => learnable.add_to(x),
            (None, Some(fixed))  => fixed.add_to(x),
            (None, None)         => x,
        }
    }
}
