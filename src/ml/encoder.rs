// ============================================================
// Layer 5 — Sequence Encoder
// ============================================================
// Maps a window [batch, max_len, feat_dim] to contextualised
// embeddings [batch, max_len, d_model]:
//
//   input_projection (feat_dim → d_model, per time step)
//        │
//   + positional encoding, dropout
//        │
//   num_layers × EncoderBlock
//        ├─ multi-head self-attention → dropout → + residual → norm
//        └─ linear → activation → dropout → linear → dropout
//                                          → + residual → norm
//
// Normalisation is either BatchNorm over channels (statistics
// pooled over batch and time) or LayerNorm per time step, the
// same kind in every block.
//
// With `freeze` set, all encoder parameters are marked as not
// requiring gradients: they still run in the forward pass but
// the optimiser never receives a gradient for them. BatchNorm
// layers of a frozen encoder also stop tracking statistics and
// normalise with their running mean and variance, so the encoder
// computes the same function in training and inference.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Zerveas et al. (2021) Transformer-based Framework
//            for Multivariate Time Series Representation Learning

use burn::{
    module::Ignored,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::domain::error::{ModelError, ModelResult};
use crate::ml::config::{ActivationKind, EncoderConfig, NormKind};
use crate::ml::forward::Forward;
use crate::ml::positional::PositionalEncoding;

// ─── Normalization ────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Normalization<B: Backend> {
    batch:  Option<BatchNorm<B, 1>>,
    layer:  Option<LayerNorm<B>>,
    frozen: bool,
}

impl<B: Backend> Normalization<B> {
    pub fn new(kind: NormKind, d_model: usize, frozen: bool, device: &B::Device) -> Self {
        match kind {
            NormKind::BatchNorm => Self {
                batch: Some(BatchNormConfig::new(d_model).init(device)),
                layer: None,
                frozen,
            },
            NormKind::LayerNorm => Self {
                batch: None,
                layer: Some(LayerNormConfig::new(d_model).init(device)),
                frozen,
            },
        }
    }

    /// x: [batch, seq_len, d_model] → same shape
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match (&self.batch, &self.layer) {
            // BatchNorm expects channels on dim 1: [batch, d_model, seq_len]
            (Some(bn), _) if self.frozen => running_batch_norm(bn, x.swap_dims(1, 2)).swap_dims(1, 2),
            (Some(bn), _)                => bn.forward(x.swap_dims(1, 2)).swap_dims(1, 2),
            (None, Some(ln))             => ln.forward(x),
            (None, None)                 => x,
        }
    }
}

/// BatchNorm with its running statistics, whatever the backend.
/// x: [batch, channels, seq_len]
fn running_batch_norm<B: Backend>(bn: &BatchNorm<B, 1>, x: Tensor<B, 3>) -> Tensor<B, 3> {
    let device   = x.device();
    let channels = x.dims()[1];
    let shape    = [1, channels, 1];

    let mean = bn.running_mean.value().to_device(&device).reshape(shape);
    let std  = bn.running_var.value().to_device(&device).reshape(shape)
        .add_scalar(bn.epsilon)
        .sqrt();

    x.sub(mean)
        .div(std)
        .mul(bn.gamma.val().reshape(shape))
        .add(bn.beta.val().reshape(shape))
}

// ─── EncoderBlock ─────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       Normalization<B>,
    pub norm2:       Normalization<B>,
    pub dropout:     Dropout,
    pub activation:  Ignored<ActivationKind>,
}

impl<B: Backend> EncoderBlock<B> {
    fn new(cfg: &EncoderConfig, device: &B::Device) -> Self {
        let self_attn   = MultiHeadAttentionConfig::new(cfg.d_model, cfg.num_heads)
            .with_dropout(cfg.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(cfg.d_model, cfg.dim_feedforward).init(device);
        let ffn_linear2 = LinearConfig::new(cfg.dim_feedforward, cfg.d_model).init(device);
        let norm1       = Normalization::new(cfg.norm, cfg.d_model, cfg.freeze, device);
        let norm2       = Normalization::new(cfg.norm, cfg.d_model, cfg.freeze, device);
        let dropout     = DropoutConfig::new(cfg.dropout).init();
        Self {
            self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout,
            activation: Ignored(cfg.activation),
        }
    }

    fn activate(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self.activation.0 {
            ActivationKind::Gelu => activation::gelu(x),
            ActivationKind::Relu => activation::relu(x),
        }
    }

    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_output = self.self_attn.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));

        let hidden  = self.activate(self.ffn_linear1.forward(x.clone()));
        let ffn_out = self.ffn_linear2.forward(self.dropout.forward(hidden));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── SequenceEncoder ──────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SequenceEncoder<B: Backend> {
    pub input_projection: Linear<B>,
    pub positional:       PositionalEncoding<B>,
    pub layers:           Vec<EncoderBlock<B>>,
    pub dropout:          Dropout,
    pub feat_dim:         usize,
    pub max_len:          usize,
    pub d_model:          usize,
    pub frozen:           bool,
}

impl EncoderConfig {
    /// Build the encoder, failing fast on an invalid configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<SequenceEncoder<B>> {
        self.validate()?;

        let input_projection = LinearConfig::new(self.feat_dim, self.d_model).init(device);
        let positional = PositionalEncoding::new(self.pos_encoding, self.max_len, self.d_model, device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| EncoderBlock::new(self, device))
            .collect();

        let encoder = SequenceEncoder {
            input_projection,
            positional,
            layers,
            dropout:  DropoutConfig::new(self.dropout).init(),
            feat_dim: self.feat_dim,
            max_len:  self.max_len,
            d_model:  self.d_model,
            frozen:   self.freeze,
        };

        tracing::debug!(
            "Encoder ready: {} layers, d_model={}, heads={}, norm={}, pos={}, frozen={}",
            self.num_layers, self.d_model, self.num_heads, self.norm, self.pos_encoding, self.freeze
        );

        Ok(encoder.apply_freeze())
    }
}

impl<B: Backend> SequenceEncoder<B> {
    /// Mark parameters as constant when the encoder is frozen.
    /// Needed again after loading a record into a fresh module.
    pub fn apply_freeze(self) -> Self {
        if self.frozen { self.no_grad() } else { self }
    }

    /// Reject inputs whose shape disagrees with the configuration.
    pub fn check_input(&self, dims: [usize; 3]) -> ModelResult<()> {
        let [batch, seq_len, feat] = dims;
        if batch == 0 {
            return Err(ModelError::InvalidInput("empty batch".into()));
        }
        if seq_len == 0 {
            return Err(ModelError::InvalidInput("zero-length sequence".into()));
        }
        if feat != self.feat_dim {
            return Err(ModelError::ShapeMismatch {
                what: "feature dimension", expected: self.feat_dim, actual: feat,
            });
        }
        if seq_len != self.max_len {
            return Err(ModelError::ShapeMismatch {
                what: "sequence length", expected: self.max_len, actual: seq_len,
            });
        }
        Ok(())
    }

    /// Validated forward pass: [batch, max_len, feat_dim] → [batch, max_len, d_model]
    pub fn encode(&self, x: Tensor<B, 3>) -> ModelResult<Tensor<B, 3>> {
        self.check_input(x.dims())?;
        Ok(Forward::forward(self, x))
    }
}

impl<B: Backend> Forward<B, 3, 3> for SequenceEncoder<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.input_projection.forward(x);
        let mut x = self.dropout.forward(self.positional.forward(x));
        for layer in &self.layers {
            x = layer.forward(x);
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::PositionalEncodingKind;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn small_config() -> EncoderConfig {
        EncoderConfig::new()
            .with_feat_dim(19)
            .with_max_len(12)
            .with_d_model(16)
            .with_num_heads(4)
            .with_dim_feedforward(32)
            .with_dropout(0.0)
    }

    #[test]
    fn test_output_shape_independent_of_depth() {
        let device = Default::default();
        for layers in [1, 2, 3] {
            let encoder = small_config()
                .with_num_layers(layers)
                .init::<TestBackend>(&device)
                .unwrap();
            let x = Tensor::<TestBackend, 3>::zeros([3, 12, 19], &device);
            assert_eq!(encoder.encode(x).unwrap().dims(), [3, 12, 16]);
        }
    }

    #[test]
    fn test_layernorm_relu_fixed_variant() {
        let device = Default::default();
        let encoder = small_config()
            .with_norm(NormKind::LayerNorm)
            .with_activation(ActivationKind::Relu)
            .with_pos_encoding(PositionalEncodingKind::Fixed)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::ones([2, 12, 19], &device);
        let out = encoder.encode(x).unwrap();
        assert_eq!(out.dims(), [2, 12, 16]);
        assert_eq!(encoder.positional.kind(), PositionalEncodingKind::Fixed);
    }

    #[test]
    fn test_feature_mismatch_fails_before_compute() {
        let device = Default::default();
        let encoder = small_config().init::<TestBackend>(&device).unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([2, 12, 18], &device);
        assert_eq!(
            encoder.encode(x).unwrap_err(),
            ModelError::ShapeMismatch { what: "feature dimension", expected: 19, actual: 18 }
        );
    }

    #[test]
    fn test_sequence_length_mismatch() {
        let device = Default::default();
        let encoder = small_config().init::<TestBackend>(&device).unwrap();
        assert!(matches!(
            encoder.check_input([2, 11, 19]),
            Err(ModelError::ShapeMismatch { what: "sequence length", .. })
        ));
    }

    #[test]
    fn test_empty_batch_and_zero_length_rejected() {
        let device = Default::default();
        let encoder = small_config().init::<TestBackend>(&device).unwrap();
        assert!(matches!(encoder.check_input([0, 12, 19]), Err(ModelError::InvalidInput(_))));
        assert!(matches!(encoder.check_input([2, 0, 19]), Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_frozen_batchnorm_matches_inference_batchnorm() {
        let device = Default::default();
        let frozen = Normalization::<TestBackend>::new(NormKind::BatchNorm, 16, true, &device);
        let live   = Normalization::<TestBackend>::new(NormKind::BatchNorm, 16, false, &device);
        let x = Tensor::<TestBackend, 3>::random([3, 12, 16], Distribution::Normal(2.0, 3.0), &device);

        let a: Vec<f32> = frozen.forward(x.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = live.forward(x).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_indivisible_heads_fail_at_construction() {
        let device = Default::default();
        let result = EncoderConfig::new()
            .with_d_model(128)
            .with_num_heads(3)
            .init::<TestBackend>(&device);
        assert!(matches!(result, Err(ModelError::InvalidConfig(_))));
    }
}
