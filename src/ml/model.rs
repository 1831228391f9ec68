// ============================================================
// Layer 5 — Motion Classifier Model
// ============================================================
// Explicit composition of the three stages:
//
//   [batch, 150, 19]
//        │  SequenceEncoder          (Forward<B, 3, 3>)
//   [batch, 150, d_model]
//        │  GlobalTemporalAttention  (Forward<B, 3, 2>)
//   [batch, d_model]
//        │  ClassificationHead       (Forward<B, 2, 2>)
//   [batch, n_classes]   raw logits
//
// Initialisation is seeded explicitly: the seed is passed to
// `init` and applied to the backend RNG right before any
// parameter is created, so two inits with the same config and
// seed give identical weights.

use burn::{
    module::ModuleVisitor,
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::error::{ModelError, ModelResult};
use crate::ml::{
    config::EncoderConfig,
    encoder::SequenceEncoder,
    forward::Forward,
    head::ClassificationHead,
    pooling::{GlobalTemporalAttention, TemporalAttentionConfig},
};

// ─── MotionClassifierConfig ───────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct MotionClassifierConfig {
    pub encoder: EncoderConfig,

    /// Number of activity classes (≥ 2)
    pub n_classes: usize,
}

impl MotionClassifierConfig {
    pub fn validate(&self) -> ModelResult<()> {
        self.encoder.validate()?;
        if self.n_classes < 2 {
            return Err(ModelError::InvalidConfig(format!(
                "n_classes must be at least 2, got {}",
                self.n_classes
            )));
        }
        Ok(())
    }

    /// Build the model with weights drawn from a backend RNG seeded with `seed`.
    pub fn init<B: Backend>(&self, device: &B::Device, seed: u64) -> ModelResult<MotionClassifier<B>> {
        self.validate()?;
        B::seed(seed);
        let model = self.build(device)?;
        // Parameters are sampled lazily; draw them now while the
        // RNG still holds the seed's stream.
        model.visit(&mut Materialize);

        tracing::info!(
            "Model ready: {} layers, d_model={}, {} classes (seed {})",
            self.encoder.num_layers, self.encoder.d_model, self.n_classes, seed
        );
        Ok(model)
    }

    /// Module skeleton for `load_record`; weights come from the current
    /// backend RNG state and are meant to be overwritten.
    pub fn init_for_record<B: Backend>(&self, device: &B::Device) -> ModelResult<MotionClassifier<B>> {
        self.validate()?;
        self.build(device)
    }

    fn build<B: Backend>(&self, device: &B::Device) -> ModelResult<MotionClassifier<B>> {
        let encoder = self.encoder.init(device)?;
        let pooling = TemporalAttentionConfig::new(self.encoder.d_model)
            .with_dropout(self.encoder.dropout)
            .init(device);
        let head = ClassificationHead::new(self.encoder.d_model, self.n_classes, device);

        Ok(MotionClassifier { encoder, pooling, head })
    }
}

/// Visiting a parameter reads it, which forces its initializer to run.
struct Materialize;

impl<B: Backend> ModuleVisitor<B> for Materialize {}

// ─── MotionClassifier ─────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct MotionClassifier<B: Backend> {
    pub encoder: SequenceEncoder<B>,
    pub pooling: GlobalTemporalAttention<B>,
    pub head:    ClassificationHead<B>,
}

impl<B: Backend> MotionClassifier<B> {
    /// sequences: [batch, max_len, feat_dim] → logits: [batch, n_classes]
    pub fn forward(&self, sequences: Tensor<B, 3>) -> ModelResult<Tensor<B, 2>> {
        let encoded = self.encoder.encode(sequences)?;
        let pooled  = self.pooling.forward(encoded);
        Ok(self.head.forward(pooled))
    }

    /// Logits plus mean cross-entropy against integer labels.
    pub fn forward_loss(
        &self,
        sequences: Tensor<B, 3>,
        labels:    Tensor<B, 1, Int>,
    ) -> ModelResult<(Tensor<B, 1>, Tensor<B, 2>)> {
        let [batch] = labels.dims();
        if batch != sequences.dims()[0] {
            return Err(ModelError::ShapeMismatch {
                what: "label count", expected: sequences.dims()[0], actual: batch,
            });
        }

        let logits = self.forward(sequences)?;
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        Ok((loss, logits))
    }

    /// Class probabilities per window: [batch, n_classes], rows sum to 1
    pub fn predict_proba(&self, sequences: Tensor<B, 3>) -> ModelResult<Tensor<B, 2>> {
        Ok(softmax(self.forward(sequences)?, 1))
    }

    /// Temporal attention weights per window: [batch, max_len]
    pub fn attention_weights(&self, sequences: Tensor<B, 3>) -> ModelResult<Tensor<B, 2>> {
        let encoded = self.encoder.encode(sequences)?;
        Ok(self.pooling.attention_weights(encoded))
    }

    pub fn n_classes(&self) -> usize {
        self.head.n_classes
    }

    pub fn is_frozen(&self) -> bool {
        self.encoder.frozen
    }

    /// Take the weights (and BatchNorm statistics) of a trained encoder.
    /// This model's own freeze flag and dropout stay in effect.
    pub fn with_pretrained_encoder(mut self, pretrained: SequenceEncoder<B>) -> ModelResult<Self> {
        let ours = &self.encoder;
        let dims = [
            ("feature dimension", ours.feat_dim, pretrained.feat_dim),
            ("sequence length", ours.max_len, pretrained.max_len),
            ("d_model", ours.d_model, pretrained.d_model),
            ("layer count", ours.layers.len(), pretrained.layers.len()),
        ];
        for (what, expected, actual) in dims {
            if expected != actual {
                return Err(ModelError::ShapeMismatch { what, expected, actual });
            }
        }
        if ours.positional.kind() != pretrained.positional.kind() {
            return Err(ModelError::InvalidConfig(format!(
                "pretrained encoder uses {} positional encoding, this model {}",
                pretrained.positional.kind(),
                ours.positional.kind()
            )));
        }

        self.encoder = self.encoder.load_record(pretrained.into_record()).apply_freeze();
        Ok(self)
    }

    /// Re-apply the encoder freeze flag (after loading a record).
    pub fn apply_freeze(mut self) -> Self {
        self.encoder = self.encoder.apply_freeze();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{ActivationKind, NormKind, PositionalEncodingKind};
    use burn::{
        backend::{Autodiff, NdArray},
        module::AutodiffModule,
        optim::{AdamConfig, GradientsParams, Optimizer},
        tensor::Distribution,
    };

    type TestBackend  = NdArray<f32>;
    type TestAutodiff = Autodiff<NdArray<f32>>;

    fn tiny_config(freeze: bool) -> MotionClassifierConfig {
        let encoder = EncoderConfig::new()
            .with_max_len(12)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_dim_feedforward(32)
            .with_dropout(0.0)
            .with_freeze(freeze);
        MotionClassifierConfig::new(encoder, 3)
    }

    fn weights<B: Backend>(param: Tensor<B, 2>) -> Vec<f32> {
        param.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_reference_configuration_logit_shape() {
        let device = Default::default();
        let encoder = EncoderConfig::new()
            .with_feat_dim(19)
            .with_max_len(150)
            .with_d_model(128)
            .with_num_heads(4)
            .with_num_layers(2)
            .with_dim_feedforward(512)
            .with_dropout(0.0)
            .with_pos_encoding(PositionalEncodingKind::Learnable)
            .with_activation(ActivationKind::Gelu)
            .with_norm(NormKind::BatchNorm);
        let model = MotionClassifierConfig::new(encoder, 5)
            .init::<TestBackend>(&device, 42)
            .unwrap();

        let x = Tensor::<TestBackend, 3>::zeros([8, 150, 19], &device);
        assert_eq!(model.forward(x).unwrap().dims(), [8, 5]);
    }

    #[test]
    fn test_three_heads_over_128_is_a_config_error() {
        let device = Default::default();
        let encoder = EncoderConfig::new().with_d_model(128).with_num_heads(3);
        let result = MotionClassifierConfig::new(encoder, 5).init::<TestBackend>(&device, 0);
        assert!(matches!(result, Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_single_class_rejected() {
        let cfg = MotionClassifierConfig::new(EncoderConfig::new(), 1);
        assert!(matches!(cfg.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_label_count_must_match_batch() {
        let device = Default::default();
        let model = tiny_config(false).init::<TestBackend>(&device, 1).unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([2, 12, 19], &device);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2], &device);
        assert!(matches!(
            model.forward_loss(x, labels),
            Err(ModelError::ShapeMismatch { what: "label count", .. })
        ));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let model = tiny_config(false).init::<TestBackend>(&device, 3).unwrap();
        let x = Tensor::<TestBackend, 3>::random([4, 12, 19], Distribution::Normal(0.0, 1.0), &device);

        let probs: Vec<f32> = model.predict_proba(x).unwrap().into_data().to_vec().unwrap();
        for row in probs.chunks(3) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_frozen_encoder_is_untouched_by_optimizer() {
        let device = Default::default();
        let model = tiny_config(true).init::<TestAutodiff>(&device, 11).unwrap();
        assert!(model.is_frozen());

        let enc_before  = weights(model.encoder.input_projection.weight.val());
        let ffn_before  = weights(model.encoder.layers[0].ffn_linear1.weight.val());
        let head_before = weights(model.head.linear.weight.val());

        let x = Tensor::<TestAutodiff, 3>::random([4, 12, 19], Distribution::Normal(0.0, 1.0), &device);
        let labels = Tensor::<TestAutodiff, 1, Int>::from_ints([0, 1, 2, 0], &device);
        let (loss, _) = model.forward_loss(x, labels).unwrap();

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let mut optim = AdamConfig::new().init();
        let model = optim.step(1e-2, model, grads);

        assert_eq!(enc_before, weights(model.encoder.input_projection.weight.val()));
        assert_eq!(ffn_before, weights(model.encoder.layers[0].ffn_linear1.weight.val()));
        assert_ne!(head_before, weights(model.head.linear.weight.val()));
    }

    #[test]
    fn test_frozen_batchnorm_encoder_keeps_inference_output() {
        let device = Default::default();
        let config = tiny_config(true);
        assert_eq!(config.encoder.norm, NormKind::BatchNorm);
        let model = config.init::<TestAutodiff>(&device, 5).unwrap();

        let x_eval = Tensor::<TestBackend, 3>::random([2, 12, 19], Distribution::Normal(0.0, 1.0), &device);
        let encode = |m: &MotionClassifier<TestAutodiff>| -> Vec<f32> {
            m.valid().encoder.encode(x_eval.clone()).unwrap().into_data().to_vec().unwrap()
        };
        let before = encode(&model);

        // Shifted, widened inputs would move any live batch statistics
        let x = Tensor::<TestAutodiff, 3>::random([4, 12, 19], Distribution::Normal(3.0, 5.0), &device);
        let labels = Tensor::<TestAutodiff, 1, Int>::from_ints([0, 1, 2, 0], &device);
        let (loss, _) = model.forward_loss(x, labels).unwrap();

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let mut optim = AdamConfig::new().init();
        let model = optim.step(1e-2, model, grads);

        assert_eq!(before, encode(&model));
    }

    #[test]
    fn test_pretrained_encoder_weights_are_adopted() {
        let device = Default::default();
        let donor  = tiny_config(false).init::<TestBackend>(&device, 21).unwrap();
        let model  = tiny_config(true).init::<TestBackend>(&device, 22).unwrap();
        let head_before = weights(model.head.linear.weight.val());

        let donor_proj = weights(donor.encoder.input_projection.weight.val());
        let donor_ffn  = weights(donor.encoder.layers[0].ffn_linear2.weight.val());
        let model = model.with_pretrained_encoder(donor.encoder).unwrap();

        assert!(model.is_frozen());
        assert_eq!(donor_proj, weights(model.encoder.input_projection.weight.val()));
        assert_eq!(donor_ffn, weights(model.encoder.layers[0].ffn_linear2.weight.val()));
        assert_eq!(head_before, weights(model.head.linear.weight.val()));
    }

    #[test]
    fn test_pretrained_encoder_of_other_depth_rejected() {
        let device = Default::default();
        let deeper = MotionClassifierConfig::new(tiny_config(false).encoder.with_num_layers(2), 3)
            .init::<TestBackend>(&device, 1)
            .unwrap();
        let model = tiny_config(false).init::<TestBackend>(&device, 2).unwrap();
        assert!(matches!(
            model.with_pretrained_encoder(deeper.encoder),
            Err(ModelError::ShapeMismatch { what: "layer count", expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_unfrozen_encoder_is_updated() {
        let device = Default::default();
        let model = tiny_config(false).init::<TestAutodiff>(&device, 11).unwrap();
        let enc_before = weights(model.encoder.input_projection.weight.val());

        let x = Tensor::<TestAutodiff, 3>::random([4, 12, 19], Distribution::Normal(0.0, 1.0), &device);
        let labels = Tensor::<TestAutodiff, 1, Int>::from_ints([0, 1, 2, 0], &device);
        let (loss, _) = model.forward_loss(x, labels).unwrap();

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let mut optim = AdamConfig::new().init();
        let model = optim.step(1e-2, model, grads);

        assert_ne!(enc_before, weights(model.encoder.input_projection.weight.val()));
    }
}
