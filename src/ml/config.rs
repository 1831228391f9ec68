// ============================================================
// Layer 5 — Model Configuration
// ============================================================
// Immutable records consumed once at model construction.
//
//   EncoderConfig     — shape and architecture of the encoder
//   ClassifierConfig  — optimiser settings for the joint model
//
// Both derive burn's Config, which gives us new()/with_*()
// builders and JSON (de)serialisation for snapshots.
//
// Kind enums parse case-insensitively so both `batchnorm` and
// the historical `BatchNorm` spelling are accepted on the CLI.
//
// Reference: Burn Book §3 (Config)

use std::{fmt, str::FromStr};

use burn::config::Config;
use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::window::{FEATURE_DIM, WINDOW_LEN};

// ─── Kinds ────────────────────────────────────────────────────────────────────

/// How order information is injected into the projected input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionalEncodingKind {
    /// Trainable (max_len × d_model) table
    Learnable,
    /// Deterministic sinusoids
    Fixed,
}

/// Non-linearity inside the position-wise feedforward sub-layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    Gelu,
    Relu,
}

/// Normalisation applied after every residual connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    /// Statistics over (batch, time) per channel
    BatchNorm,
    /// Statistics over channels per time step
    LayerNorm,
}

impl FromStr for PositionalEncodingKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "learnable" => Ok(Self::Learnable),
            "fixed" | "sinusoidal" => Ok(Self::Fixed),
            other => Err(ModelError::InvalidConfig(format!(
                "unknown positional encoding '{other}' (expected learnable|fixed)"
            ))),
        }
    }
}

impl FromStr for ActivationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gelu" => Ok(Self::Gelu),
            "relu" => Ok(Self::Relu),
            other => Err(ModelError::InvalidConfig(format!(
                "unknown activation '{other}' (expected gelu|relu)"
            ))),
        }
    }
}

impl FromStr for NormKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batchnorm" | "batch" => Ok(Self::BatchNorm),
            "layernorm" | "layer" => Ok(Self::LayerNorm),
            other => Err(ModelError::InvalidConfig(format!(
                "unknown normalization '{other}' (expected batchnorm|layernorm)"
            ))),
        }
    }
}

impl fmt::Display for PositionalEncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Learnable => "learnable",
            Self::Fixed     => "fixed",
        })
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gelu => "gelu",
            Self::Relu => "relu",
        })
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BatchNorm => "batchnorm",
            Self::LayerNorm => "layernorm",
        })
    }
}

// ─── EncoderConfig ────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Channels per time step of the input
    #[config(default = 19)]
    pub feat_dim: usize,

    /// Time steps per window
    #[config(default = 150)]
    pub max_len: usize,

    /// Embedding width used throughout the encoder
    #[config(default = 128)]
    pub d_model: usize,

    /// Attention heads per block; must divide d_model
    #[config(default = 4)]
    pub num_heads: usize,

    /// Stacked encoder blocks (≥ 1)
    #[config(default = 4)]
    pub num_layers: usize,

    /// Hidden width of the feedforward sub-layer
    #[config(default = 512)]
    pub dim_feedforward: usize,

    /// Dropout probability, only active while training
    #[config(default = 0.1)]
    pub dropout: f64,

    #[config(default = "PositionalEncodingKind::Learnable")]
    pub pos_encoding: PositionalEncodingKind,

    #[config(default = "ActivationKind::Gelu")]
    pub activation: ActivationKind,

    #[config(default = "NormKind::BatchNorm")]
    pub norm: NormKind,

    /// Exclude encoder parameters from gradient updates
    #[config(default = false)]
    pub freeze: bool,
}

impl EncoderConfig {
    /// Check every invariant the encoder relies on.
    pub fn validate(&self) -> ModelResult<()> {
        let positive = [
            ("feat_dim", self.feat_dim),
            ("max_len", self.max_len),
            ("d_model", self.d_model),
            ("num_heads", self.num_heads),
            ("num_layers", self.num_layers),
            ("dim_feedforward", self.dim_feedforward),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ModelError::InvalidConfig(format!("{name} must be greater than 0")));
            }
        }

        if self.d_model % self.num_heads != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        // Sinusoids pair a sin and a cos channel per frequency
        if self.pos_encoding == PositionalEncodingKind::Fixed && self.d_model % 2 != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "fixed positional encoding needs an even d_model, got {}",
                self.d_model
            )));
        }

        Ok(())
    }

    /// Check that encoder weights saved under `saved` fit an encoder
    /// built from `self`. Dropout and the freeze flag may differ.
    pub fn check_compatible(&self, saved: &EncoderConfig) -> ModelResult<()> {
        let dims = [
            ("feat_dim", self.feat_dim, saved.feat_dim),
            ("max_len", self.max_len, saved.max_len),
            ("d_model", self.d_model, saved.d_model),
            ("num_heads", self.num_heads, saved.num_heads),
            ("num_layers", self.num_layers, saved.num_layers),
            ("dim_feedforward", self.dim_feedforward, saved.dim_feedforward),
        ];
        for (name, ours, theirs) in dims {
            if ours != theirs {
                return Err(ModelError::InvalidConfig(format!(
                    "pretrained encoder has {name}={theirs}, this model needs {ours}"
                )));
            }
        }

        if (self.pos_encoding, self.activation, self.norm)
            != (saved.pos_encoding, saved.activation, saved.norm)
        {
            return Err(ModelError::InvalidConfig(format!(
                "pretrained encoder is {}/{}/{}, this model is {}/{}/{}",
                saved.pos_encoding, saved.activation, saved.norm,
                self.pos_encoding, self.activation, self.norm,
            )));
        }
        Ok(())
    }
}

// ─── ClassifierConfig ─────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Peak learning rate reached at the end of warmup
    #[config(default = 5e-4)]
    pub learning_rate: f64,

    /// Optimiser steps of linear warmup (0 disables warmup)
    #[config(default = 200)]
    pub warmup: usize,

    /// L2 penalty applied by the optimiser
    #[config(default = 1e-6)]
    pub weight_decay: f64,
}

impl ClassifierConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "weight_decay must be ≥ 0, got {}",
                self.weight_decay
            )));
        }
        Ok(())
    }
}

/// Encoder defaults matching the standard 150 × 19 sensor window.
pub fn default_window_encoder() -> EncoderConfig {
    EncoderConfig::new()
        .with_feat_dim(FEATURE_DIM)
        .with_max_len(WINDOW_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(default_window_encoder().validate().is_ok());
        assert!(ClassifierConfig::new().validate().is_ok());
    }

    #[test]
    fn test_indivisible_heads_rejected() {
        let cfg = EncoderConfig::new().with_d_model(128).with_num_heads(3);
        match cfg.validate() {
            Err(ModelError::InvalidConfig(msg)) => assert!(msg.contains("divisible")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_layers_rejected() {
        let cfg = EncoderConfig::new().with_num_layers(0);
        assert!(matches!(cfg.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_dropout_range() {
        assert!(EncoderConfig::new().with_dropout(1.0).validate().is_err());
        assert!(EncoderConfig::new().with_dropout(-0.1).validate().is_err());
        assert!(EncoderConfig::new().with_dropout(0.0).validate().is_ok());
    }

    #[test]
    fn test_fixed_encoding_needs_even_width() {
        let cfg = EncoderConfig::new()
            .with_d_model(6)
            .with_num_heads(3)
            .with_pos_encoding(PositionalEncodingKind::Fixed);
        assert!(cfg.clone().validate().is_ok());
        assert!(cfg.with_d_model(9).validate().is_err());
    }

    #[test]
    fn test_kind_parsing_is_case_insensitive() {
        assert_eq!("BatchNorm".parse::<NormKind>().unwrap(), NormKind::BatchNorm);
        assert_eq!("layernorm".parse::<NormKind>().unwrap(), NormKind::LayerNorm);
        assert_eq!("GELU".parse::<ActivationKind>().unwrap(), ActivationKind::Gelu);
        assert_eq!(
            "learnable".parse::<PositionalEncodingKind>().unwrap(),
            PositionalEncodingKind::Learnable
        );
        assert!("swish".parse::<ActivationKind>().is_err());
    }

    #[test]
    fn test_pretrained_compatibility_ignores_dropout_and_freeze() {
        let saved = default_window_encoder().with_dropout(0.3);
        let target = default_window_encoder().with_freeze(true);
        assert!(target.check_compatible(&saved).is_ok());

        let narrower = default_window_encoder().with_d_model(64);
        match narrower.check_compatible(&saved) {
            Err(ModelError::InvalidConfig(msg)) => assert!(msg.contains("d_model=128")),
            other => panic!("expected configuration error, got {other:?}"),
        }

        let layer_norm = default_window_encoder().with_norm(NormKind::LayerNorm);
        assert!(layer_norm.check_compatible(&saved).is_err());
    }

    #[test]
    fn test_non_positive_learning_rate_rejected() {
        assert!(ClassifierConfig::new().with_learning_rate(0.0).validate().is_err());
        assert!(ClassifierConfig::new().with_learning_rate(f64::NAN).validate().is_err());
    }
}
