// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their flags. Defaults reproduce the reference run.

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::infra::checkpoint::Artifact;
use crate::ml::config::{ActivationKind, NormKind, PositionalEncodingKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier on labelled motion recordings
    Train(TrainArgs),

    /// Score a trained checkpoint on labelled recordings
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory laid out as <label>/*.csv
    #[arg(long, default_value = "data/supervised/train")]
    pub train_dir: String,

    /// Separate validation directory; omit to hold out --val-fraction
    #[arg(long)]
    pub val_dir: Option<String>,

    /// Where checkpoints, snapshot config and metrics.csv go
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Share of training windows held out when --val-dir is absent
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    /// Seeds weight init, the split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Peak learning rate
    #[arg(long, default_value_t = 5e-4)]
    pub lr: f64,

    /// Optimiser steps of linear warmup
    #[arg(long, default_value_t = 200)]
    pub warmup: usize,

    /// L2 penalty applied by Adam
    #[arg(long, default_value_t = 1e-6)]
    pub weight_decay: f64,

    /// Time steps per window
    #[arg(long, default_value_t = 150)]
    pub max_len: usize,

    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 512)]
    pub dim_feedforward: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// learnable | fixed
    #[arg(long, default_value = "learnable")]
    pub pos_encoding: PositionalEncodingKind,

    /// gelu | relu
    #[arg(long, default_value = "gelu")]
    pub activation: ActivationKind,

    /// batchnorm | layernorm
    #[arg(long, default_value = "batchnorm")]
    pub norm: NormKind,

    /// Keep encoder weights fixed; only pooling and head train
    #[arg(long)]
    pub freeze: bool,

    /// Checkpoint directory of an earlier run to take encoder weights from
    #[arg(long)]
    pub pretrained_encoder: Option<String>,

    /// Which artifact of --pretrained-encoder to use
    #[arg(long, default_value = "best_f1")]
    pub pretrained_artifact: Artifact,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_dir:       a.train_dir,
            val_dir:         a.val_dir,
            checkpoint_dir:  a.checkpoint_dir,
            val_fraction:    a.val_fraction,
            seed:            a.seed,
            epochs:          a.epochs,
            batch_size:      a.batch_size,
            lr:              a.lr,
            warmup:          a.warmup,
            weight_decay:    a.weight_decay,
            max_len:         a.max_len,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            dim_feedforward: a.dim_feedforward,
            dropout:         a.dropout,
            pos_encoding:    a.pos_encoding,
            activation:      a.activation,
            norm:            a.norm,
            freeze:          a.freeze,
            pretrained_encoder:  a.pretrained_encoder,
            pretrained_artifact: a.pretrained_artifact,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory laid out as <label>/*.csv
    #[arg(long, default_value = "data/supervised/val")]
    pub data_dir: String,

    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// best_f1 | best_val_loss | last
    #[arg(long, default_value = "best_f1")]
    pub artifact: Artifact,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
}

#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["motion-classifier", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let default = TrainConfig::default();

        assert_eq!(cfg.lr, default.lr);
        assert_eq!(cfg.batch_size, default.batch_size);
        assert_eq!(cfg.warmup, default.warmup);
        assert_eq!(cfg.norm, default.norm);
        assert_eq!(cfg.pos_encoding, default.pos_encoding);
        assert!(cfg.val_dir.is_none());
        assert!(cfg.pretrained_encoder.is_none());
        assert_eq!(cfg.pretrained_artifact, default.pretrained_artifact);
        assert!(!cfg.freeze);
    }

    #[test]
    fn test_kinds_parse_case_insensitively() {
        let cli = Cli::try_parse_from([
            "motion-classifier", "train", "--norm", "LayerNorm", "--activation", "ReLU",
            "--pos-encoding", "fixed", "--freeze",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.norm, NormKind::LayerNorm);
        assert_eq!(args.activation, ActivationKind::Relu);
        assert_eq!(args.pos_encoding, PositionalEncodingKind::Fixed);
        assert!(args.freeze);
    }

    #[test]
    fn test_pretrained_encoder_flags() {
        let cli = Cli::try_parse_from([
            "motion-classifier", "train", "--pretrained-encoder", "runs/pretrain",
            "--pretrained-artifact", "best-val-loss", "--freeze",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.pretrained_encoder.as_deref(), Some("runs/pretrain"));
        assert_eq!(cfg.pretrained_artifact, Artifact::BestValLoss);
        assert!(cfg.freeze);
    }

    #[test]
    fn test_evaluate_artifact_flag() {
        let cli = Cli::try_parse_from(["motion-classifier", "evaluate", "--artifact", "last"]).unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.artifact, Artifact::Last);
        assert!(Cli::try_parse_from(["motion-classifier", "train", "--norm", "groupnorm"]).is_err());
    }
}
