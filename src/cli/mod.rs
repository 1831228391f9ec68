// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains the classifier on CSV recordings
//   2. `evaluate` — scores a saved checkpoint on recordings

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "motion-classifier",
    version,
    about = "Train a transformer classifier on motion-sensor windows, then evaluate it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on recordings in: {}", args.train_dir);
    let checkpoint_dir = args.checkpoint_dir.clone();

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoints saved to '{checkpoint_dir}'.");
    if let Some(f1) = report.best_f1 {
        println!("Best macro F1:  {f1:.4}");
    }
    if let Some(loss) = report.best_val_loss {
        println!("Best val loss:  {loss:.4}");
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(
        args.checkpoint_dir,
        args.data_dir,
        args.artifact,
        args.batch_size,
    );
    let report = use_case.execute()?;
    let s = report.summary;

    println!("\nWindows:   {}", s.samples);
    println!("Loss:      {:.4}", s.loss);
    println!("Accuracy:  {:.2}%", s.accuracy * 100.0);
    println!("Macro F1:  {:.4}", s.macro_f1);
    println!("Micro F1:  {:.4}", s.micro_f1);
    println!("\nPer-class F1:");
    for (label, f1) in &report.per_class_f1 {
        println!("  {label:<20} {f1:.4}");
    }
    Ok(())
}
