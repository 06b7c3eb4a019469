// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with `clap` and hands a TrainConfig
// to Layer 2. There are no subcommands: every invocation is
// one training job.
//
//   overshoot-cifar --run_name exp --model resnet --overshoot 0.9
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::train_use_case::TrainUseCase;

/// Top-level parser; clap generates the argument handling
#[derive(Parser, Debug)]
#[command(
    name = "overshoot-cifar",
    version,
    about = "Train a CIFAR-10 classifier with momentum SGD or overshoot SGD."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    /// Converts the args into a TrainConfig and runs every seed.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            "Starting run '{}' with model {} (lr={}, overshoot={})",
            self.train.run_name, self.train.model, self.train.lr, self.train.overshoot.unwrap_or(0.0)
        );

        let use_case = TrainUseCase::new(self.train.into());
        let reports  = use_case.execute()?;

        for report in &reports {
            match report.history.last() {
                Some(last) => println!(
                    "Seed {}: final val_acc={:.2}% → {}",
                    report.seed, last.val_acc, report.dir.display()
                ),
                None => println!("Seed {}: no epochs run → {}", report.seed, report.dir.display()),
            }
        }
        Ok(())
    }
}
