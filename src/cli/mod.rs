// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. The only
// printing in the crate happens here and in the epoch summary.
//
//   1. `train`        - train the BAN model on JSON-lines records
//   2. `ask`          - load a checkpoint and rank answers
//   3. `write-config` - dump the default NetConfig
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::config::Config;
use clap::Parser;
use std::path::Path;

use commands::{AskArgs, Commands, TrainArgs, WriteConfigArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ban-vqa",
    version,
    about = "Train a bilinear attention network for visual question answering, then ask it questions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)       => run_train(args),
            Commands::Ask(args)         => run_ask(args),
            Commands::WriteConfig(args) => run_write_config(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};

    tracing::info!("Starting training on records in: {}", args.data);

    let config = TrainConfig::try_from(args)?;
    let checkpoint_dir = config.checkpoint_dir.clone();
    TrainUseCase::new(config).execute()?;

    println!("Training complete. Checkpoints saved in '{checkpoint_dir}'.");
    Ok(())
}

fn run_ask(args: AskArgs) -> Result<()> {
    use crate::application::ask_use_case::AskUseCase;

    let use_case = AskUseCase::new(&args.checkpoint_dir)?;
    let answers  = use_case.answer(&args.question, Path::new(&args.image), args.top_k)?;

    if answers.is_empty() {
        println!("\nNo answer (empty answer space).");
        return Ok(());
    }
    println!("\nQ: {}", args.question);
    for (rank, p) in answers.iter().enumerate() {
        println!("{:>2}. {:<20} {:.3}", rank + 1, p.answer, p.score);
    }
    Ok(())
}

fn run_write_config(args: WriteConfigArgs) -> Result<()> {
    use crate::ml::model::NetConfig;

    NetConfig::new().save(&args.out)?;
    println!("Default model config written to '{}'.", args.out);
    Ok(())
}
