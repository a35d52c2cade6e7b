// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// clap parses the flags into a TrainConfig; everything else is
// delegated to Layers 2 and 6.
//
//   prepare → validate config, resolve and load the tokenizer
//           → open tracker run (FileTracker, or TracingTracker
//             with --no-track)
//           → tokenize both splits
//           → log dataset stats, export for the trainer
//           → close tracker run (always)
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs};

use crate::application::prepare_use_case::{log_dataset_stats, PrepareUseCase};
use crate::application::train_use_case::{close_run, TrainConfig};
use crate::domain::traits::{ExperimentTracker, TextTokenizer};
use crate::infra::{
    export::{export_prepared, ExportPaths},
    metrics::{FileTracker, TracingTracker},
    tokenizer_store::TokenizerStore,
};
use crate::ml::trainer::TrainingArguments;

#[derive(Parser, Debug)]
#[command(
    name = "instruct-tune",
    version = "0.1.0",
    about = "Prepare instruction-tuning data (Dolly, Big-Bench-Hard, grade-school math) for a seq2seq trainer."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    let cfg: TrainConfig = args.into();
    cfg.validate()?;
    let tokenizer = TokenizerStore::resolve(&cfg.model)?.load()?;

    let mut tracker: Box<dyn ExperimentTracker> = if cfg.no_track {
        Box::new(TracingTracker::new(&cfg.run_name))
    } else {
        Box::new(FileTracker::new(&cfg.output_dir, &cfg.project, &cfg.run_name)?)
    };

    let result = prepare_and_export(&cfg, &tokenizer, tracker.as_mut());
    let paths  = close_run(tracker.as_mut(), result)?;

    println!("Prepared data written:");
    println!("  {}", paths.train.display());
    println!("  {}", paths.eval.display());
    println!("  {}", paths.args.display());
    Ok(())
}

fn prepare_and_export(
    cfg:       &TrainConfig,
    tokenizer: &dyn TextTokenizer,
    tracker:   &mut dyn ExperimentTracker,
) -> Result<ExportPaths> {
    tracker.log_config(&serde_json::to_value(cfg)?)?;

    let prepared = PrepareUseCase::new(cfg.clone()).execute(tokenizer)?;
    log_dataset_stats(tracker, &prepared)?;

    let args = TrainingArguments::from_config(cfg, tracker.name());
    export_prepared(&cfg.output_dir, &prepared.train, &prepared.eval, &args)
}
