// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// One subcommand, `prepare`, with every run option as a flag.
// Defaults match TrainConfig::default().
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::{DataSource, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, clean and tokenize the train/eval splits and export
    /// them with the trainer arguments
    Prepare(PrepareArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Model directory containing tokenizer.json, or the file itself
    #[arg(short, long)]
    pub model: String,

    /// Where prepared data, trainer arguments and run files go
    #[arg(short, long, default_value = "./models")]
    pub output_dir: PathBuf,

    /// Seed for the Dolly coin flip and BBH sampling
    #[arg(short, long, default_value_t = 0)]
    pub seed: u64,

    #[arg(short, long, default_value_t = 10)]
    pub epochs: usize,

    /// Ask the trainer to train (do_train)
    #[arg(short, long)]
    pub train: bool,

    /// Per-device batch size; 1 disables padding
    #[arg(short = 'b', long, default_value_t = 16)]
    pub train_batch_size: usize,

    /// Keep only the first three rows of every preprocessing batch
    #[arg(short, long)]
    pub debug: bool,

    #[arg(long, default_value_t = 200)]
    pub eval_steps: usize,

    /// Gradient accumulation steps
    #[arg(long, default_value_t = 4)]
    pub accum: usize,

    #[arg(long)]
    pub overwrite_cache: bool,

    #[arg(long, default_value_t = 1024)]
    pub max_source_length: usize,

    #[arg(long, default_value_t = 256)]
    pub max_target_length: usize,

    /// BBH examples to draw; zero or negative keeps all of them
    #[arg(long, default_value_t = 200, allow_negative_numbers = true)]
    pub bbh_sample: i64,

    /// dolly, bbh or math
    #[arg(long, default_value = "dolly")]
    pub train_source: DataSource,

    /// dolly, bbh or math
    #[arg(long, default_value = "bbh")]
    pub eval_source: DataSource,

    #[arg(long, default_value = "./dolly/data/databricks-dolly-15k.jsonl")]
    pub dolly_file: PathBuf,

    #[arg(long, default_value = "./Big-Bench-Hard/bbh")]
    pub bbh_dir: PathBuf,

    #[arg(long, default_value = "./grade-school-math/grade_school_math/data/train.jsonl")]
    pub math_train_file: PathBuf,

    #[arg(long, default_value = "./grade-school-math/grade_school_math/data/test.jsonl")]
    pub math_test_file: PathBuf,

    /// Rows per preprocessing call
    #[arg(long, default_value_t = 1000)]
    pub map_batch_size: usize,

    /// Parallel preprocessing workers for the eval split
    #[arg(long, default_value_t = 8)]
    pub eval_num_workers: usize,

    #[arg(long, default_value = "Instruction Tuning Exploration")]
    pub project: String,

    #[arg(long, default_value = "test")]
    pub run_name: String,

    /// Log the run through tracing instead of run files
    #[arg(long)]
    pub no_track: bool,
}

impl From<PrepareArgs> for TrainConfig {
    fn from(a: PrepareArgs) -> Self {
        TrainConfig {
            model:             a.model,
            output_dir:        a.output_dir,
            seed:              a.seed,
            epochs:            a.epochs,
            train:             a.train,
            train_batch_size:  a.train_batch_size,
            eval_steps:        a.eval_steps,
            accum:             a.accum,
            overwrite_cache:   a.overwrite_cache,
            debug:             a.debug,
            max_source_length: a.max_source_length,
            max_target_length: a.max_target_length,
            bbh_sample:        a.bbh_sample,
            train_source:      a.train_source,
            eval_source:       a.eval_source,
            dolly_file:        a.dolly_file,
            bbh_dir:           a.bbh_dir,
            math_train_file:   a.math_train_file,
            math_test_file:    a.math_test_file,
            map_batch_size:    a.map_batch_size,
            eval_num_workers:  a.eval_num_workers,
            project:           a.project,
            run_name:          a.run_name,
            no_track:          a.no_track,
        }
    }
}
