// ============================================================
// Layer 2 - PrepareUseCase
// ============================================================
// Produces the two tokenized splits a trainer consumes:
//
//   Step 1: Pick a loader per split         (Layer 4 - data)
//   Step 2: Load train and eval records     (Layer 4 - data)
//   Step 3: Tokenize in batches             (Layer 4 - data)
//             train → 1 worker
//             eval  → eval_num_workers workers
//
// Both splits go through the same preprocessing settings.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::Result;

use crate::application::train_use_case::{DataSource, TrainConfig};
use crate::data::{
    dataset::{DatasetStats, QaDataset, TokenizedDataset},
    loader::{load_math_data, BbhLoader, DollyLoader, MathLoader},
    preprocessor::preprocess_batch,
};
use crate::domain::record::{Metrics, RecordBatch};
use crate::domain::traits::{ExperimentTracker, RecordSource, TextTokenizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Eval,
}

/// Tokenized train and eval splits.
pub struct PreparedData {
    pub train: TokenizedDataset,
    pub eval:  TokenizedDataset,
}

pub struct PrepareUseCase {
    config: TrainConfig,
}

impl PrepareUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Loader for one split. Math is the only source with separate
    /// files per split.
    pub fn source(&self, source: DataSource, split: Split) -> Box<dyn RecordSource> {
        let cfg = &self.config;
        match source {
            DataSource::Dolly => Box::new(DollyLoader::new(&cfg.dolly_file, cfg.seed)),
            DataSource::Bbh => Box::new(
                BbhLoader::new(&cfg.bbh_dir)
                    .with_sample(cfg.bbh_sample)
                    .with_seed(cfg.seed),
            ),
            DataSource::Math => match split {
                Split::Train => Box::new(MathLoader::new(&cfg.math_train_file)),
                Split::Eval  => Box::new(MathLoader::new(&cfg.math_test_file)),
            },
        }
    }

    /// Load the raw records of both splits.
    pub fn load(&self) -> Result<(QaDataset, QaDataset)> {
        let cfg = &self.config;
        if cfg.train_source == DataSource::Math && cfg.eval_source == DataSource::Math {
            return load_math_data(&cfg.math_train_file, &cfg.math_test_file);
        }

        let train = self.source(cfg.train_source, Split::Train).load()?;
        let eval  = self.source(cfg.eval_source, Split::Eval).load()?;
        Ok((train, eval))
    }

    pub fn execute(&self, tokenizer: &dyn TextTokenizer) -> Result<PreparedData> {
        let cfg = &self.config;
        tracing::info!(
            "Preparing data: train={} eval={}",
            cfg.train_source,
            cfg.eval_source
        );
        let (train_raw, eval_raw) = self.load()?;
        tracing::info!(
            "Loaded {} train and {} eval records",
            train_raw.num_rows(),
            eval_raw.num_rows()
        );

        let pp = cfg.preprocess_config();
        if pp.debug {
            tracing::warn!("Debug mode: keeping only the first rows of every batch");
        }
        let preprocess = |batch: &RecordBatch| preprocess_batch(batch, tokenizer, &pp);

        let train = train_raw.map_batched(cfg.map_batch_size, 1, preprocess)?;
        let eval  = eval_raw.map_batched(cfg.map_batch_size, cfg.eval_num_workers, preprocess)?;

        tracing::info!(
            "Tokenized {} train and {} eval rows ({:?})",
            train.num_rows(),
            eval.num_rows(),
            pp.padding()
        );
        Ok(PreparedData { train, eval })
    }
}

fn stats_metrics<'a>(prefix: &'a str, s: &DatasetStats) -> impl Iterator<Item = (String, f64)> + 'a {
    [
        ("rows",           s.rows as f64),
        ("max_input_len",  s.max_input_len as f64),
        ("max_label_len",  s.max_label_len as f64),
        ("mean_input_len", s.mean_input_len),
        ("mean_label_len", s.mean_label_len),
    ]
    .into_iter()
    .map(move |(k, v)| (format!("{prefix}_{k}"), v))
}

/// Report split sizes and sequence lengths at step 0.
pub fn log_dataset_stats(tracker: &mut dyn ExperimentTracker, data: &PreparedData) -> Result<()> {
    let metrics: Metrics = stats_metrics("train", &data.train.stats())
        .chain(stats_metrics("eval", &data.eval.stats()))
        .collect();
    tracker.log_metrics(0, &metrics)
}
