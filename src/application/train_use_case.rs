// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Runs one experiment end to end:
//
//   Step 1: Log the run configuration      (tracker)
//   Step 2: Load and tokenize both splits  (PrepareUseCase)
//   Step 3: Derive TrainingArguments       (Layer 5 - ml)
//   Step 4: Evaluate, then train           (Layer 5 - ml)
//   Step 5: Close the run                  (tracker)
//
// Step 5 happens whatever the outcome of steps 1-4; a failed
// run is closed with RunStatus::Failed before the error is
// returned.
//
// Reference: Rust Book §9 (Error Handling)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use crate::application::prepare_use_case::{log_dataset_stats, PrepareUseCase};
use crate::data::preprocessor::PreprocessConfig;
use crate::domain::record::Metrics;
use crate::domain::traits::{EvalMetric, ExperimentTracker, RunStatus, TextTokenizer};
use crate::ml::evaluation::Evaluator;
use crate::ml::trainer::{run_trainer, Seq2SeqTrainer, TrainerContext, TrainingArguments};

// ─── Data Sources ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Dolly,
    Bbh,
    Math,
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dolly" => Ok(DataSource::Dolly),
            "bbh"   => Ok(DataSource::Bbh),
            "math"  => Ok(DataSource::Math),
            other   => Err(format!("unknown data source '{other}' (expected dolly, bbh or math)")),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSource::Dolly => "dolly",
            DataSource::Bbh   => "bbh",
            DataSource::Math  => "math",
        };
        f.write_str(name)
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Every option of a run. Serialised as-is into the tracker's
// config record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model:             String,
    pub output_dir:        PathBuf,
    pub seed:              u64,
    pub epochs:            usize,
    pub train:             bool,
    pub train_batch_size:  usize,
    pub eval_steps:        usize,
    pub accum:             usize,
    pub overwrite_cache:   bool,
    pub debug:             bool,
    pub max_source_length: usize,
    pub max_target_length: usize,
    pub bbh_sample:        i64,
    pub train_source:      DataSource,
    pub eval_source:       DataSource,
    pub dolly_file:        PathBuf,
    pub bbh_dir:           PathBuf,
    pub math_train_file:   PathBuf,
    pub math_test_file:    PathBuf,
    pub map_batch_size:    usize,
    pub eval_num_workers:  usize,
    pub project:           String,
    pub run_name:          String,
    pub no_track:          bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model:             String::new(),
            output_dir:        PathBuf::from("./models"),
            seed:              0,
            epochs:            10,
            train:             false,
            train_batch_size:  16,
            eval_steps:        200,
            accum:             4,
            overwrite_cache:   false,
            debug:             false,
            max_source_length: 1024,
            max_target_length: 256,
            bbh_sample:        200,
            train_source:      DataSource::Dolly,
            eval_source:       DataSource::Bbh,
            dolly_file:        PathBuf::from("./dolly/data/databricks-dolly-15k.jsonl"),
            bbh_dir:           PathBuf::from("./Big-Bench-Hard/bbh"),
            math_train_file:   PathBuf::from("./grade-school-math/grade_school_math/data/train.jsonl"),
            math_test_file:    PathBuf::from("./grade-school-math/grade_school_math/data/test.jsonl"),
            map_batch_size:    1000,
            eval_num_workers:  8,
            project:           "Instruction Tuning Exploration".to_string(),
            run_name:          "test".to_string(),
            no_track:          false,
        }
    }
}

impl TrainConfig {
    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            bail!("--model must name a model directory or tokenizer.json");
        }
        let positive = [
            ("--max-source-length", self.max_source_length),
            ("--max-target-length", self.max_target_length),
            ("--train-batch-size",  self.train_batch_size),
            ("--eval-steps",        self.eval_steps),
            ("--accum",             self.accum),
            ("--map-batch-size",    self.map_batch_size),
            ("--eval-num-workers",  self.eval_num_workers),
        ];
        for (flag, value) in positive {
            if value == 0 {
                bail!("{flag} must be greater than zero");
            }
        }
        if self.run_name.trim().is_empty() {
            bail!("--run-name must not be empty");
        }
        Ok(())
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            max_source_length: self.max_source_length,
            max_target_length: self.max_target_length,
            train_batch_size:  self.train_batch_size,
            debug:             self.debug,
        }
    }
}

// ─── Run Lifecycle ───────────────────────────────────────────────────────────
/// Finish the tracker run with the status of `result`.
///
/// A finish error fails an otherwise successful run. When the run
/// already failed, its error wins and the finish error is only logged.
pub fn close_run<T>(tracker: &mut dyn ExperimentTracker, result: Result<T>) -> Result<T> {
    let status = if result.is_ok() { RunStatus::Succeeded } else { RunStatus::Failed };
    match (tracker.finish(status), result) {
        (Ok(()), result) => result,
        (Err(e), Ok(_)) => Err(e.context("Could not close tracker run")),
        (Err(e), Err(run_err)) => {
            tracing::warn!("Could not close tracker run: {e:#}");
            Err(run_err)
        }
    }
}

// ─── TrainUseCase ────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the experiment and close the tracker run.
    /// Returns the pre-training evaluation metrics.
    pub fn execute(
        &self,
        trainer:   &mut dyn Seq2SeqTrainer,
        tokenizer: &dyn TextTokenizer,
        metric:    &dyn EvalMetric,
        tracker:   &mut dyn ExperimentTracker,
    ) -> Result<Metrics> {
        let result = self.run(trainer, tokenizer, metric, tracker);
        close_run(tracker, result)
    }

    fn run(
        &self,
        trainer:   &mut dyn Seq2SeqTrainer,
        tokenizer: &dyn TextTokenizer,
        metric:    &dyn EvalMetric,
        tracker:   &mut dyn ExperimentTracker,
    ) -> Result<Metrics> {
        let cfg = &self.config;
        cfg.validate()?;
        tracker.log_config(&serde_json::to_value(cfg)?)?;

        let prepared = PrepareUseCase::new(cfg.clone()).execute(tokenizer)?;
        log_dataset_stats(tracker, &prepared)?;

        let args      = TrainingArguments::from_config(cfg, tracker.name());
        let evaluator = Evaluator::new(tokenizer, metric);
        let ctx = TrainerContext {
            args:          &args,
            train_dataset: &prepared.train,
            eval_dataset:  &prepared.eval,
            evaluator:     &evaluator,
        };

        run_trainer(trainer, &ctx, tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prepare_use_case::tests::fixture_config;
    use crate::data::preprocessor::tests::WordLenTokenizer;
    use crate::ml::evaluation::ExactMatch;
    use crate::ml::trainer::tests::{EchoTrainer, MemoryTracker};

    #[test]
    fn test_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("./models"));
        assert_eq!(cfg.train_batch_size, 16);
        assert_eq!(cfg.bbh_sample, 200);
        assert_eq!(cfg.train_source, DataSource::Dolly);
        assert_eq!(cfg.eval_source, DataSource::Bbh);
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        assert!(TrainConfig::default().validate().is_err());

        let ok = TrainConfig { model: "t5-small".into(), ..TrainConfig::default() };
        assert!(ok.validate().is_ok());

        let zero_len = TrainConfig { max_source_length: 0, ..ok.clone() };
        assert!(zero_len.validate().unwrap_err().to_string().contains("--max-source-length"));

        let zero_batch = TrainConfig { train_batch_size: 0, ..ok.clone() };
        assert!(zero_batch.validate().is_err());

        let zero_workers = TrainConfig { eval_num_workers: 0, ..ok };
        assert!(zero_workers.validate().is_err());
    }

    #[test]
    fn test_data_source_parsing() {
        assert_eq!("BBH".parse::<DataSource>().unwrap(), DataSource::Bbh);
        assert_eq!(DataSource::Math.to_string(), "math");
        assert!("squad".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_successful_run_closes_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture_config(dir.path());

        let mut trainer = EchoTrainer::default();
        let mut tracker = MemoryTracker::default();
        let baseline = TrainUseCase::new(cfg)
            .execute(&mut trainer, &WordLenTokenizer, &ExactMatch, &mut tracker)
            .unwrap();

        assert_eq!(trainer.calls, vec!["evaluate", "train"]);
        assert_eq!(baseline["accuracy"], 1.0);
        assert_eq!(tracker.config.as_ref().unwrap()["run_name"], "test");
        assert_eq!(tracker.finished, Some(RunStatus::Succeeded));
        assert!(tracker.metrics.iter().any(|(_, m)| m.contains_key("eval_accuracy")));
    }

    #[test]
    fn test_failed_training_closes_tracker_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture_config(dir.path());

        let mut trainer = EchoTrainer { fail_train: true, ..Default::default() };
        let mut tracker = MemoryTracker::default();
        let result = TrainUseCase::new(cfg)
            .execute(&mut trainer, &WordLenTokenizer, &ExactMatch, &mut tracker);

        assert!(result.is_err());
        assert_eq!(tracker.finished, Some(RunStatus::Failed));
    }

    /// Tracker whose `finish` always fails.
    #[derive(Default)]
    struct BrokenFinish(MemoryTracker);

    impl ExperimentTracker for BrokenFinish {
        fn name(&self) -> &str {
            "broken"
        }
        fn log_config(&mut self, config: &serde_json::Value) -> Result<()> {
            self.0.log_config(config)
        }
        fn log_metrics(&mut self, step: usize, metrics: &Metrics) -> Result<()> {
            self.0.log_metrics(step, metrics)
        }
        fn finish(&mut self, _: RunStatus) -> Result<()> {
            bail!("disk full")
        }
    }

    #[test]
    fn test_finish_error_fails_successful_run() {
        let err = close_run(&mut BrokenFinish::default(), Ok(7)).unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
    }

    #[test]
    fn test_finish_error_keeps_run_error() {
        let err = close_run::<()>(&mut BrokenFinish::default(), Err(anyhow::anyhow!("bad record")))
            .unwrap_err();
        assert_eq!(err.to_string(), "bad record");
    }

    #[test]
    fn test_close_run_reports_status() {
        let mut tracker = MemoryTracker::default();
        assert_eq!(close_run(&mut tracker, Ok(1)).unwrap(), 1);
        assert_eq!(tracker.finished, Some(RunStatus::Succeeded));

        let _ = close_run::<()>(&mut tracker, Err(anyhow::anyhow!("x")));
        assert_eq!(tracker.finished, Some(RunStatus::Failed));
    }

    #[test]
    fn test_successful_training_fails_when_finish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = EchoTrainer::default();
        let result = TrainUseCase::new(fixture_config(dir.path()))
            .execute(&mut trainer, &WordLenTokenizer, &ExactMatch, &mut BrokenFinish::default());
        assert!(result.is_err());
        assert_eq!(trainer.calls, vec!["evaluate", "train"]);
    }

    #[test]
    fn test_missing_data_still_closes_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            dolly_file: dir.path().join("missing.jsonl"),
            ..fixture_config(dir.path())
        };

        let mut trainer = EchoTrainer::default();
        let mut tracker = MemoryTracker::default();
        let result = TrainUseCase::new(cfg)
            .execute(&mut trainer, &WordLenTokenizer, &ExactMatch, &mut tracker);

        assert!(result.is_err());
        assert!(trainer.calls.is_empty());
        assert_eq!(tracker.finished, Some(RunStatus::Failed));
    }
}
