// ============================================================
// Layer 5 - Trainer Boundary
// ============================================================
// A Seq2SeqTrainer is whatever runs the model: a burn Learner
// fed through data::batcher, or an out-of-process framework.
// run_trainer drives it in a fixed order:
//
//   evaluate()  → baseline metrics, logged at step 0
//   train()     → always called; `do_train` is passed along in
//                 the arguments for the trainer to honour
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::TokenizedDataset;
use crate::domain::record::Metrics;
use crate::domain::traits::ExperimentTracker;
use crate::ml::evaluation::Evaluator;

/// When the trainer evaluates and saves. Runs are always step-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalStrategy {
    Steps,
}

/// Everything the trainer needs to know about the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArguments {
    pub model:                       String,
    pub output_dir:                  PathBuf,
    pub evaluation_strategy:         IntervalStrategy,
    pub eval_steps:                  usize,
    pub do_train:                    bool,
    pub num_train_epochs:            usize,
    pub save_strategy:               IntervalStrategy,
    pub save_steps:                  usize,
    pub per_device_train_batch_size: usize,
    pub per_device_eval_batch_size:  usize,
    pub gradient_accumulation_steps: usize,
    pub eval_accumulation_steps:     usize,
    pub report_to:                   String,
    pub seed:                        u64,
    pub overwrite_cache:             bool,
}

impl TrainingArguments {
    pub fn from_config(cfg: &TrainConfig, report_to: &str) -> Self {
        Self {
            model:                       cfg.model.clone(),
            output_dir:                  cfg.output_dir.clone(),
            evaluation_strategy:         IntervalStrategy::Steps,
            eval_steps:                  cfg.eval_steps,
            do_train:                    cfg.train,
            num_train_epochs:            cfg.epochs,
            save_strategy:               IntervalStrategy::Steps,
            save_steps:                  cfg.eval_steps * 4,
            per_device_train_batch_size: cfg.train_batch_size,
            per_device_eval_batch_size:  cfg.train_batch_size,
            gradient_accumulation_steps: cfg.accum,
            eval_accumulation_steps:     1,
            report_to:                   report_to.to_string(),
            seed:                        cfg.seed,
            overwrite_cache:             cfg.overwrite_cache,
        }
    }
}

/// Read-only inputs shared by both trainer calls.
pub struct TrainerContext<'a> {
    pub args:          &'a TrainingArguments,
    pub train_dataset: &'a TokenizedDataset,
    pub eval_dataset:  &'a TokenizedDataset,
    pub evaluator:     &'a Evaluator<'a>,
}

/// External training loop.
pub trait Seq2SeqTrainer {
    fn evaluate(
        &mut self,
        ctx:     &TrainerContext<'_>,
        tracker: &mut dyn ExperimentTracker,
    ) -> Result<Metrics>;

    fn train(
        &mut self,
        ctx:     &TrainerContext<'_>,
        tracker: &mut dyn ExperimentTracker,
    ) -> Result<()>;
}

/// Evaluate once, log the result, then train.
/// Returns the pre-training evaluation metrics.
pub fn run_trainer(
    trainer: &mut dyn Seq2SeqTrainer,
    ctx:     &TrainerContext<'_>,
    tracker: &mut dyn ExperimentTracker,
) -> Result<Metrics> {
    tracing::info!(
        "Evaluating on {} examples before training",
        ctx.eval_dataset.num_rows()
    );
    let baseline = trainer.evaluate(ctx, tracker)?;

    let prefixed: Metrics = baseline
        .iter()
        .map(|(k, v)| (format!("eval_{k}"), *v))
        .collect();
    tracker.log_metrics(0, &prefixed)?;

    tracing::info!(
        "Training on {} examples for {} epochs",
        ctx.train_dataset.num_rows(),
        ctx.args.num_train_epochs
    );
    trainer.train(ctx, tracker)?;

    tracing::info!("Training complete");
    Ok(baseline)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::preprocessor::tests::WordLenTokenizer;
    use crate::domain::traits::RunStatus;
    use crate::ml::evaluation::{EvalPrediction, ExactMatch};

    /// Tracker that keeps everything in memory.
    #[derive(Default)]
    pub(crate) struct MemoryTracker {
        pub config:   Option<serde_json::Value>,
        pub metrics:  Vec<(usize, Metrics)>,
        pub finished: Option<RunStatus>,
    }

    impl ExperimentTracker for MemoryTracker {
        fn name(&self) -> &str {
            "memory"
        }
        fn log_config(&mut self, config: &serde_json::Value) -> Result<()> {
            self.config = Some(config.clone());
            Ok(())
        }
        fn log_metrics(&mut self, step: usize, metrics: &Metrics) -> Result<()> {
            self.metrics.push((step, metrics.clone()));
            Ok(())
        }
        fn finish(&mut self, status: RunStatus) -> Result<()> {
            self.finished = Some(status);
            Ok(())
        }
    }

    /// Trainer that predicts the labels back and records call order.
    #[derive(Default)]
    pub(crate) struct EchoTrainer {
        pub calls:      Vec<&'static str>,
        pub fail_train: bool,
    }

    impl Seq2SeqTrainer for EchoTrainer {
        fn evaluate(&mut self, ctx: &TrainerContext<'_>, _: &mut dyn ExperimentTracker) -> Result<Metrics> {
            self.calls.push("evaluate");
            let labels: Vec<Vec<i64>> = ctx
                .eval_dataset
                .samples()
                .iter()
                .map(|s| s.labels.clone())
                .collect();
            ctx.evaluator.compute(&EvalPrediction {
                predictions: labels.clone(),
                labels,
            })
        }

        fn train(&mut self, ctx: &TrainerContext<'_>, tracker: &mut dyn ExperimentTracker) -> Result<()> {
            self.calls.push("train");
            if self.fail_train {
                anyhow::bail!("out of memory");
            }
            let steps = ctx.train_dataset.num_rows() / ctx.args.per_device_train_batch_size.max(1);
            tracker.log_metrics(steps, &Metrics::from([("loss".to_string(), 0.5)]))
        }
    }

    fn args() -> TrainingArguments {
        TrainingArguments::from_config(&TrainConfig::default(), "memory")
    }

    #[test]
    fn test_arguments_follow_config() {
        let cfg  = TrainConfig { eval_steps: 50, accum: 2, ..TrainConfig::default() };
        let args = TrainingArguments::from_config(&cfg, "file");
        assert_eq!(args.save_steps, 200);
        assert_eq!(args.gradient_accumulation_steps, 2);
        assert_eq!(args.per_device_eval_batch_size, cfg.train_batch_size);
        assert_eq!(args.eval_accumulation_steps, 1);
        assert_eq!(args.evaluation_strategy, IntervalStrategy::Steps);
        assert_eq!(args.report_to, "file");
    }

    #[test]
    fn test_evaluates_then_trains() {
        let data      = TokenizedDataset::new(Vec::new());
        let evaluator = Evaluator::new(&WordLenTokenizer, &ExactMatch);
        let args      = args();
        let ctx = TrainerContext {
            args:          &args,
            train_dataset: &data,
            eval_dataset:  &data,
            evaluator:     &evaluator,
        };

        let mut trainer = EchoTrainer::default();
        let mut tracker = MemoryTracker::default();
        run_trainer(&mut trainer, &ctx, &mut tracker).unwrap();

        assert_eq!(trainer.calls, vec!["evaluate", "train"]);
        assert_eq!(tracker.metrics[0].0, 0);
        assert!(tracker.metrics[0].1.contains_key("eval_accuracy"));
    }

    #[test]
    fn test_train_error_propagates() {
        let data      = TokenizedDataset::new(Vec::new());
        let evaluator = Evaluator::new(&WordLenTokenizer, &ExactMatch);
        let args      = args();
        let ctx = TrainerContext {
            args:          &args,
            train_dataset: &data,
            eval_dataset:  &data,
            evaluator:     &evaluator,
        };

        let mut trainer = EchoTrainer { fail_train: true, ..Default::default() };
        let err = run_trainer(&mut trainer, &ctx, &mut MemoryTracker::default()).unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }
}
