// ============================================================
// Layer 5 - Evaluation
// ============================================================
// compute_metrics as the trainer calls it after an eval pass:
//
//   1. logits [seq][vocab] → argmax → predicted ids
//   2. label -100 → 0, prediction -100 → 0
//   3. batch-decode both sides, skipping special tokens
//   4. metric.compute(predictions, references)
//
// Step 2 treats the ignore sentinel as token id 0, which is a
// real vocabulary entry (the pad token for T5-style models).
// The mapping is kept as-is so scores stay comparable with
// earlier runs.
//
// Reference: Rust Book §13 (Iterators)

use anyhow::{bail, Result};

use crate::domain::record::{Metrics, IGNORE_INDEX};
use crate::domain::traits::{EvalMetric, TextTokenizer};

/// Model outputs for an evaluation set, aligned with the labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalPrediction {
    pub predictions: Vec<Vec<i64>>,
    pub labels:      Vec<Vec<i64>>,
}

impl EvalPrediction {
    /// Build predictions from per-position logits by taking the
    /// highest-scoring vocabulary entry at each position.
    pub fn from_logits(logits: &[Vec<Vec<f32>>], labels: Vec<Vec<i64>>) -> Self {
        let predictions = logits
            .iter()
            .map(|seq| seq.iter().map(|row| argmax(row)).collect())
            .collect();
        Self { predictions, labels }
    }
}

/// Index of the first maximum, like numpy's argmax.
pub fn argmax(row: &[f32]) -> i64 {
    let mut best = 0usize;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best as i64
}

/// Map the ignore sentinel to 0 and narrow to token ids.
fn to_token_ids(rows: &[Vec<i64>]) -> Result<Vec<Vec<u32>>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|&id| {
                    let id = if id == IGNORE_INDEX { 0 } else { id };
                    match u32::try_from(id) {
                        Ok(id) => Ok(id),
                        Err(_) => bail!("Token id {} is outside the vocabulary range", id),
                    }
                })
                .collect()
        })
        .collect()
}

/// Decode predictions and labels, then score them with `metric`.
pub fn compute_accuracy(
    pred:      &EvalPrediction,
    tokenizer: &dyn TextTokenizer,
    metric:    &dyn EvalMetric,
) -> Result<Metrics> {
    let predictions = to_token_ids(&pred.predictions)?;
    let labels      = to_token_ids(&pred.labels)?;

    let pred_text = tokenizer.decode_batch(&predictions, true)?;
    let gt_text   = tokenizer.decode_batch(&labels, true)?;
    metric.compute(&pred_text, &gt_text)
}

/// Tokenizer and metric bundled for the trainer.
pub struct Evaluator<'a> {
    tokenizer: &'a dyn TextTokenizer,
    metric:    &'a dyn EvalMetric,
}

impl<'a> Evaluator<'a> {
    pub fn new(tokenizer: &'a dyn TextTokenizer, metric: &'a dyn EvalMetric) -> Self {
        Self { tokenizer, metric }
    }

    pub fn compute(&self, pred: &EvalPrediction) -> Result<Metrics> {
        compute_accuracy(pred, self.tokenizer, self.metric)
    }
}

// ─── ExactMatch ──────────────────────────────────────────────────────────────
/// Fraction of predictions equal to their reference string.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl EvalMetric for ExactMatch {
    fn compute(&self, predictions: &[String], references: &[String]) -> Result<Metrics> {
        if predictions.len() != references.len() {
            bail!(
                "Got {} predictions for {} references",
                predictions.len(),
                references.len()
            );
        }

        let correct = predictions
            .iter()
            .zip(references)
            .filter(|(p, r)| p == r)
            .count();
        let accuracy = if predictions.is_empty() {
            0.0
        } else {
            correct as f64 / predictions.len() as f64
        };

        Ok(Metrics::from([("accuracy".to_string(), accuracy)]))
    }
}
