// ============================================================
// Layer 3 - Core Traits (Capabilities)
// ============================================================
// The pipeline calls into four things it does not implement
// itself. Each one is a trait here so the application layer can
// be handed any implementation:
//
//   RecordSource      - math / BBH / Dolly loaders (Layer 4)
//   TextTokenizer     - HfTokenizer (Layer 6) or a test double
//   EvalMetric        - ExactMatch (Layer 5)
//   ExperimentTracker - FileTracker / TracingTracker (Layer 6)
//
// The trainer trait lives in ml::trainer because it talks in
// terms of datasets from Layer 4.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::data::dataset::QaDataset;
use crate::domain::record::{EncodedText, Metrics, PaddingMode};

// ─── RecordSource ────────────────────────────────────────────────────────────
/// Anything that can produce a dataset of normalized records.
pub trait RecordSource {
    /// Short name used in logs ("dolly", "bbh", "math").
    fn name(&self) -> &str;

    /// Read the whole source and normalize it.
    fn load(&self) -> Result<QaDataset>;
}

// ─── TextTokenizer ───────────────────────────────────────────────────────────
/// Batch encode/decode capability.
///
/// Implementations must be usable from several threads at once
/// through a shared reference.
pub trait TextTokenizer: Send + Sync {
    /// Encode each text, truncating to `max_length` and padding
    /// according to `padding`.
    fn encode_batch(
        &self,
        texts:      &[String],
        max_length: usize,
        padding:    PaddingMode,
    ) -> Result<Vec<EncodedText>>;

    /// Decode each id sequence back to text.
    fn decode_batch(&self, ids: &[Vec<u32>], skip_special_tokens: bool) -> Result<Vec<String>>;

    /// Id used to fill padded positions.
    fn pad_token_id(&self) -> u32;
}

// ─── EvalMetric ──────────────────────────────────────────────────────────────
/// Statically referenced evaluation metric.
pub trait EvalMetric: Send + Sync {
    fn compute(&self, predictions: &[String], references: &[String]) -> Result<Metrics>;
}

// ─── ExperimentTracker ───────────────────────────────────────────────────────
/// Final state reported to a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed    => "failed",
        }
    }
}

/// Experiment-tracking sink, injected into the training entry point.
///
/// Lifecycle: `log_config` once, any number of `log_metrics`,
/// then exactly one `finish`.
pub trait ExperimentTracker {
    /// Name reported to the trainer as its `report_to` target.
    fn name(&self) -> &str;

    fn log_config(&mut self, config: &serde_json::Value) -> Result<()>;

    fn log_metrics(&mut self, step: usize, metrics: &Metrics) -> Result<()>;

    fn finish(&mut self, status: RunStatus) -> Result<()>;
}
