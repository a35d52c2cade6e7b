// ============================================================
// Layer 3 - Record Types
// ============================================================
// Every loader, whatever its source format, produces QaRecord.
// Preprocessing works on RecordBatch (the columnar view of a run
// of records) and returns a TokenizedBatch.
//
//   raw JSON line ──► QaRecord ──► RecordBatch ──► TokenizedBatch
//
// Reference: Rust Book §5 (Structs), §8 (Collections)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label value the trainer excludes from the loss.
pub const IGNORE_INDEX: i64 = -100;

/// Named scalar results from an evaluation or a tracker update.
pub type Metrics = BTreeMap<String, f64>;

/// The uniform `{question, answer}` shape all loaders produce.
///
/// Fields are private so a record cannot change after a loader
/// has built it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QaRecord {
    question: String,
    answer:   String,
}

impl QaRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer:   answer.into(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

// ─── RecordBatch ─────────────────────────────────────────────────────────────
/// Columnar batch: parallel `question` and `answer` columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    questions: Vec<String>,
    answers:   Vec<String>,
}

impl RecordBatch {
    /// Build a batch from two columns. The columns must line up.
    pub fn from_columns(questions: Vec<String>, answers: Vec<String>) -> Result<Self> {
        if questions.len() != answers.len() {
            bail!(
                "Column length mismatch: {} questions but {} answers",
                questions.len(),
                answers.len()
            );
        }
        Ok(Self { questions, answers })
    }

    pub fn from_records(records: &[QaRecord]) -> Self {
        let (questions, answers) = records
            .iter()
            .map(|r| (r.question.clone(), r.answer.clone()))
            .unzip();
        Self { questions, answers }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Keep only the first `n` rows of both columns.
    pub fn truncated(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            questions: self.questions[..n].to_vec(),
            answers:   self.answers[..n].to_vec(),
        }
    }
}

// ─── Tokenizer I/O ───────────────────────────────────────────────────────────
/// How encoded sequences are padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    /// Leave every sequence at its natural (truncated) length.
    DoNotPad,
    /// Pad every sequence up to the requested max length.
    MaxLength,
}

/// One encoded string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub ids:            Vec<u32>,
    pub attention_mask: Vec<u32>,
}

/// Output of the preprocessing function for one RecordBatch.
///
/// `labels[i]` holds the encoded answer for row `i`, padded with the
/// tokenizer's pad id when padding is on. Replacing pads with
/// IGNORE_INDEX is left to the trainer's collator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedBatch {
    pub input_ids:      Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u32>>,
    pub labels:         Vec<Vec<u32>>,
}

impl TokenizedBatch {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}
