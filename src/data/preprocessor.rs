// ============================================================
// Layer 4 - Preprocessing Function
// ============================================================
// Turns one RecordBatch into a TokenizedBatch:
//
//   question column ──encode(max_source_length)──► input_ids, attention_mask
//   answer column   ──encode(max_target_length)──► labels
//
// Padding policy:
//   train_batch_size == 1  → DoNotPad (sequences keep their length)
//   train_batch_size  > 1  → MaxLength (every row padded to the bound)
//
// Debug mode keeps only the first DEBUG_ROWS rows of each batch.
//
// The function only reads its inputs, so the dataset mapper may
// run it from several threads at once.
//
// Reference: tokenizers crate documentation

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::record::{PaddingMode, RecordBatch, TokenizedBatch};
use crate::domain::traits::TextTokenizer;

/// Rows kept per batch when `debug` is on.
pub const DEBUG_ROWS: usize = 3;

/// Read-only settings for the preprocessing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub max_source_length: usize,
    pub max_target_length: usize,
    pub train_batch_size:  usize,
    pub debug:             bool,
}

impl PreprocessConfig {
    pub fn padding(&self) -> PaddingMode {
        if self.train_batch_size == 1 {
            PaddingMode::DoNotPad
        } else {
            PaddingMode::MaxLength
        }
    }
}

/// Tokenize questions as model inputs and answers as labels.
pub fn preprocess_batch(
    batch:     &RecordBatch,
    tokenizer: &dyn TextTokenizer,
    cfg:       &PreprocessConfig,
) -> Result<TokenizedBatch> {
    let debug_batch;
    let batch = if cfg.debug {
        debug_batch = batch.truncated(DEBUG_ROWS);
        &debug_batch
    } else {
        batch
    };

    let padding = cfg.padding();
    let inputs  = tokenizer.encode_batch(batch.questions(), cfg.max_source_length, padding)?;
    let targets = tokenizer.encode_batch(batch.answers(),   cfg.max_target_length, padding)?;

    if inputs.len() != batch.len() || targets.len() != batch.len() {
        bail!(
            "Tokenizer returned {} inputs and {} targets for a batch of {}",
            inputs.len(),
            targets.len(),
            batch.len()
        );
    }

    let mut out = TokenizedBatch::default();
    for (input, target) in inputs.into_iter().zip(targets) {
        out.input_ids.push(input.ids);
        out.attention_mask.push(input.attention_mask);
        out.labels.push(target.ids);
    }

    tracing::trace!("Preprocessed batch of {} rows ({:?})", out.len(), padding);
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::record::EncodedText;

    /// Whitespace tokenizer: word → its length + 2, then EOS (1).
    /// Pad id is 0. Truncation keeps the EOS as the last token.
    pub(crate) struct WordLenTokenizer;

    pub(crate) const EOS: u32 = 1;

    impl TextTokenizer for WordLenTokenizer {
        fn encode_batch(
            &self,
            texts:      &[String],
            max_length: usize,
            padding:    PaddingMode,
        ) -> Result<Vec<EncodedText>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut ids: Vec<u32> = t
                        .split_whitespace()
                        .map(|w| w.len() as u32 + 2)
                        .take(max_length.saturating_sub(1))
                        .collect();
                    ids.push(EOS);
                    let mut mask = vec![1; ids.len()];
                    if padding == PaddingMode::MaxLength {
                        ids.resize(max_length, 0);
                        mask.resize(max_length, 0);
                    }
                    EncodedText { ids, attention_mask: mask }
                })
                .collect())
        }

        fn decode_batch(&self, ids: &[Vec<u32>], _skip_special_tokens: bool) -> Result<Vec<String>> {
            Ok(ids
                .iter()
                .map(|seq| {
                    seq.iter()
                        .filter(|&&id| id > EOS)
                        .map(|&id| "x".repeat(id as usize - 2))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect())
        }

        fn pad_token_id(&self) -> u32 {
            0
        }
    }

    fn batch(n: usize) -> RecordBatch {
        RecordBatch::from_columns(
            (0..n).map(|i| format!("question number {i} is {}", "long ".repeat(i))).collect(),
            (0..n).map(|i| format!("answer {i}")).collect(),
        )
        .unwrap()
    }

    fn cfg(train_batch_size: usize, debug: bool) -> PreprocessConfig {
        PreprocessConfig {
            max_source_length: 8,
            max_target_length: 4,
            train_batch_size,
            debug,
        }
    }

    #[test]
    fn test_padding_mode_from_batch_size() {
        assert_eq!(cfg(1, false).padding(),  PaddingMode::DoNotPad);
        assert_eq!(cfg(2, false).padding(),  PaddingMode::MaxLength);
        assert_eq!(cfg(16, false).padding(), PaddingMode::MaxLength);
    }

    #[test]
    fn test_batched_rows_share_max_length() {
        let out = preprocess_batch(&batch(6), &WordLenTokenizer, &cfg(16, false)).unwrap();
        assert_eq!(out.len(), 6);
        assert!(out.input_ids.iter().all(|ids| ids.len() == 8));
        assert!(out.attention_mask.iter().all(|m| m.len() == 8));
        assert!(out.labels.iter().all(|ids| ids.len() == 4));
    }

    #[test]
    fn test_single_example_batches_are_not_padded() {
        let out = preprocess_batch(&batch(3), &WordLenTokenizer, &cfg(1, false)).unwrap();
        // "question number 0 is " → 4 words + EOS
        assert_eq!(out.input_ids[0].len(), 5);
        assert!(out.input_ids.iter().all(|ids| !ids.contains(&0)));
        // "answer N" → 2 words + EOS
        assert!(out.labels.iter().all(|ids| ids.len() == 3));
    }

    #[test]
    fn test_truncation_respects_bounds_without_padding() {
        let out = preprocess_batch(&batch(6), &WordLenTokenizer, &cfg(1, false)).unwrap();
        assert!(out.input_ids.iter().all(|ids| ids.len() <= 8));
        assert_eq!(out.input_ids[5].len(), 8);
    }

    #[test]
    fn test_debug_keeps_three_rows() {
        let out = preprocess_batch(&batch(10), &WordLenTokenizer, &cfg(16, true)).unwrap();
        assert_eq!(out.len(), DEBUG_ROWS);

        let small = preprocess_batch(&batch(2), &WordLenTokenizer, &cfg(16, true)).unwrap();
        assert_eq!(small.len(), 2);
    }

    #[test]
    fn test_labels_come_from_answers() {
        let out = preprocess_batch(&batch(1), &WordLenTokenizer, &cfg(1, false)).unwrap();
        // "answer 0" → [len("answer")+2, len("0")+2, EOS]
        assert_eq!(out.labels[0], vec![8, 3, EOS]);
    }

    #[test]
    fn test_tokenizer_errors_propagate() {
        struct Failing;
        impl TextTokenizer for Failing {
            fn encode_batch(&self, _: &[String], _: usize, _: PaddingMode) -> Result<Vec<EncodedText>> {
                bail!("token id out of range")
            }
            fn decode_batch(&self, _: &[Vec<u32>], _: bool) -> Result<Vec<String>> {
                Ok(Vec::new())
            }
            fn pad_token_id(&self) -> u32 {
                0
            }
        }

        let err = preprocess_batch(&batch(2), &Failing, &cfg(2, false)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
