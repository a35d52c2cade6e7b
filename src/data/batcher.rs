// ============================================================
// Layer 4 - Seq2Seq Batcher
// ============================================================
// Implements burn's Batcher trait so a trainer built on burn's
// DataLoader can consume a TokenizedDataset directly.
//
// Rows may have different lengths (train_batch_size == 1 leaves
// them unpadded), so each batch is padded up to its own longest
// row:
//
//   input_ids       → pad_token_id
//   attention_mask  → 0
//   labels          → IGNORE_INDEX (-100), excluded from the loss
//
// Output shapes:
//   input_ids, attention_mask : [batch_size, max_input_len]
//   labels                    : [batch_size, max_label_len]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TokenizedSample;
use crate::domain::record::IGNORE_INDEX;

/// A batch of tokenized rows ready for a seq2seq forward pass.
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
    pub labels:         Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    device:       B::Device,
    pad_token_id: u32,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device, pad_token_id: u32) -> Self {
        Self { device, pad_token_id }
    }
}

/// Flatten `rows` into a row-major buffer of width `width`,
/// filling short rows with `fill`.
fn pad_flat<T: Copy>(rows: impl Iterator<Item = Vec<T>>, width: usize, fill: T) -> Vec<T> {
    let mut flat = Vec::new();
    for mut row in rows {
        row.resize(width, fill);
        flat.extend(row);
    }
    flat
}

impl<B: Backend> Batcher<TokenizedSample, Seq2SeqBatch<B>> for Seq2SeqBatcher<B> {
    fn batch(&self, items: Vec<TokenizedSample>) -> Seq2SeqBatch<B> {
        let batch_size = items.len();
        let input_len  = items.iter().map(|s| s.input_ids.len()).max().unwrap_or(0);
        let label_len  = items.iter().map(|s| s.labels.len()).max().unwrap_or(0);

        let input_flat = pad_flat(
            items.iter().map(|s| s.input_ids.iter().map(|&x| x as i64).collect()),
            input_len,
            self.pad_token_id as i64,
        );
        let mask_flat = pad_flat(
            items.iter().map(|s| s.attention_mask.iter().map(|&x| x as i64).collect()),
            input_len,
            0,
        );
        let label_flat = pad_flat(
            items.iter().map(|s| s.labels.clone()),
            label_len,
            IGNORE_INDEX,
        );

        let input_ids = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, input_len]);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, input_len]);
        let labels = Tensor::<B, 1, Int>::from_ints(label_flat.as_slice(), &self.device)
            .reshape([batch_size, label_len]);

        Seq2SeqBatch { input_ids, attention_mask, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(ids: &[u32], labels: &[i64]) -> TokenizedSample {
        TokenizedSample {
            input_ids:      ids.to_vec(),
            attention_mask: vec![1; ids.len()],
            labels:         labels.to_vec(),
        }
    }

    #[test]
    fn test_pads_to_longest_row() {
        let batcher = Seq2SeqBatcher::<TestBackend>::new(Default::default(), 0);
        let batch   = batcher.batch(vec![
            sample(&[5, 6, 7], &[9, 1]),
            sample(&[8],       &[4, 4, 1]),
        ]);

        assert_eq!(batch.input_ids.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(),    [2, 3]);

        let ids: Vec<i64> = batch.input_ids.into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![5, 6, 7, 8, 0, 0]);

        let mask: Vec<i64> = batch.attention_mask.into_data().iter::<i64>().collect();
        assert_eq!(mask, vec![1, 1, 1, 1, 0, 0]);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![9, 1, IGNORE_INDEX, 4, 4, 1]);
    }

    #[test]
    fn test_uses_configured_pad_id() {
        let batcher = Seq2SeqBatcher::<TestBackend>::new(Default::default(), 3);
        let batch   = batcher.batch(vec![sample(&[7, 7], &[1]), sample(&[7], &[1])]);
        let ids: Vec<i64> = batch.input_ids.into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![7, 7, 7, 3]);
    }
}
