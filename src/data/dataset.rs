// ============================================================
// Layer 4 - Datasets
// ============================================================
// Two row tables, before and after tokenization:
//
//   QaDataset         → {question, answer} records from a loader
//   TokenizedDataset  → {input_ids, attention_mask, labels} rows
//
// Both implement burn's Dataset trait. map_batched turns the
// first into the second, optionally across worker threads.
//
// Reference: Burn Book §4 (Datasets)

use anyhow::{anyhow, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::record::{QaRecord, RecordBatch, TokenizedBatch};

/// Column names every QaDataset exposes, in order.
pub const QA_COLUMNS: [&str; 2] = ["question", "answer"];

// ─── QaDataset ───────────────────────────────────────────────────────────────
/// Ordered table of normalized records. Row order is the order the
/// loader read them in; nothing is deduplicated.
#[derive(Debug, Clone, Default)]
pub struct QaDataset {
    records: Vec<QaRecord>,
}

impl QaDataset {
    pub fn new(records: Vec<QaRecord>) -> Self { Self { records } }

    pub fn num_rows(&self) -> usize { self.records.len() }

    pub fn records(&self) -> &[QaRecord] { &self.records }

    pub fn column_names(&self) -> &'static [&'static str] { &QA_COLUMNS }

    /// Run `f` over batches of up to `batch_size` rows and
    /// concatenate the outputs. The input columns are dropped.
    ///
    /// With `num_workers > 1` the rows are first split into that many
    /// contiguous shards (never more shards than rows), one scoped
    /// thread per shard, and each shard is batched on its own. The
    /// last batch of every shard may be short. Output order always
    /// matches input order.
    pub fn map_batched<F>(
        &self,
        batch_size:  usize,
        num_workers: usize,
        f:           F,
    ) -> Result<TokenizedDataset>
    where
        F: Fn(&RecordBatch) -> Result<TokenizedBatch> + Sync,
    {
        let batch_size = batch_size.max(1);
        let map_shard = |rows: &[QaRecord]| -> Result<Vec<TokenizedBatch>> {
            rows.chunks(batch_size)
                .map(|chunk| f(&RecordBatch::from_records(chunk)))
                .collect()
        };

        let shards = contiguous_shards(&self.records, num_workers);
        let outputs: Vec<TokenizedBatch> = if shards.len() <= 1 {
            map_shard(&self.records)?
        } else {
            tracing::debug!(
                "Mapping {} rows over {} shards",
                self.records.len(),
                shards.len()
            );

            std::thread::scope(|scope| {
                let handles: Vec<_> = shards
                    .iter()
                    .map(|&shard| {
                        let map_shard = &map_shard;
                        scope.spawn(move || map_shard(shard))
                    })
                    .collect();

                let mut merged = Vec::new();
                for handle in handles {
                    let part = handle
                        .join()
                        .map_err(|_| anyhow!("Preprocessing worker panicked"))??;
                    merged.extend(part);
                }
                Ok::<_, anyhow::Error>(merged)
            })?
        };

        let samples = outputs
            .into_iter()
            .flat_map(TokenizedSample::from_batch)
            .collect();
        Ok(TokenizedDataset::new(samples))
    }
}

/// Split `rows` into `n` contiguous shards. The first `len % n`
/// shards get one extra row.
fn contiguous_shards(rows: &[QaRecord], n: usize) -> Vec<&[QaRecord]> {
    let n = n.clamp(1, rows.len().max(1));
    let (base, extra) = (rows.len() / n, rows.len() % n);

    let mut shards = Vec::with_capacity(n);
    let mut start  = 0;
    for i in 0..n {
        let len = base + usize::from(i < extra);
        shards.push(&rows[start..start + len]);
        start += len;
    }
    shards
}

impl Dataset<QaRecord> for QaDataset {
    fn get(&self, index: usize) -> Option<QaRecord> {
        self.records.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

// ─── TokenizedSample ─────────────────────────────────────────────────────────
/// One model-ready row, as handed to the trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub labels:         Vec<i64>,
}

impl TokenizedSample {
    fn from_batch(batch: TokenizedBatch) -> impl Iterator<Item = TokenizedSample> {
        batch
            .input_ids
            .into_iter()
            .zip(batch.attention_mask)
            .zip(batch.labels)
            .map(|((input_ids, attention_mask), labels)| TokenizedSample {
                input_ids,
                attention_mask,
                labels: labels.into_iter().map(i64::from).collect(),
            })
    }
}

// ─── TokenizedDataset ────────────────────────────────────────────────────────
pub struct TokenizedDataset {
    samples: Vec<TokenizedSample>,
}

/// Length summary reported to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetStats {
    pub rows:           usize,
    pub max_input_len:  usize,
    pub max_label_len:  usize,
    pub mean_input_len: f64,
    pub mean_label_len: f64,
}

impl TokenizedDataset {
    pub fn new(samples: Vec<TokenizedSample>) -> Self { Self { samples } }

    pub fn num_rows(&self) -> usize { self.samples.len() }

    pub fn samples(&self) -> &[TokenizedSample] { &self.samples }

    pub fn stats(&self) -> DatasetStats {
        let rows  = self.samples.len();
        let denom = rows.max(1) as f64;
        let input_lens = self.samples.iter().map(|s| s.input_ids.len());
        let label_lens = self.samples.iter().map(|s| s.labels.len());

        DatasetStats {
            rows,
            max_input_len:  input_lens.clone().max().unwrap_or(0),
            max_label_len:  label_lens.clone().max().unwrap_or(0),
            mean_input_len: input_lens.sum::<usize>() as f64 / denom,
            mean_label_len: label_lens.sum::<usize>() as f64 / denom,
        }
    }
}

impl Dataset<TokenizedSample> for TokenizedDataset {
    fn get(&self, index: usize) -> Option<TokenizedSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
