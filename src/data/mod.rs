// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from raw corpus files to trainer-ready batches:
//
//   JSONL / JSON task files
//       │
//       ▼
//   Math / Bbh / Dolly loaders  → QaDataset of {question, answer}
//       │   (math answers go through the cleaner)
//       ▼
//   QaDataset::map_batched      → runs preprocess_batch per batch
//       │
//       ▼
//   TokenizedDataset            → implements burn's Dataset trait
//       │
//       ▼
//   Seq2SeqBatcher              → pads and stacks into tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Strips calculator annotations from math answers
pub mod cleaner;

/// Math, Big-Bench-Hard and Dolly loaders
pub mod loader;

/// QaDataset and TokenizedDataset (burn Dataset implementations)
pub mod dataset;

/// The batch preprocessing function
pub mod preprocessor;

/// burn Batcher producing padded tensor batches
pub mod batcher;
