// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Adapters to the outside world:
//
//   tokenizer_store.rs - resolves --model to a tokenizer.json and
//                        adapts tokenizers::Tokenizer to the
//                        TextTokenizer trait
//
//   metrics.rs         - ExperimentTracker sinks (run files on
//                        disk, or plain tracing output)
//
//   export.rs          - writes the tokenized datasets and the
//                        trainer arguments for an external trainer
//
// Reference: Rust Book §7 (Modules)

/// Tokenizer loading and the tokenizers adapter
pub mod tokenizer_store;

/// Experiment trackers
pub mod metrics;

/// Prepared data export
pub mod export;
