// ============================================================
// Layer 5 - Trainer Boundary
// ============================================================
// The model, optimizer and training loop belong to an external
// framework. This layer only defines what the pipeline hands
// over and what it gets back:
//
//   trainer.rs    - Seq2SeqTrainer trait, TrainingArguments,
//                   and run_trainer (evaluate, then train)
//
//   evaluation.rs - compute_metrics for the trainer: argmax,
//                   sentinel mapping, batch decode, and the
//                   ExactMatch accuracy metric
//
// Tensor batching for burn-based trainers lives next to the
// datasets in data::batcher.
//
// Reference: Burn Book §5 (Training)

/// Trainer trait and the arguments passed to it
pub mod trainer;

/// Accuracy evaluation over decoded predictions
pub mod evaluation;
