// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Workflow coordination only. Loaders, tokenizers, trackers and
// trainers are all handed in or built from TrainConfig; nothing
// here does I/O of its own.
//
// Reference: Rust Book §7 (Module System)

// Load and tokenize the train and eval splits
pub mod prepare_use_case;

// Configuration and the evaluate-then-train workflow
pub mod train_use_case;
