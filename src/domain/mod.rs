// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain structs and traits describing what the pipeline moves
// around: normalized question/answer records, columnar batches,
// tokenized outputs, and the capabilities the core calls into.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - NO tokenizer library types
//
// The external collaborators (tokenizer, trainer, tracker,
// metric) appear here only as traits.

/// Normalized records, columnar batches and tokenized outputs
pub mod record;

/// Capability traits implemented by other layers
pub mod traits;
