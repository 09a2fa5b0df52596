// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
//   checkpoint.rs      - Net weights (CompactRecorder) and the
//                        TrainConfig needed to rebuild the Net
//   vocab_store.rs     - token / answer vocabularies as JSON
//   embedding_store.rs - GloVe text vectors → embedding matrix
//   metrics.rs         - per-epoch metrics appended to a CSV
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Pretrained word vectors
pub mod embedding_store;

/// Training metrics CSV logger
pub mod metrics;
