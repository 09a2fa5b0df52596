// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// From JSON-lines records to tensor batches:
//
//   records.jsonl
//       │
//       ▼
//   JsonlRecordLoader     → VqaRecord per line
//       │
//       ▼
//   Vocabulary            → question tokens + answer space
//       │
//       ▼
//   Question/Feature      → padded ids, padded feature rows,
//   Preprocessor            spatial box features
//       │
//       ▼
//   answer_target         → soft score per answer class
//       │
//       ▼
//   VqaDataset            → Burn's Dataset trait
//       │
//       ▼
//   VqaBatcher            → stacked tensors for the DataLoader
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads JSON-lines record files
pub mod loader;

/// Question tokenisation and feature padding
pub mod preprocessor;

/// Token and answer vocabularies
pub mod vocab;

/// Answer normalisation and soft scores
pub mod answer;

/// Implements Burn's Dataset trait for VQA samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
