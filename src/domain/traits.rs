// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer programs against these, not against the
// JSON loader or the burn inferencer directly.

use anyhow::Result;

use crate::domain::vqa_record::{Prediction, VqaRecord};

/// Any component that can produce VQA records.
///
/// Implementations:
///   - JsonlRecordLoader -> one JSON record per line
pub trait RecordSource {
    fn load_all(&self) -> Result<Vec<VqaRecord>>;
}

/// Any component that can answer a question about an image.
///
/// Implementations:
///   - Inferencer -> runs the BAN network from a checkpoint
pub trait QuestionAnswerer {
    /// Return up to `top_k` answers, best first.
    fn answer(&self, record: &VqaRecord, top_k: usize) -> Result<Vec<Prediction>>;
}
