// ============================================================
// Layer 4 - Record Loader
// ============================================================
// Reads VQA records from a JSON-lines file: one VqaRecord
// object per line, blank lines ignored.
//
//   {"question_id": 1, "question": "what color is the bus?",
//    "answers": ["red", "red", "dark red"],
//    "frcn_feat": [[...], [...]], "bbox": [[x1, y1, x2, y2], ...],
//    "image_w": 640, "image_h": 480}
//
// A malformed line is logged and skipped so one bad record does
// not sink a whole training run.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::traits::RecordSource;
use crate::domain::vqa_record::VqaRecord;

pub struct JsonlRecordLoader {
    path: PathBuf,
}

impl JsonlRecordLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonlRecordLoader {
    fn load_all(&self) -> Result<Vec<VqaRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open records file '{}'", self.path.display()))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .with_context(|| format!("Cannot read line {} of '{}'", idx + 1, self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<VqaRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping line {} of '{}': {}", idx + 1, self.path.display(), e);
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            "Loaded {} records from '{}' ({} skipped)",
            records.len(),
            self.path.display(),
            skipped
        );
        Ok(records)
    }
}

/// Load a single record stored as one JSON document (used by `ask`).
pub fn load_record(path: &Path) -> Result<VqaRecord> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read image record '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid image record JSON in '{}'", path.display()))
}
