// ============================================================
// Layer 4 - Question & Feature Preprocessing
// ============================================================
// Turns a VqaRecord into fixed-size numeric arrays:
//
//   question  → lowercase, strip punctuation, split on spaces,
//               '-' and '/' → token ids, zero-padded to max_token
//   frcn_feat → [frcn_max_boxes, img_feat_size], zero rows appended
//   grid_feat → [grid_max_len, grid_feat_size], zero rows appended
//   bbox      → [frcn_max_boxes, 5] = x1/w, y1/h, x2/w, y2/h, area ratio
//
// Zero rows are the padding sentinel downstream (see ml::mask).

use anyhow::{bail, Result};

use crate::data::vocab::{Vocabulary, UNK_IX};
use crate::domain::vqa_record::VqaRecord;

const STRIPPED_PUNCT: &[char] = &['.', ',', '\'', '!', '?', '"', '(', ')', '*', '#', ':', ';'];

// ─── Questions ────────────────────────────────────────────────────────────────

pub struct QuestionPreprocessor {
    max_token: usize,
}

impl QuestionPreprocessor {
    pub fn new(max_token: usize) -> Self {
        Self { max_token }
    }

    /// Split a question into normalised word tokens.
    pub fn tokenize(question: &str) -> Vec<String> {
        let cleaned: String = question
            .to_lowercase()
            .chars()
            .filter(|c| !STRIPPED_PUNCT.contains(c))
            .map(|c| match c {
                '-' | '/' => ' ',
                c => c,
            })
            .collect();
        cleaned.split_whitespace().map(str::to_string).collect()
    }

    /// Token ids, truncated or zero-padded to `max_token`.
    pub fn encode(&self, question: &str, vocab: &Vocabulary) -> Vec<u32> {
        let mut ids: Vec<u32> = Self::tokenize(question)
            .iter()
            .take(self.max_token)
            .map(|w| vocab.token_ix(w).unwrap_or(UNK_IX))
            .collect();
        ids.resize(self.max_token, 0);
        ids
    }
}

// ─── Image features ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureShapes {
    pub frcn_max_boxes: usize,
    pub img_feat_size:  usize,
    pub grid_max_len:   usize,
    pub grid_feat_size: usize,
}

pub struct FeaturePreprocessor {
    shapes: FeatureShapes,
}

impl FeaturePreprocessor {
    pub fn new(shapes: FeatureShapes) -> Self {
        Self { shapes }
    }

    /// Flattened [frcn_max_boxes, img_feat_size] region features.
    pub fn frcn(&self, record: &VqaRecord) -> Result<Vec<f32>> {
        pad_rows(
            &record.frcn_feat,
            self.shapes.frcn_max_boxes,
            self.shapes.img_feat_size,
            "frcn_feat",
        )
    }

    /// Flattened [grid_max_len, grid_feat_size] grid features.
    pub fn grid(&self, record: &VqaRecord) -> Result<Vec<f32>> {
        pad_rows(
            &record.grid_feat,
            self.shapes.grid_max_len,
            self.shapes.grid_feat_size,
            "grid_feat",
        )
    }

    /// Flattened [frcn_max_boxes, 5] spatial features. Records without
    /// boxes or image size produce all zeros.
    pub fn bbox(&self, record: &VqaRecord) -> Vec<f32> {
        let (w, h) = (record.image_w, record.image_h);
        let rows: Vec<Vec<f32>> = if w > 0.0 && h > 0.0 {
            record
                .bbox
                .iter()
                .map(|[x1, y1, x2, y2]| {
                    let area = (x2 - x1) * (y2 - y1) / (w * h);
                    vec![x1 / w, y1 / h, x2 / w, y2 / h, area]
                })
                .collect()
        } else {
            Vec::new()
        };

        // Row widths are always 5, so this cannot fail
        pad_rows(&rows, self.shapes.frcn_max_boxes, 5, "bbox").unwrap_or_default()
    }
}

/// Truncate to `max_rows`, append zero rows, and flatten.
fn pad_rows(rows: &[Vec<f32>], max_rows: usize, width: usize, name: &str) -> Result<Vec<f32>> {
    let mut flat = Vec::with_capacity(max_rows * width);
    for (i, row) in rows.iter().take(max_rows).enumerate() {
        if row.len() != width {
            bail!("{name} row {i} has {} values, expected {width}", row.len());
        }
        flat.extend_from_slice(row);
    }
    flat.resize(max_rows * width, 0.0);
    Ok(flat)
}
