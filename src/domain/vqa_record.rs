// ============================================================
// Layer 3 - VqaRecord Domain Type
// ============================================================
// One question about one image, as it appears on disk:
//   - the question text
//   - the raw annotator answers (empty at inference time)
//   - the pre-extracted image features
//
// Region features come from an object detector (one vector per
// box). Grid features and box coordinates are optional.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaRecord {
    #[serde(default)]
    pub question_id: u64,

    pub question: String,

    /// One entry per annotator; repeated answers raise the soft score
    #[serde(default)]
    pub answers: Vec<String>,

    /// Region features, one row per detected box
    pub frcn_feat: Vec<Vec<f32>>,

    #[serde(default)]
    pub grid_feat: Vec<Vec<f32>>,

    /// Box corners [x1, y1, x2, y2] in pixels, aligned with `frcn_feat`
    #[serde(default)]
    pub bbox: Vec<[f32; 4]>,

    #[serde(default)]
    pub image_w: f32,

    #[serde(default)]
    pub image_h: f32,
}

impl VqaRecord {
    pub fn new(question: impl Into<String>, frcn_feat: Vec<Vec<f32>>) -> Self {
        Self {
            question_id: 0,
            question:    question.into(),
            answers:     Vec::new(),
            frcn_feat,
            grid_feat:   Vec::new(),
            bbox:        Vec::new(),
            image_w:     0.0,
            image_h:     0.0,
        }
    }

    pub fn with_answers(mut self, answers: Vec<String>) -> Self {
        self.answers = answers;
        self
    }

    pub fn is_labelled(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// One ranked answer returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub answer: String,
    /// Sigmoid of the answer logit
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"question": "what is it?", "frcn_feat": [[0.5, 1.0]]}"#;
        let rec: VqaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.question_id, 0);
        assert!(!rec.is_labelled());
        assert!(rec.grid_feat.is_empty());
        assert!(rec.bbox.is_empty());
    }
}
