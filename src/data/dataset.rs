use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::answer::answer_target;
use crate::data::preprocessor::{FeaturePreprocessor, QuestionPreprocessor};
use crate::data::vocab::Vocabulary;
use crate::domain::vqa_record::VqaRecord;

/// One fully preprocessed sample. Every array is already padded
/// to the shapes in `FeatureShapes`, so the batcher only stacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaSample {
    pub frcn_feat: Vec<f32>,
    pub grid_feat: Vec<f32>,
    pub bbox_feat: Vec<f32>,
    pub ques_ix:   Vec<u32>,
    pub ans_score: Vec<f32>,
}

impl VqaSample {
    pub fn from_record(
        record:    &VqaRecord,
        questions: &QuestionPreprocessor,
        features:  &FeaturePreprocessor,
        vocab:     &Vocabulary,
    ) -> Result<Self> {
        Ok(Self {
            frcn_feat: features.frcn(record)?,
            grid_feat: features.grid(record)?,
            bbox_feat: features.bbox(record),
            ques_ix:   questions.encode(&record.question, vocab),
            ans_score: answer_target(&record.answers, vocab),
        })
    }

    /// True when no annotated answer made it into the answer space.
    pub fn has_no_target(&self) -> bool {
        self.ans_score.iter().all(|s| *s == 0.0)
    }
}

pub struct VqaDataset {
    samples: Vec<VqaSample>,
}

impl VqaDataset {
    pub fn new(samples: Vec<VqaSample>) -> Self { Self { samples } }
}

impl Dataset<VqaSample> for VqaDataset {
    fn get(&self, index: usize) -> Option<VqaSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
