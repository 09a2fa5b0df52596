// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Rebuilds the Net from train_config.json, loads the newest
// checkpoint and ranks answers for a single record.
//
// Answers are scored with sigmoid(logit): the head is trained
// with BCE, so each answer is an independent probability.

use anyhow::{anyhow, Result};
use burn::{data::dataloader::batcher::Batcher, tensor::activation::sigmoid};

use crate::data::{
    batcher::VqaBatcher,
    dataset::VqaSample,
    preprocessor::{FeaturePreprocessor, QuestionPreprocessor},
    vocab::Vocabulary,
};
use crate::domain::traits::QuestionAnswerer;
use crate::domain::vqa_record::{Prediction, VqaRecord};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::{default_device, InferBackend};
use crate::ml::model::Net;

pub struct Inferencer {
    model:     Net<InferBackend>,
    vocab:     Vocabulary,
    questions: QuestionPreprocessor,
    features:  FeaturePreprocessor,
    batcher:   VqaBatcher<InferBackend>,
}

impl Inferencer {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, vocab: Vocabulary) -> Result<Self> {
        let device = default_device();
        let cfg    = ckpt_manager.load_config()?;

        // The checkpoint already holds the trained embedding table
        let model_cfg = cfg.model.clone().with_use_glove(false);
        let model: Net<InferBackend> =
            model_cfg.init(vocab.token_size(), vocab.answer_size(), None, &device)?;
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");

        Ok(Self {
            model,
            vocab,
            questions: QuestionPreprocessor::new(cfg.max_token),
            features:  FeaturePreprocessor::new(cfg.shapes()),
            batcher:   VqaBatcher::new(device, cfg.shapes()),
        })
    }

    /// Per-answer probabilities, indexed like the answer vocabulary.
    pub fn probabilities(&self, record: &VqaRecord) -> Result<Vec<f32>> {
        let sample = VqaSample::from_record(record, &self.questions, &self.features, &self.vocab)?;
        let batch  = self.batcher.batch(vec![sample]);

        let logits = self.model.forward(
            batch.frcn_feat,
            batch.grid_feat,
            batch.bbox_feat,
            batch.ques_ix,
        );
        sigmoid(logits)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read model output: {e:?}"))
    }

    pub fn predict(&self, record: &VqaRecord, top_k: usize) -> Result<Vec<Prediction>> {
        let probs = self.probabilities(record)?;
        let ranked = rank_top_k(&probs, top_k)
            .into_iter()
            .filter_map(|(ix, score)| {
                self.vocab.answer(ix).map(|a| Prediction { answer: a.to_string(), score })
            })
            .collect();
        Ok(ranked)
    }
}

impl QuestionAnswerer for Inferencer {
    fn answer(&self, record: &VqaRecord, top_k: usize) -> Result<Vec<Prediction>> {
        self.predict(record, top_k)
    }
}

/// Indices of the `k` largest scores, best first. Ties keep the
/// lower index first.
pub fn rank_top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}
