// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load JSON-lines records        (Layer 4 - data)
//   Step 2: Build + save vocabularies      (Layer 6 - infra)
//   Step 3: Load pretrained embeddings     (Layer 6 - infra)
//   Step 4: Preprocess into samples        (Layer 4 - data)
//   Step 5: Split train / validation       (Layer 4 - data)
//   Step 6: Save config                    (Layer 6 - infra)
//   Step 7: Run training loop              (Layer 5 - ml)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{VqaDataset, VqaSample},
    loader::JsonlRecordLoader,
    preprocessor::{FeaturePreprocessor, FeatureShapes, QuestionPreprocessor},
    splitter::split_train_val,
    vocab::Vocabulary,
};
use crate::domain::traits::RecordSource;
use crate::domain::vqa_record::VqaRecord;
use crate::infra::{
    checkpoint::CheckpointManager,
    embedding_store::{EmbeddingMatrix, EmbeddingStore},
    vocab_store::VocabStore,
};
use crate::ml::{
    loss::LossReduction,
    model::NetConfig,
    schedule::LrSchedule,
    trainer::run_training,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to reproduce a run. Saved as train_config.json
// so `ask` can rebuild the same Net and preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// JSON-lines record file
    pub data_path:        String,
    /// Where checkpoints, vocab.json, metrics.csv and this config go
    pub checkpoint_dir:   String,
    /// GloVe text file, read only when `model.use_glove` is set
    pub glove_path:       Option<String>,
    pub batch_size:       usize,
    pub epochs:           usize,
    /// Learning rate after warmup and before any decay
    pub lr_base:          f64,
    /// Multiplier applied at each epoch in `lr_decay_list`
    pub lr_decay_r:       f64,
    /// 0-based epochs at which the learning rate decays
    pub lr_decay_list:    Vec<usize>,
    /// Epochs of linear warmup at the start of training
    pub warmup_epochs:    usize,
    /// Global L2 norm the gradients are clipped to
    pub grad_norm_clip:   f32,
    /// How the BCE loss is reduced over a batch
    pub loss_reduction:   LossReduction,
    /// Question length after truncation / padding
    pub max_token:        usize,
    /// Region rows after truncation / padding
    pub frcn_max_boxes:   usize,
    /// Grid rows after truncation / padding
    pub grid_max_len:     usize,
    /// Width of one grid feature row
    pub grid_feat_size:   usize,
    /// Answers seen fewer times are left out of the answer space
    pub min_answer_count: usize,
    /// Share of samples used for training, the rest validate
    pub train_fraction:   f64,
    /// Seeds the backend, the split and the data loader shuffle
    pub seed:             u64,
    /// Data loader worker threads
    pub num_workers:      usize,
    /// Network hyper-parameters
    pub model:            NetConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:        "data/train.jsonl".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            glove_path:       None,
            batch_size:       64,
            epochs:           13,
            lr_base:          2e-3,
            lr_decay_r:       0.25,
            lr_decay_list:    vec![10, 12],
            warmup_epochs:    3,
            grad_norm_clip:   0.25,
            loss_reduction:   LossReduction::Sum,
            max_token:        14,
            frcn_max_boxes:   100,
            grid_max_len:     1,
            grid_feat_size:   1,
            min_answer_count: 1,
            train_fraction:   0.9,
            seed:             42,
            num_workers:      1,
            model:            NetConfig::new(),
        }
    }
}

impl TrainConfig {
    /// Learning-rate schedule built from the lr_* fields.
    pub fn schedule(&self) -> LrSchedule {
        LrSchedule {
            lr_base:       self.lr_base,
            warmup_epochs: self.warmup_epochs,
            decay_r:       self.lr_decay_r,
            decay_list:    self.lr_decay_list.clone(),
        }
    }

    /// Padded feature shapes shared by preprocessing and batching.
    pub fn shapes(&self) -> FeatureShapes {
        FeatureShapes {
            frcn_max_boxes: self.frcn_max_boxes,
            img_feat_size:  self.model.img_feat_size,
            grid_max_len:   self.grid_max_len,
            grid_feat_size: self.grid_feat_size,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Wrap a config; nothing is read until `execute`.
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load records ──────────────────────────────────────────────
        let records = JsonlRecordLoader::new(&cfg.data_path).load_all()?;
        if records.is_empty() {
            bail!("No records found in '{}'", cfg.data_path);
        }

        // ── Step 2: Vocabularies (always rebuilt from these records) ──────────
        let vocab = VocabStore::new(&cfg.checkpoint_dir)
            .build_and_save(&records, cfg.min_answer_count)?;
        if vocab.answer_size() == 0 {
            bail!("Answer space is empty; are the records labelled?");
        }

        // ── Step 3: Pretrained embeddings (optional) ──────────────────────────
        let pretrained = self.pretrained_embeddings(&vocab)?;

        // ── Step 4: Preprocess ────────────────────────────────────────────────
        let samples = build_samples(&records, cfg, &vocab)?;
        tracing::info!("Built {} training samples", samples.len());

        // ── Step 5: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        if train_samples.is_empty() {
            bail!("Training split is empty; lower train_fraction or add records");
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 6: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 7: Training loop ─────────────────────────────────────────────
        run_training(
            cfg,
            vocab.token_size(),
            vocab.answer_size(),
            pretrained,
            VqaDataset::new(train_samples),
            VqaDataset::new(val_samples),
            ckpt_manager,
        )
    }

    fn pretrained_embeddings(&self, vocab: &Vocabulary) -> Result<Option<EmbeddingMatrix>> {
        let cfg = &self.config;
        if !cfg.model.use_glove {
            return Ok(None);
        }
        let Some(path) = &cfg.glove_path else {
            bail!("use_glove is enabled but no --glove file was given");
        };
        EmbeddingStore::new(path)
            .load_matrix(vocab, cfg.model.word_embed_size)
            .map(Some)
    }
}

/// Preprocess every labelled record into a sample. Samples whose
/// answers all fell outside the answer space (see min_answer_count)
/// carry no target and are dropped.
pub fn build_samples(
    records: &[VqaRecord],
    cfg:     &TrainConfig,
    vocab:   &Vocabulary,
) -> Result<Vec<VqaSample>> {
    let questions = QuestionPreprocessor::new(cfg.max_token);
    let features  = FeaturePreprocessor::new(cfg.shapes());

    let samples: Vec<VqaSample> = records
        .iter()
        .filter(|r| r.is_labelled())
        .map(|r| {
            VqaSample::from_record(r, &questions, &features, vocab)
                .with_context(|| format!("Question {} ('{}')", r.question_id, r.question))
        })
        .collect::<Result<_>>()?;

    let total   = samples.len();
    let samples: Vec<VqaSample> = samples.into_iter().filter(|s| !s.has_no_target()).collect();
    if samples.len() < total {
        tracing::warn!(
            "Dropped {} samples whose answers are all outside the answer space",
            total - samples.len()
        );
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TrainConfig {
        TrainConfig {
            max_token:      4,
            frcn_max_boxes: 2,
            model:          NetConfig::new().with_img_feat_size(2),
            ..TrainConfig::default()
        }
    }

    fn record(question: &str, answers: &[&str]) -> VqaRecord {
        VqaRecord::new(question, vec![vec![1.0, 0.5]])
            .with_answers(answers.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_samples_without_target_are_dropped() {
        let records = vec![
            record("what color is the bus", &["blue", "blue"]),
            record("what color is the car", &["red"]),
            record("is it raining", &[]),
        ];
        let vocab   = Vocabulary::build(&records, 2);
        let samples = build_samples(&records, &small_config(), &vocab).unwrap();

        // "red" is below the count cut, the last record is unlabelled
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].ques_ix.len(), 4);
        assert_eq!(samples[0].frcn_feat.len(), 4);
        assert!(!samples[0].has_no_target());
    }

    #[test]
    fn test_feature_width_mismatch_names_the_question() {
        let mut bad = record("how many dogs", &["two"]);
        bad.question_id = 17;
        bad.frcn_feat   = vec![vec![1.0, 2.0, 3.0]];

        let records = vec![bad];
        let vocab   = Vocabulary::build(&records, 1);
        let err     = build_samples(&records, &small_config(), &vocab).unwrap_err();
        assert!(format!("{err:#}").contains("Question 17"));
    }
}
