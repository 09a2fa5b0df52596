// ============================================================
// Layer 2 - Ask Use Case
// ============================================================
// Answers one question about one image:
//
//   1. Load the vocabularies saved next to the checkpoint
//   2. Rebuild the Net and load the newest weights
//   3. Read the image record (features + boxes) from JSON
//   4. Replace its question with the one asked and rank answers

use anyhow::Result;
use std::path::Path;

use crate::data::loader::load_record;
use crate::domain::traits::QuestionAnswerer;
use crate::domain::vqa_record::Prediction;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::inferencer::Inferencer;

pub struct AskUseCase<A: QuestionAnswerer = Inferencer> {
    answerer: A,
}

impl AskUseCase<Inferencer> {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let vocab      = VocabStore::new(checkpoint_dir).load()?;
        let ckpt       = CheckpointManager::new(checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt, vocab)?;
        Ok(Self { answerer: inferencer })
    }
}

impl<A: QuestionAnswerer> AskUseCase<A> {
    pub fn with_answerer(answerer: A) -> Self {
        Self { answerer }
    }

    pub fn answer(&self, question: &str, image: &Path, top_k: usize) -> Result<Vec<Prediction>> {
        let mut record = load_record(image)?;
        record.question = question.to_string();
        tracing::debug!(
            "Answering '{}' over {} regions",
            record.question,
            record.frcn_feat.len()
        );
        self.answerer.answer(&record, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vqa_record::VqaRecord;
    use std::io::Write;

    /// Echoes the question back so we can see what reached it.
    struct EchoAnswerer;

    impl QuestionAnswerer for EchoAnswerer {
        fn answer(&self, record: &VqaRecord, top_k: usize) -> Result<Vec<Prediction>> {
            Ok(vec![Prediction { answer: record.question.clone(), score: 1.0 }; top_k])
        }
    }

    #[test]
    fn test_question_overrides_record_question() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.json");
        let rec  = VqaRecord::new("stored question", vec![vec![1.0, 2.0]]);
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", serde_json::to_string(&rec).unwrap()).unwrap();

        let use_case = AskUseCase::with_answerer(EchoAnswerer);
        let preds = use_case.answer("what color is it", &path, 2).unwrap();

        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].answer, "what color is it");
    }

    #[test]
    fn test_missing_image_file_is_an_error() {
        let use_case = AskUseCase::with_answerer(EchoAnswerer);
        assert!(use_case.answer("q", Path::new("/nonexistent/image.json"), 1).is_err());
    }
}
