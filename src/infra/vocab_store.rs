// ============================================================
// Layer 6 - Vocabulary Store
// ============================================================
// Persists the token and answer vocabularies next to the
// checkpoints. Every training run rebuilds it from its own
// records and overwrites vocab.json; `ask` only ever reads it.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::vocab::Vocabulary;
use crate::domain::vqa_record::VqaRecord;

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("vocab.json")
    }

    /// Build the vocabulary from `records` and save it, replacing any
    /// vocabulary left in the directory by an earlier run.
    pub fn build_and_save(&self, records: &[VqaRecord], min_answer_count: usize) -> Result<Vocabulary> {
        if self.path().exists() {
            tracing::warn!("Replacing existing vocabulary at '{}'", self.path().display());
        }
        let vocab = Vocabulary::build(records, min_answer_count);
        self.save(&vocab)?;
        Ok(vocab)
    }

    /// Read vocab.json written by `build_and_save`.

    pub fn load(&self) -> Result<Vocabulary> {
        let path = self.path();
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        let mut vocab: Vocabulary = serde_json::from_str(&json)
            .with_context(|| format!("Invalid vocabulary JSON in '{}'", path.display()))?;
        vocab.reindex();
        Ok(vocab)
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        std::fs::create_dir_all(&self.dir).ok();
        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(vocab)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        tracing::info!(
            "Vocabulary saved to '{}' ({} tokens, {} answers)",
            path.display(),
            vocab.token_size(),
            vocab.answer_size()
        );
        Ok(())
    }
}
