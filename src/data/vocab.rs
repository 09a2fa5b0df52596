// ============================================================
// Layer 4 - Vocabularies
// ============================================================
// token_to_ix: question words → embedding rows
//   0 = PAD, 1 = UNK, 2 = CLS, then words in first-seen order
//
// answers: the answer space, one classifier output per entry,
//   ordered by frequency (desc) then alphabetically so the same
//   corpus always yields the same class indices.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::data::answer::normalize_answer;
use crate::data::preprocessor::QuestionPreprocessor;
use crate::domain::vqa_record::VqaRecord;

pub const PAD_IX: u32 = 0;
pub const UNK_IX: u32 = 1;
pub const CLS_IX: u32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    token_to_ix: BTreeMap<String, u32>,
    answers:     Vec<String>,
    #[serde(skip)]
    ans_to_ix:   HashMap<String, usize>,
}

impl Vocabulary {
    /// Token vocabulary only; the answer space is empty.
    pub fn from_questions<'a>(questions: impl Iterator<Item = &'a str>) -> Self {
        let mut token_to_ix = BTreeMap::from([
            ("PAD".to_string(), PAD_IX),
            ("UNK".to_string(), UNK_IX),
            ("CLS".to_string(), CLS_IX),
        ]);
        for question in questions {
            for word in QuestionPreprocessor::tokenize(question) {
                let next = token_to_ix.len() as u32;
                token_to_ix.entry(word).or_insert(next);
            }
        }
        Self { token_to_ix, ..Default::default() }
    }

    /// Tokens from every question; answers seen at least
    /// `min_answer_count` times across all annotations.
    pub fn build(records: &[VqaRecord], min_answer_count: usize) -> Self {
        let mut vocab = Self::from_questions(records.iter().map(|r| r.question.as_str()));

        let mut counts: HashMap<String, usize> = HashMap::new();
        for answer in records.iter().flat_map(|r| &r.answers) {
            let answer = normalize_answer(answer);
            if !answer.is_empty() {
                *counts.entry(answer).or_insert(0) += 1;
            }
        }

        let mut answers: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(_, n)| *n >= min_answer_count)
            .collect();
        answers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        vocab.answers = answers.into_iter().map(|(a, _)| a).collect();
        vocab.reindex();

        tracing::info!(
            "Vocabulary: {} tokens, {} answers (min count {})",
            vocab.token_size(),
            vocab.answer_size(),
            min_answer_count
        );
        vocab
    }

    /// Rebuild the answer lookup table (it is not serialised).
    pub fn reindex(&mut self) {
        self.ans_to_ix = self
            .answers
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();
    }

    pub fn token_ix(&self, token: &str) -> Option<u32> {
        self.token_to_ix.get(token).copied()
    }

    pub fn tokens(&self) -> impl Iterator<Item = (&str, u32)> {
        self.token_to_ix.iter().map(|(t, ix)| (t.as_str(), *ix))
    }

    pub fn answer_ix(&self, answer: &str) -> Option<usize> {
        self.ans_to_ix.get(answer).copied()
    }

    pub fn answer(&self, ix: usize) -> Option<&str> {
        self.answers.get(ix).map(String::as_str)
    }

    pub fn token_size(&self) -> usize {
        self.token_to_ix.len()
    }

    pub fn answer_size(&self) -> usize {
        self.answers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, answers: &[&str]) -> VqaRecord {
        VqaRecord::new(question, vec![vec![1.0]])
            .with_answers(answers.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_special_tokens_come_first() {
        let vocab = Vocabulary::from_questions(["what is this"].iter().copied());
        assert_eq!(vocab.token_ix("PAD"), Some(PAD_IX));
        assert_eq!(vocab.token_ix("UNK"), Some(UNK_IX));
        assert_eq!(vocab.token_ix("CLS"), Some(CLS_IX));
        assert_eq!(vocab.token_ix("what"), Some(3));
        assert_eq!(vocab.token_ix("this"), Some(5));
        assert_eq!(vocab.token_size(), 6);
    }

    #[test]
    fn test_repeated_words_share_an_index() {
        let vocab = Vocabulary::from_questions(["is it red", "is it blue"].iter().copied());
        assert_eq!(vocab.token_size(), 3 + 4);
    }

    #[test]
    fn test_answers_ordered_by_frequency_then_name() {
        let records = vec![
            record("q one", &["yes", "no", "Yes"]),
            record("q two", &["two", "2", "blue"]),
        ];
        let vocab = Vocabulary::build(&records, 1);
        // "yes" x2, "2" x2 (from "two"), "blue" x1, "no" x1
        assert_eq!(vocab.answer(0), Some("2"));
        assert_eq!(vocab.answer(1), Some("yes"));
        assert_eq!(vocab.answer(2), Some("blue"));
        assert_eq!(vocab.answer(3), Some("no"));
        assert_eq!(vocab.answer_ix("yes"), Some(1));
    }

    #[test]
    fn test_min_answer_count_filters_rare_answers() {
        let records = vec![record("q", &["cat", "cat", "dog"])];
        let vocab   = Vocabulary::build(&records, 2);
        assert_eq!(vocab.answer_size(), 1);
        assert_eq!(vocab.answer_ix("dog"), None);
    }

    #[test]
    fn test_json_roundtrip_needs_reindex() {
        let records = vec![record("what animal", &["cat"])];
        let vocab   = Vocabulary::build(&records, 1);
        let json    = serde_json::to_string(&vocab).unwrap();

        let mut loaded: Vocabulary = serde_json::from_str(&json).unwrap();
        loaded.reindex();
        assert_eq!(loaded.answer_ix("cat"), Some(0));
        assert_eq!(loaded.token_ix("animal"), vocab.token_ix("animal"));
    }
}
