// ============================================================
// Layer 4 - Answer Normalisation & Soft Targets
// ============================================================
// Annotators phrase the same answer differently ("Two", "2",
// "the 2."), so answers are normalised before counting:
//   - lowercase, trim
//   - punctuation removed (a '.' between digits is kept)
//   - number words "none", zero..nine → digits
//   - articles a / an / the dropped
//
// The training target for an answer class is a soft score from
// how many annotators gave it:
//   0 → 0.0, 1 → 0.3, 2 → 0.6, 3 → 0.9, 4+ → 1.0

use std::collections::HashMap;

use crate::data::vocab::Vocabulary;

const NUMBER_WORDS: [(&str, &str); 11] = [
    ("none", "0"), ("zero", "0"), ("one", "1"), ("two", "2"), ("three", "3"),
    ("four", "4"), ("five", "5"), ("six", "6"), ("seven", "7"), ("eight", "8"),
    ("nine", "9"),
];
const ARTICLES: [&str; 3] = ["a", "an", "the"];

pub fn normalize_answer(answer: &str) -> String {
    let lower: Vec<char> = answer.trim().to_lowercase().chars().collect();

    let mut stripped = String::with_capacity(lower.len());
    for (i, &c) in lower.iter().enumerate() {
        let between_digits = c == '.'
            && i > 0
            && lower[i - 1].is_ascii_digit()
            && lower.get(i + 1).is_some_and(char::is_ascii_digit);
        if c.is_alphanumeric() || c.is_whitespace() || between_digits {
            stripped.push(c);
        } else if c == '-' || c == '/' {
            stripped.push(' ');
        }
    }

    stripped
        .split_whitespace()
        .filter(|w| !ARTICLES.contains(w))
        .map(|w| {
            NUMBER_WORDS
                .iter()
                .find(|(word, _)| *word == w)
                .map_or(w, |(_, digit)| *digit)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn soft_score(count: usize) -> f32 {
    match count {
        0 => 0.0,
        1 => 0.3,
        2 => 0.6,
        3 => 0.9,
        _ => 1.0,
    }
}

/// Normalised answer → number of annotators who gave it.
pub fn answer_counts(answers: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for answer in answers {
        *counts.entry(normalize_answer(answer)).or_insert(0) += 1;
    }
    counts
}

/// Dense soft-score vector over the answer space. Answers outside
/// the vocabulary are dropped.
pub fn answer_target(answers: &[String], vocab: &Vocabulary) -> Vec<f32> {
    let mut target = vec![0.0; vocab.answer_size()];
    for (answer, count) in answer_counts(answers) {
        if let Some(ix) = vocab.answer_ix(&answer) {
            target[ix] = soft_score(count);
        }
    }
    target
}
