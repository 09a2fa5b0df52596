// ============================================================
// Layer 6 - Pretrained Word Embeddings
// ============================================================
// Reads GloVe-style text vectors ("word v1 v2 ... vD" per line)
// and lays them out as a row-major [token_size, dim] matrix in
// vocabulary order. Tokens without a vector (PAD, UNK, CLS, rare
// words) keep an all-zero row.

use anyhow::{bail, Context, Result};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::data::vocab::Vocabulary;

pub struct EmbeddingStore {
    path: PathBuf,
}

/// Row-major [rows, dim] matrix ready for `Tensor::from_floats`.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    pub values: Vec<f32>,
    pub rows:   usize,
    pub dim:    usize,
    /// Vocabulary entries that received a pretrained vector
    pub hits:   usize,
}

impl EmbeddingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load_matrix(&self, vocab: &Vocabulary, dim: usize) -> Result<EmbeddingMatrix> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open embeddings '{}'", self.path.display()))?;

        let rows_by_token: HashMap<&str, usize> = vocab
            .tokens()
            .map(|(token, ix)| (token, ix as usize))
            .collect();

        let rows       = vocab.token_size();
        let mut values = vec![0.0f32; rows * dim];
        let mut hits   = 0usize;

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Cannot read line {}", line_no + 1))?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let Some(&row) = rows_by_token.get(word) else { continue };

            let vector: Vec<f32> = parts
                .map(str::parse::<f32>)
                .collect::<Result<Vec<f32>, _>>()
                .with_context(|| format!("Bad number on line {} of '{}'", line_no + 1, self.path.display()))?;
            if vector.len() != dim {
                bail!(
                    "Embedding for '{}' has {} values, expected {} (line {})",
                    word,
                    vector.len(),
                    dim,
                    line_no + 1
                );
            }

            values[row * dim..(row + 1) * dim].copy_from_slice(&vector);
            hits += 1;
        }

        tracing::info!(
            "Pretrained embeddings: {}/{} tokens covered from '{}'",
            hits,
            rows,
            self.path.display()
        );
        Ok(EmbeddingMatrix { values, rows, dim, hits })
    }
}
