// ============================================================
// Layer 5 - Binary Cross-Entropy on Soft Answer Scores
// ============================================================
// Each answer class is an independent sigmoid target in [0, 1]
// (annotator agreement), so the loss is BCE-with-logits:
//
//   l = max(x, 0) - x * y + log(1 + exp(-|x|))
//
// which is the numerically stable form of
//   -[y * log(sigmoid(x)) + (1 - y) * log(1 - sigmoid(x))]

use burn::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LossReduction {
    Sum,
    Mean,
}

/// logits, targets: [batch, answer_size] -> scalar loss [1]
pub fn bce_with_logits<B: Backend>(
    logits:    Tensor<B, 2>,
    targets:   Tensor<B, 2>,
    reduction: LossReduction,
) -> Tensor<B, 1> {
    let loss = logits.clone().clamp_min(0.0)
        - logits.clone() * targets
        + (logits.abs().neg().exp() + 1.0).log();

    match reduction {
        LossReduction::Sum  => loss.sum(),
        LossReduction::Mean => loss.mean(),
    }
}
