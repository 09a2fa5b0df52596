// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `ask` and `write-config`.
//
// Network hyper-parameters come from a NetConfig JSON file
// (`--model-config`, see `write-config`); run-level settings
// are plain flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{Context, Result};
use burn::config::Config;
use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::{loss::LossReduction, model::NetConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the BAN model on a JSON-lines VQA dataset
    Train(TrainArgs),

    /// Answer a question about one image using a trained checkpoint
    Ask(AskArgs),

    /// Write the default network config as JSON, ready to edit
    WriteConfig(WriteConfigArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON-lines file, one question/image record per line
    #[arg(long, default_value = "data/train.jsonl")]
    pub data: String,

    /// Directory for checkpoints, vocabularies, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// NetConfig JSON; defaults are used when omitted
    #[arg(long)]
    pub model_config: Option<String>,

    /// GloVe-style text file (`word v1 v2 ...`), needs use_glove in the model config
    #[arg(long)]
    pub glove: Option<String>,

    /// Override the image feature width from the model config
    #[arg(long)]
    pub img_feat_size: Option<usize>,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 13)]
    pub epochs: usize,

    #[arg(long, default_value_t = 2e-3)]
    pub lr_base: f64,

    /// Multiplier applied at every epoch in --lr-decay-list
    #[arg(long, default_value_t = 0.25)]
    pub lr_decay_r: f64,

    #[arg(long, value_delimiter = ',', default_value = "10,12")]
    pub lr_decay_list: Vec<usize>,

    #[arg(long, default_value_t = 3)]
    pub warmup_epochs: usize,

    /// Global gradient norm clip
    #[arg(long, default_value_t = 0.25)]
    pub grad_norm_clip: f32,

    #[arg(long, value_enum, default_value_t = LossReduction::Sum)]
    pub loss_reduction: LossReduction,

    /// Question length after truncation / padding
    #[arg(long, default_value_t = 14)]
    pub max_token: usize,

    /// Region rows after truncation / padding
    #[arg(long, default_value_t = 100)]
    pub frcn_max_boxes: usize,

    #[arg(long, default_value_t = 1)]
    pub grid_max_len: usize,

    #[arg(long, default_value_t = 1)]
    pub grid_feat_size: usize,

    /// Answers seen fewer times than this are dropped from the answer space
    #[arg(long, default_value_t = 1)]
    pub min_answer_count: usize,

    /// Share of labelled samples used for training; the rest validate
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,
}

/// Boundary between Layer 1 and Layer 2: the application layer
/// never sees clap types. Fallible because the model config is
/// read from disk.
impl TryFrom<TrainArgs> for TrainConfig {
    type Error = anyhow::Error;

    fn try_from(a: TrainArgs) -> Result<Self> {
        let mut model = match &a.model_config {
            Some(path) => NetConfig::load(path)
                .with_context(|| format!("Cannot load model config '{path}'"))?,
            None => NetConfig::new(),
        };
        if let Some(size) = a.img_feat_size {
            model.img_feat_size = size;
        }

        Ok(TrainConfig {
            data_path:        a.data,
            checkpoint_dir:   a.checkpoint_dir,
            glove_path:       a.glove,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr_base:          a.lr_base,
            lr_decay_r:       a.lr_decay_r,
            lr_decay_list:    a.lr_decay_list,
            warmup_epochs:    a.warmup_epochs,
            grad_norm_clip:   a.grad_norm_clip,
            loss_reduction:   a.loss_reduction,
            max_token:        a.max_token,
            frcn_max_boxes:   a.frcn_max_boxes,
            grid_max_len:     a.grid_max_len,
            grid_feat_size:   a.grid_feat_size,
            min_answer_count: a.min_answer_count,
            train_fraction:   a.train_fraction,
            seed:             a.seed,
            num_workers:      a.num_workers,
            model,
        })
    }
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The natural language question
    #[arg(long)]
    pub question: String,

    /// JSON file with the image's region features and boxes
    #[arg(long)]
    pub image: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of ranked answers to print
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,
}

#[derive(Args, Debug)]
pub struct WriteConfigArgs {
    #[arg(long, default_value = "model_config.json")]
    pub out: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => TrainConfig::try_from(a).unwrap(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults_match_train_config() {
        let cfg = train_config(&["ban-vqa", "train"]);
        let def = TrainConfig::default();
        assert_eq!(cfg.lr_decay_list, def.lr_decay_list);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.max_token, def.max_token);
        assert_eq!(cfg.loss_reduction, def.loss_reduction);
        assert_eq!(cfg.model.hidden_size, 1024);
    }

    #[test]
    fn test_model_config_file_and_override() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        NetConfig::new().with_hidden_size(16).save(&path).unwrap();

        let path_str = path.to_string_lossy().to_string();
        let cfg = train_config(&[
            "ban-vqa", "train",
            "--model-config", &path_str,
            "--img-feat-size", "32",
            "--lr-decay-list", "4,6",
            "--loss-reduction", "mean",
        ]);
        assert_eq!(cfg.model.hidden_size, 16);
        assert_eq!(cfg.model.img_feat_size, 32);
        assert_eq!(cfg.lr_decay_list, vec![4, 6]);
        assert_eq!(cfg.loss_reduction, LossReduction::Mean);
    }

    #[test]
    fn test_missing_model_config_is_an_error() {
        let cli = Cli::try_parse_from(["ban-vqa", "train", "--model-config", "/nonexistent.json"]).unwrap();
        let Commands::Train(a) = cli.command else { panic!("expected train") };
        assert!(TrainConfig::try_from(a).is_err());
    }
}
