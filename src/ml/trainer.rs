// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on B (Autodiff), validation on
//     B::InnerBackend through model.valid(), so dropout is off
//   - lr follows LrSchedule (warmup, then step decay)
//   - gradients are clipped by global norm
//   - loss is BCE-with-logits against soft answer scores
//   - one checkpoint + one metrics row per epoch
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::VqaBatcher, dataset::VqaDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    embedding_store::EmbeddingMatrix,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::backend::{default_device, TrainBackend};
use crate::ml::loss::{bce_with_logits, LossReduction};
use crate::ml::model::Net;

pub fn run_training(
    cfg:           &TrainConfig,
    token_size:    usize,
    answer_size:   usize,
    pretrained:    Option<EmbeddingMatrix>,
    train_dataset: VqaDataset,
    val_dataset:   VqaDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<()> {
    let device = default_device();
    tracing::info!("Using device: {:?}", device);
    TrainBackend::seed(cfg.seed);

    train_loop::<TrainBackend>(
        cfg, token_size, answer_size, pretrained,
        train_dataset, val_dataset, &ckpt_manager, device,
    )?;

    tracing::info!("Training complete!");
    Ok(())
}

/// Sum over the batch of the soft target score at each arg-max
/// prediction (VQA accuracy before averaging).
pub fn soft_accuracy_sum<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> f64 {
    let pred = logits.argmax(1); // [batch, 1]
    targets.gather(1, pred).sum().into_scalar().elem::<f64>()
}

/// Undo the reduction of one batch loss, giving the loss summed over
/// every sample and answer. Dividing by the sample count then puts
/// train and validation losses on the same scale for either reduction.
pub fn batch_loss_total(loss: f64, [batch, answers]: [usize; 2], reduction: LossReduction) -> f64 {
    match reduction {
        LossReduction::Sum  => loss,
        LossReduction::Mean => loss * (batch * answers) as f64,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    token_size:    usize,
    answer_size:   usize,
    pretrained:    Option<EmbeddingMatrix>,
    train_dataset: VqaDataset,
    val_dataset:   VqaDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<Vec<EpochMetrics>> {

    // ── Build model ───────────────────────────────────────────────────────────
    let pretrained = pretrained.map(|m| {
        Tensor::<B, 1>::from_floats(m.values.as_slice(), &device).reshape([m.rows, m.dim])
    });
    let mut model: Net<B> = cfg.model.init(token_size, answer_size, pretrained, &device)?;
    tracing::info!(
        "Model ready: {} tokens, {} answers, hidden={}, {} BAN glimpses",
        token_size, answer_size, cfg.model.hidden_size, cfg.model.ba_glimpses
    );

    // ── Optimiser ─────────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.98)
        .with_epsilon(1e-9)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.grad_norm_clip)))
        .init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let shapes = cfg.shapes();
    let train_loader = DataLoaderBuilder::new(VqaBatcher::<B>::new(device.clone(), shapes))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(VqaBatcher::<B::InnerBackend>::new(device.clone(), shapes))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.dir())?;
    let schedule       = cfg.schedule();
    let mut history    = Vec::with_capacity(cfg.epochs);
    let mut best_acc   = f64::NEG_INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        let lr = schedule.lr_at(epoch);

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_samples  = 0usize;

        for batch in train_loader.iter() {
            let dims = batch.ans_score.dims();
            train_samples += dims[0];

            let logits = model.forward(
                batch.frcn_feat,
                batch.grid_feat,
                batch.bbox_feat,
                batch.ques_ix,
            );
            let loss = bce_with_logits(logits, batch.ans_score, cfg.loss_reduction);
            train_loss_sum += batch_loss_total(
                loss.clone().into_scalar().elem::<f64>(),
                dims,
                cfg.loss_reduction,
            );

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum  = 0.0f64;
        let mut score_sum     = 0.0f64;
        let mut val_samples   = 0usize;

        for batch in val_loader.iter() {
            let dims = batch.ans_score.dims();
            val_samples += dims[0];

            let logits = model_valid.forward(
                batch.frcn_feat,
                batch.grid_feat,
                batch.bbox_feat,
                batch.ques_ix,
            );
            let loss = bce_with_logits(logits.clone(), batch.ans_score.clone(), cfg.loss_reduction)
                .into_scalar()
                .elem::<f64>();
            val_loss_sum += batch_loss_total(loss, dims, cfg.loss_reduction);
            score_sum    += soft_accuracy_sum(logits, batch.ans_score);
        }

        let metrics = EpochMetrics {
            epoch:        epoch + 1,
            lr,
            train_loss:   if train_samples > 0 { train_loss_sum / train_samples as f64 } else { f64::NAN },
            val_loss:     if val_samples   > 0 { val_loss_sum   / val_samples   as f64 } else { f64::NAN },
            val_accuracy: if val_samples   > 0 { score_sum      / val_samples   as f64 } else { 0.0 },
        };

        println!(
            "Epoch {:>3}/{} | lr={:.2e} | train_loss/sample={:.4} | val_loss/sample={:.4} | val_acc={:.2}%",
            metrics.epoch, cfg.epochs, lr,
            metrics.train_loss, metrics.val_loss, metrics.val_accuracy * 100.0,
        );
        if metrics.is_improvement(best_acc) {
            best_acc = metrics.val_accuracy;
            tracing::info!("New best validation accuracy {:.4} at epoch {}", best_acc, metrics.epoch);
        }

        metrics_logger.log(&metrics)?;
        ckpt_manager.save_model(&model, metrics.epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", metrics.epoch);
        history.push(metrics);
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;

    use crate::data::dataset::VqaSample;
    use crate::ml::model::NetConfig;

    type TestBackend     = burn::backend::NdArray;
    type TestAutodiff    = burn::backend::Autodiff<TestBackend>;

    #[test]
    fn test_soft_accuracy_uses_argmax_score() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.1f32, 2.0, -1.0, 3.0, 0.0, 0.5], [2, 3]),
            &device,
        );
        let targets = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.6, 1.0, 0.3, 1.0, 0.0], [2, 3]),
            &device,
        );
        // row 0 picks class 1 (0.6), row 1 picks class 0 (0.3)
        let sum = soft_accuracy_sum(logits, targets);
        assert!((sum - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_loss_total_matches_across_reductions() {
        let device  = Default::default();
        let logits  = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.3f32, -1.2, 2.0, 0.0, 0.7, -0.4], [2, 3]),
            &device,
        );
        let targets = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.3, 1.0, 0.6, 0.0, 0.9], [2, 3]),
            &device,
        );

        let sum  = bce_with_logits(logits.clone(), targets.clone(), LossReduction::Sum)
            .into_scalar()
            .elem::<f64>();
        let mean = bce_with_logits(logits, targets, LossReduction::Mean)
            .into_scalar()
            .elem::<f64>();

        let a = batch_loss_total(sum,  [2, 3], LossReduction::Sum);
        let b = batch_loss_total(mean, [2, 3], LossReduction::Mean);
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }

    fn tiny_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            checkpoint_dir: dir.to_string_lossy().to_string(),
            batch_size:     2,
            epochs:         2,
            warmup_epochs:  1,
            lr_decay_list:  vec![],
            max_token:      4,
            frcn_max_boxes: 3,
            num_workers:    1,
            model: NetConfig::new()
                .with_word_embed_size(4)
                .with_hidden_size(4)
                .with_img_feat_size(2)
                .with_ba_glimpses(1)
                .with_k_times(2)
                .with_flat_mlp_size(4)
                .with_flat_out_size(6),
            ..TrainConfig::default()
        }
    }

    fn sample(i: usize) -> VqaSample {
        let mut ans_score = vec![0.0; 3];
        ans_score[i % 3] = 1.0;
        VqaSample {
            frcn_feat: vec![i as f32 + 1.0, 0.5, 1.0, 0.0, 0.0, 0.0],
            grid_feat: vec![0.0],
            bbox_feat: vec![0.0; 15],
            ques_ix:   vec![3 + (i % 4) as u32, 4, 0, 0],
            ans_score,
        }
    }

    #[test]
    fn test_train_loop_writes_checkpoints_and_metrics() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(dir.path());
        let ckpt = CheckpointManager::new(dir.path());

        let train = VqaDataset::new((0..6).map(sample).collect());
        let val   = VqaDataset::new((6..8).map(sample).collect());

        let history = train_loop::<TestAutodiff>(
            &cfg, 8, 3, None, train, val, &ckpt, Default::default(),
        )
        .unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.train_loss.is_finite() && m.val_loss.is_finite()));
        assert!(history.iter().all(|m| (0.0..=1.0).contains(&m.val_accuracy)));
        // warmup of one epoch halves the first lr
        assert!((history[0].lr - cfg.lr_base / 2.0).abs() < 1e-12);

        assert_eq!(ckpt.latest_epoch().unwrap(), 2);
        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }
}
