// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn tensors lives here. The data
// layer hands over padded Vec<f32> samples; this layer turns
// them into answer logits.
//
//   layers/     - FC, MLP, weight-normalised FCNet
//   mask.rs     - padding masks for regions and tokens
//   attflat.rs  - attention-weighted flattening
//   ban.rs      - bilinear attention network backbone
//   model.rs    - Net: embedding, GRU, BAN, AttFlat, classifier
//   loss.rs     - BCE-with-logits on soft scores
//   schedule.rs - warmup + step-decay learning rate
//   trainer.rs  - train / validation loop, checkpoints
//   inferencer.rs - checkpoint loading and answer ranking
//
// Reference: Kim et al. (2018) Bilinear Attention Networks
//            Burn Book §3 (Building Blocks), §5 (Training)

/// Backend aliases (NdArray by default, WGPU behind a feature)
pub mod backend;

pub mod layers;

pub mod mask;

/// Attention-weighted flattening with glimpses
pub mod attflat;

/// Bilinear attention network backbone
pub mod ban;

/// The full VQA network
pub mod model;

pub mod loss;

pub mod schedule;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads a checkpoint and ranks answers
pub mod inferencer;
