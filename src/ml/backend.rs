// ============================================================
// Layer 5 - Backend Selection
// ============================================================
// Training runs on Autodiff<Inner>; validation and inference
// run on the inner backend so dropout is switched off.
//
// The inner backend is NdArray (CPU) unless the crate is built
// with `--features wgpu`.

use burn::prelude::*;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub fn default_device() -> <InferBackend as Backend>::Device {
    Default::default()
}
