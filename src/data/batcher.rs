// ============================================================
// Layer 4 - VQA Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N pre-padded samples
// into one VqaBatch.
//
//   frcn_feat  [N, frcn_max_boxes, img_feat_size]
//   grid_feat  [N, grid_max_len,   grid_feat_size]
//   bbox_feat  [N, frcn_max_boxes, 5]
//   ques_ix    [N, max_token]      (Int)
//   ans_score  [N, answer_size]
//
// Each field is flattened sample-by-sample into one Vec and
// reshaped, e.g. [s1_t1 .. s1_tL, s2_t1 .. sN_tL] → [N, L].
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::VqaSample;
use crate::data::preprocessor::FeatureShapes;

/// One batch of N samples, ready for `Net::forward`.
#[derive(Debug, Clone)]
pub struct VqaBatch<B: Backend> {
    /// Region features [N, frcn_max_boxes, img_feat_size], zero rows are padding
    pub frcn_feat: Tensor<B, 3>,
    /// Grid features [N, grid_max_len, grid_feat_size]
    pub grid_feat: Tensor<B, 3>,
    /// Normalised box corners + area [N, frcn_max_boxes, 5]
    pub bbox_feat: Tensor<B, 3>,
    /// Question token ids [N, max_token], PAD = 0
    pub ques_ix:   Tensor<B, 2, Int>,
    /// Soft answer scores in [0, 1] [N, answer_size]
    pub ans_score: Tensor<B, 2>,
}

/// Stacks `VqaSample`s on a fixed device.
#[derive(Clone, Debug)]
pub struct VqaBatcher<B: Backend> {
    /// Device every batch tensor is created on
    pub device: B::Device,
    /// Padded shapes every sample already has
    pub shapes: FeatureShapes,
}

impl<B: Backend> VqaBatcher<B> {
    /// Create a batcher that places tensors on `device`.
    pub fn new(device: B::Device, shapes: FeatureShapes) -> Self {
        Self { device, shapes }
    }

    /// Concatenate one f32 field of every sample and reshape it.
    fn floats<const D: usize>(
        &self,
        items: &[VqaSample],
        field: fn(&VqaSample) -> &[f32],
        shape: [usize; D],
    ) -> Tensor<B, D> {
        let flat: Vec<f32> = items.iter().flat_map(|s| field(s).iter().copied()).collect();
        Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device).reshape(shape)
    }
}

impl<B: Backend> Batcher<VqaSample, VqaBatch<B>> for VqaBatcher<B> {
    fn batch(&self, items: Vec<VqaSample>) -> VqaBatch<B> {
        let n           = items.len();
        let max_token   = items[0].ques_ix.len();
        let answer_size = items[0].ans_score.len();
        let s           = self.shapes;

        let frcn_feat = self.floats(&items, |x| x.frcn_feat.as_slice(), [n, s.frcn_max_boxes, s.img_feat_size]);
        let grid_feat = self.floats(&items, |x| x.grid_feat.as_slice(), [n, s.grid_max_len, s.grid_feat_size]);
        let bbox_feat = self.floats(&items, |x| x.bbox_feat.as_slice(), [n, s.frcn_max_boxes, 5]);
        let ans_score = self.floats(&items, |x| x.ans_score.as_slice(), [n, answer_size]);

        // Burn builds Int tensors from i32 slices
        let ques_flat: Vec<i32> = items
            .iter()
            .flat_map(|x| x.ques_ix.iter().map(|&id| id as i32))
            .collect();
        let ques_ix = Tensor::<B, 1, Int>::from_ints(ques_flat.as_slice(), &self.device)
            .reshape([n, max_token]);

        VqaBatch { frcn_feat, grid_feat, bbox_feat, ques_ix, ans_score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn sample(offset: f32) -> VqaSample {
        VqaSample {
            frcn_feat: vec![offset; 2 * 3],
            grid_feat: vec![0.0; 1],
            bbox_feat: vec![0.0; 2 * 5],
            ques_ix:   vec![3, 4, 0, 0],
            ans_score: vec![0.3, 0.0, 1.0],
        }
    }

    #[test]
    fn test_batch_shapes() {
        let shapes  = FeatureShapes { frcn_max_boxes: 2, img_feat_size: 3, grid_max_len: 1, grid_feat_size: 1 };
        let batcher = VqaBatcher::<TestBackend>::new(Default::default(), shapes);
        let batch   = batcher.batch(vec![sample(1.0), sample(2.0)]);

        assert_eq!(batch.frcn_feat.dims(), [2, 2, 3]);
        assert_eq!(batch.grid_feat.dims(), [2, 1, 1]);
        assert_eq!(batch.bbox_feat.dims(), [2, 2, 5]);
        assert_eq!(batch.ques_ix.dims(),   [2, 4]);
        assert_eq!(batch.ans_score.dims(), [2, 3]);
    }

    #[test]
    fn test_batch_keeps_sample_order() {
        let shapes  = FeatureShapes { frcn_max_boxes: 2, img_feat_size: 3, grid_max_len: 1, grid_feat_size: 1 };
        let batcher = VqaBatcher::<TestBackend>::new(Default::default(), shapes);
        let batch   = batcher.batch(vec![sample(1.0), sample(2.0)]);

        let frcn: Vec<f32> = batch.frcn_feat.into_data().to_vec().unwrap();
        assert!(frcn[..6].iter().all(|v| *v == 1.0));
        assert!(frcn[6..].iter().all(|v| *v == 2.0));

        let ids: Vec<i64> = batch.ques_ix.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(ids, vec![3, 4, 0, 0, 3, 4, 0, 0]);
    }
}
