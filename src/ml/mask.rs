// ============================================================
// Layer 5 - Padding Masks
// ============================================================
// A position counts as padding when its feature vector is all
// zeros. The same rule masks question tokens (ids, PAD = 0) and
// zero-filled image regions.
//
// NOTE: a genuine all-zero feature row is indistinguishable from
// padding and will be masked too.

use burn::prelude::*;

/// Large negative logit written into masked positions before softmax.
pub const MASK_FILL: f32 = -1e9;

/// feature: [batch, len, dim] -> mask: [batch, 1, 1, len], `true` = padding
pub fn make_mask<B: Backend>(feature: Tensor<B, 3>) -> Tensor<B, 4, Bool> {
    let [batch, len, _] = feature.dims();
    feature
        .abs()
        .sum_dim(2)
        .equal_elem(0.0)
        .reshape([batch, 1, 1, len])
}

/// Mask for a padded token-id sequence: [batch, len] -> [batch, 1, 1, len]
pub fn make_token_mask<B: Backend>(ques_ix: Tensor<B, 2, Int>) -> Tensor<B, 4, Bool> {
    make_mask(ques_ix.float().unsqueeze_dim::<3>(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_flags_exactly_zero_rows() {
        let device = Default::default();
        // batch 0: [zero, nonzero, zero]; batch 1: [nonzero, mixed-sign, zero]
        let data = vec![
            0.0, 0.0,   1.0, 0.0,   0.0, 0.0,
            2.0, 3.0,   1.0, -1.0,  0.0, 0.0,
        ];
        let feature = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(data, [2, 3, 2]),
            &device,
        );

        let mask = make_mask(feature);
        assert_eq!(mask.dims(), [2, 1, 1, 3]);

        let flags: Vec<bool> = mask.into_data().to_vec().unwrap();
        assert_eq!(flags, vec![true, false, true, false, false, true]);
    }

    #[test]
    fn test_token_mask_marks_pad_ids() {
        let device = Default::default();
        let ids    = Tensor::<TestBackend, 1, Int>::from_ints([5, 1, 9, 0, 0, 3, 0, 0], &device)
            .reshape([2, 4]);

        let flags: Vec<bool> = make_token_mask(ids).into_data().to_vec().unwrap();
        // UNK (1) is a real token, only PAD (0) is masked
        assert_eq!(flags, vec![false, false, false, true, true, false, true, true]);
    }
}
