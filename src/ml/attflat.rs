// ============================================================
// Layer 5 - AttFlat (attention flattening)
// ============================================================
// Pools a masked sequence [batch, len, hidden] into a single
// vector [batch, flat_out_size]:
//
//   1. MLP scores every position once per glimpse
//   2. padding positions are filled with MASK_FILL
//   3. softmax over the sequence axis, per glimpse
//   4. each glimpse takes a weighted sum of the hidden states
//   5. the glimpse vectors are concatenated in glimpse order
//   6. a linear layer merges them to the output size
//
// A fully padded row ends up with uniform attention; nothing
// guards against it.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::layers::fc::{Mlp, MlpConfig};
use crate::ml::mask::MASK_FILL;

#[derive(Config, Debug)]
pub struct AttFlatConfig {
    pub hidden_size:   usize,
    pub flat_mlp_size: usize,
    pub flat_glimpses: usize,
    pub flat_out_size: usize,
    #[config(default = 0.1)]
    pub dropout_r: f64,
}

impl AttFlatConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttFlat<B> {
        let mlp = MlpConfig::new(self.hidden_size, self.flat_mlp_size, self.flat_glimpses)
            .with_dropout_r(self.dropout_r)
            .with_use_relu(true)
            .init(device);
        let linear_merge = LinearConfig::new(
            self.hidden_size * self.flat_glimpses,
            self.flat_out_size,
        )
        .init(device);
        AttFlat { mlp, linear_merge, glimpses: self.flat_glimpses }
    }
}

#[derive(Module, Debug)]
pub struct AttFlat<B: Backend> {
    pub mlp:          Mlp<B>,
    pub linear_merge: Linear<B>,
    pub glimpses:     usize,
}

impl<B: Backend> AttFlat<B> {
    /// x: [batch, len, hidden], x_mask: [batch, 1, 1, len] -> [batch, flat_out_size]
    pub fn forward(&self, x: Tensor<B, 3>, x_mask: Tensor<B, 4, Bool>) -> Tensor<B, 2> {
        self.forward_with_fill(x, x_mask, MASK_FILL)
    }

    /// Same as `forward` with an explicit value for masked logits.
    pub fn forward_with_fill(
        &self,
        x:      Tensor<B, 3>,
        x_mask: Tensor<B, 4, Bool>,
        fill:   f32,
    ) -> Tensor<B, 2> {
        let pooled = self.pool(x.clone(), self.attention(x, x_mask, fill));
        self.linear_merge.forward(pooled)
    }

    /// Per-glimpse attention weights [batch, len, glimpses]; each
    /// glimpse column sums to one over the sequence axis.
    pub fn attention(
        &self,
        x:      Tensor<B, 3>,
        x_mask: Tensor<B, 4, Bool>,
        fill:   f32,
    ) -> Tensor<B, 3> {
        let [batch, len, _] = x.dims();
        let mask = x_mask
            .reshape([batch, len, 1])
            .expand([batch, len, self.glimpses]);
        let logits = self.mlp.forward(x).mask_fill(mask, fill);
        softmax(logits, 1)
    }

    /// Weighted sums per glimpse, concatenated glimpse-major:
    /// [batch, len, hidden] x [batch, len, glimpses] -> [batch, glimpses * hidden]
    pub fn pool(&self, x: Tensor<B, 3>, att: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, len, hidden] = x.dims();
        let glimpses: Vec<Tensor<B, 2>> = (0..self.glimpses)
            .map(|g| {
                let weights = att
                    .clone()
                    .slice([0..batch, 0..len, g..g + 1])
                    .expand([batch, len, hidden]);
                (weights * x.clone()).sum_dim(1).reshape([batch, hidden])
            })
            .collect();
        Tensor::cat(glimpses, 1)
    }
}
