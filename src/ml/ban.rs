// ============================================================
// Layer 5 - Bilinear Attention Network (BAN) backbone
// ============================================================
// Fuses question features q: [batch, n_q, hidden] with region
// features v: [batch, n_v, img_feat] and returns refined question
// features of the same shape as q.
//
//   BilinearAttentionMap  - low-rank bilinear logits per glimpse,
//                           softmax over every (region, token) pair
//   BilinearConnect       - pools v and q through one attention map
//                           into a [batch, hidden] vector
//   Ban                   - one BilinearConnect + projection per
//                           glimpse, added residually onto q
//
// Reference: Kim, Jun & Zhang (2018) Bilinear Attention Networks

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Initializer},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::layers::fc::{FcNet, FcNetConfig};
use crate::ml::layers::weight_norm::frobenius_norm;
use crate::ml::mask::{make_mask, MASK_FILL};

#[derive(Config, Debug)]
pub struct BanConfig {
    pub hidden_size:   usize,
    pub img_feat_size: usize,
    pub glimpses:      usize,
    pub k_times:       usize,
    #[config(default = 0.2)]
    pub dropout_r: f64,
    #[config(default = 0.5)]
    pub classifier_dropout_r: f64,
}

impl BanConfig {
    pub fn ba_hidden_size(&self) -> usize {
        self.k_times * self.hidden_size
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Ban<B> {
        let attention = self.init_attention_map(device);
        let b_net = (0..self.glimpses)
            .map(|_| self.init_connect(device))
            .collect();
        let q_prj = (0..self.glimpses)
            .map(|_| {
                FcNetConfig::new(vec![self.hidden_size, self.hidden_size])
                    .with_activate(false)
                    .with_dropout_r(self.dropout_r)
                    .init(device)
            })
            .collect();
        Ban { attention, b_net, q_prj }
    }

    fn init_nets<B: Backend>(&self, device: &B::Device) -> (FcNet<B>, FcNet<B>) {
        let v_net = FcNetConfig::new(vec![self.img_feat_size, self.ba_hidden_size()])
            .with_dropout_r(self.dropout_r)
            .init(device);
        let q_net = FcNetConfig::new(vec![self.hidden_size, self.ba_hidden_size()])
            .with_dropout_r(self.dropout_r)
            .init(device);
        (v_net, q_net)
    }

    fn init_attention_map<B: Backend>(&self, device: &B::Device) -> BilinearAttentionMap<B> {
        let (v_net, q_net) = self.init_nets(device);
        let normal = Initializer::Normal { mean: 0.0, std: 1.0 };
        let h_direction: Tensor<B, 4> = normal
            .init([1, self.glimpses, 1, self.ba_hidden_size()], device)
            .val()
            .detach();
        let h_magnitude = frobenius_norm(h_direction.clone());
        BilinearAttentionMap {
            v_net,
            q_net,
            dropout:     DropoutConfig::new(self.classifier_dropout_r).init(),
            h_direction: Param::from_tensor(h_direction),
            h_magnitude: Param::from_tensor(h_magnitude),
            h_bias:      normal.init([1, self.glimpses, 1, 1], device),
            glimpses:    self.glimpses,
        }
    }

    fn init_connect<B: Backend>(&self, device: &B::Device) -> BilinearConnect<B> {
        let (v_net, q_net) = self.init_nets(device);
        BilinearConnect { v_net, q_net, k_times: self.k_times }
    }
}

// ─── Bilinear attention map ───────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct BilinearAttentionMap<B: Backend> {
    v_net:       FcNet<B>,
    q_net:       FcNet<B>,
    dropout:     Dropout,
    // h = magnitude * direction / ||direction||, shape [1, G, 1, K]
    h_direction: Param<Tensor<B, 4>>,
    h_magnitude: Param<Tensor<B, 1>>,
    h_bias:      Param<Tensor<B, 4>>,
    glimpses:    usize,
}

impl<B: Backend> BilinearAttentionMap<B> {
    fn h_mat(&self) -> Tensor<B, 4> {
        let direction = self.h_direction.val();
        let dims      = direction.dims();
        let scale = (self.h_magnitude.val() / frobenius_norm(direction.clone()))
            .reshape([1, 1, 1, 1])
            .expand(dims);
        direction * scale
    }

    /// Unnormalised logits [batch, glimpses, n_v, n_q].
    pub fn logits(&self, v: Tensor<B, 3>, q: Tensor<B, 3>) -> Tensor<B, 4> {
        let v_ = self.dropout.forward(self.v_net.forward(v)); // [b, n_v, k]
        let q_ = self.q_net.forward(q);                       // [b, n_q, k]
        let [batch, n_v, k] = v_.dims();
        let n_q = q_.dims()[1];
        let g   = self.glimpses;

        let vh = v_.unsqueeze_dim::<4>(1).expand([batch, g, n_v, k])
            * self.h_mat().expand([batch, g, n_v, k]);
        let qt = q_
            .swap_dims(1, 2)
            .unsqueeze_dim::<4>(1)
            .expand([batch, g, k, n_q]);

        vh.matmul(qt) + self.h_bias.val().expand([batch, g, n_v, n_q])
    }

    /// Attention maps [batch, glimpses, n_v, n_q]; each glimpse sums
    /// to one over all (region, token) pairs. All-zero regions are masked.
    pub fn forward(&self, v: Tensor<B, 3>, q: Tensor<B, 3>) -> Tensor<B, 4> {
        let v_mask = make_mask(v.clone()); // [b, 1, 1, n_v]
        let logits = self.logits(v, q);
        let [batch, g, n_v, n_q] = logits.dims();

        let mask = v_mask
            .reshape([batch, 1, n_v, 1])
            .expand([batch, g, n_v, n_q]);
        let logits = logits.mask_fill(mask, MASK_FILL);

        softmax(logits.reshape([batch, g, n_v * n_q]), 2).reshape([batch, g, n_v, n_q])
    }
}

// ─── Bilinear connect ─────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct BilinearConnect<B: Backend> {
    v_net:   FcNet<B>,
    q_net:   FcNet<B>,
    k_times: usize,
}

impl<B: Backend> BilinearConnect<B> {
    /// Sum over (i, j) of v_[i] * w[i, j] * q_[j], then sum-pool every
    /// `k_times` consecutive features: -> [batch, hidden]
    pub fn forward_with_weights(
        &self,
        v: Tensor<B, 3>,
        q: Tensor<B, 3>,
        w: Tensor<B, 3>,
    ) -> Tensor<B, 2> {
        let v_ = self.v_net.forward(v); // [b, n_v, k]
        let q_ = self.q_net.forward(q); // [b, n_q, k]
        let [batch, _, k] = v_.dims();

        let joint = (w.matmul(q_) * v_).sum_dim(1).reshape([batch, k]);
        joint
            .reshape([batch, k / self.k_times, self.k_times])
            .sum_dim(2)
            .reshape([batch, k / self.k_times])
    }
}

// ─── Ban ──────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Ban<B: Backend> {
    attention: BilinearAttentionMap<B>,
    b_net:     Vec<BilinearConnect<B>>,
    q_prj:     Vec<FcNet<B>>,
}

impl<B: Backend> Ban<B> {
    /// q: [batch, n_q, hidden], v: [batch, n_v, img_feat] -> [batch, n_q, hidden]
    pub fn forward(&self, q: Tensor<B, 3>, v: Tensor<B, 3>) -> Tensor<B, 3> {
        let att = self.attention.forward(v.clone(), q.clone());
        let [batch, _, n_v, n_q] = att.dims();

        let mut q = q;
        for (g, (b_net, q_prj)) in self.b_net.iter().zip(&self.q_prj).enumerate() {
            let w = att
                .clone()
                .slice([0..batch, g..g + 1, 0..n_v, 0..n_q])
                .reshape([batch, n_v, n_q]);
            let bi_emb = b_net.forward_with_weights(v.clone(), q.clone(), w);
            let dims   = q.dims();
            q = q_prj.forward(bi_emb.unsqueeze_dim::<3>(1)).expand(dims) + q;
        }
        q
    }
}
