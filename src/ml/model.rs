// ============================================================
// Layer 5 - Net (question + image -> answer logits)
// ============================================================
//   ques_ix ─► Embedding ─► GRU ─► BAN(q, frcn) ─► AttFlat ─► Classifier
//                 │                                   ▲
//                 └────────────── make_mask ──────────┘
//
// Grid and spatial features are accepted by `forward` but not
// consumed; only region (Faster R-CNN) features reach the backbone.

use anyhow::{bail, Result};
use burn::{
    module::Param,
    nn::{
        gru::{Gru, GruConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::attflat::{AttFlat, AttFlatConfig};
use crate::ml::ban::{Ban, BanConfig};
use crate::ml::layers::weight_norm::{WeightNormLinear, WeightNormLinearConfig};
use crate::ml::mask::make_token_mask;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct NetConfig {
    #[config(default = 300)]
    pub word_embed_size: usize,
    #[config(default = false)]
    pub use_glove: bool,
    #[config(default = 1024)]
    pub hidden_size: usize,
    #[config(default = 2048)]
    pub img_feat_size: usize,
    /// Bilinear attention glimpses in the backbone
    #[config(default = 8)]
    pub ba_glimpses: usize,
    #[config(default = 3)]
    pub k_times: usize,
    #[config(default = 0.2)]
    pub dropout_r: f64,
    #[config(default = 0.5)]
    pub classifier_dropout_r: f64,
    #[config(default = 512)]
    pub flat_mlp_size: usize,
    /// Attention glimpses in AttFlat
    #[config(default = 1)]
    pub flat_glimpses: usize,
    #[config(default = 2048)]
    pub flat_out_size: usize,
}

impl NetConfig {
    pub fn backbone(&self) -> BanConfig {
        BanConfig::new(self.hidden_size, self.img_feat_size, self.ba_glimpses, self.k_times)
            .with_dropout_r(self.dropout_r)
            .with_classifier_dropout_r(self.classifier_dropout_r)
    }

    pub fn attflat(&self) -> AttFlatConfig {
        AttFlatConfig::new(
            self.hidden_size,
            self.flat_mlp_size,
            self.flat_glimpses,
            self.flat_out_size,
        )
        .with_dropout_r(self.dropout_r)
    }

    /// Build the network. `pretrained_emb` ([token_size, word_embed_size])
    /// replaces the embedding table when `use_glove` is set.
    pub fn init<B: Backend>(
        &self,
        token_size:     usize,
        answer_size:    usize,
        pretrained_emb: Option<Tensor<B, 2>>,
        device:         &B::Device,
    ) -> Result<Net<B>> {
        let mut embedding = EmbeddingConfig::new(token_size, self.word_embed_size).init(device);

        if self.use_glove {
            let Some(pretrained) = pretrained_emb else {
                bail!("use_glove is set but no pretrained embedding matrix was supplied");
            };
            let expected = [token_size, self.word_embed_size];
            if pretrained.dims() != expected {
                bail!(
                    "pretrained embedding has shape {:?}, expected {:?}",
                    pretrained.dims(),
                    expected
                );
            }
            embedding.weight = Param::from_tensor(pretrained);
        }

        let rnn = GruConfig::new(self.word_embed_size, self.hidden_size, true).init(device);

        let classifier = Classifier {
            hidden:  WeightNormLinearConfig::new(self.flat_out_size, self.flat_out_size).init(device),
            dropout: DropoutConfig::new(self.classifier_dropout_r).init(),
            output:  WeightNormLinearConfig::new(self.flat_out_size, answer_size).init(device),
        };

        Ok(Net {
            embedding,
            rnn,
            backbone:     self.backbone().init(device),
            attflat_lang: self.attflat().init(device),
            classifier,
        })
    }
}

// ─── Classifier head ──────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    hidden:  WeightNormLinear<B>,
    dropout: Dropout,
    output:  WeightNormLinear<B>,
}

impl<B: Backend> Classifier<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.dropout.forward(relu(self.hidden.forward(x)));
        self.output.forward(x)
    }
}

// ─── Net ──────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    pub embedding:    Embedding<B>,
    pub rnn:          Gru<B>,
    pub backbone:     Ban<B>,
    pub attflat_lang: AttFlat<B>,
    pub classifier:   Classifier<B>,
}

impl<B: Backend> Net<B> {
    /// frcn_feat: [batch, n_boxes, img_feat_size]
    /// grid_feat: [batch, n_grid, grid_feat_size]   (unused)
    /// bbox_feat: [batch, n_boxes, 5]               (unused)
    /// ques_ix:   [batch, max_token]
    /// -> answer logits [batch, answer_size]
    pub fn forward(
        &self,
        frcn_feat:  Tensor<B, 3>,
        _grid_feat: Tensor<B, 3>,
        _bbox_feat: Tensor<B, 3>,
        ques_ix:    Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let lang_feat_mask = make_token_mask(ques_ix.clone());
        let lang_feat = self.embedding.forward(ques_ix);
        let lang_feat = self.rnn.forward(lang_feat, None);

        let lang_feat = self.backbone.forward(lang_feat, frcn_feat);
        let fuse_feat = self.attflat_lang.forward(lang_feat, lang_feat_mask);

        self.classifier.forward(fuse_feat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    fn small_config() -> NetConfig {
        NetConfig::new()
            .with_word_embed_size(6)
            .with_hidden_size(8)
            .with_img_feat_size(10)
            .with_ba_glimpses(2)
            .with_k_times(2)
            .with_flat_mlp_size(12)
            .with_flat_glimpses(2)
            .with_flat_out_size(16)
    }

    fn question(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        // Length 14, trailing zero padding
        Tensor::<TestBackend, 1, Int>::from_ints(
            [4, 9, 2, 7, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            device,
        )
        .reshape([1, 14])
    }

    #[test]
    fn test_forward_shape_and_determinism() {
        let device = Default::default();
        let net    = small_config().init::<TestBackend>(20, 5, None, &device).unwrap();

        let frcn = Tensor::<TestBackend, 3>::zeros([1, 4, 10], &device);
        let grid = Tensor::<TestBackend, 3>::zeros([1, 1, 1], &device);
        let bbox = Tensor::<TestBackend, 3>::zeros([1, 4, 5], &device);

        let a = net.forward(frcn.clone(), grid.clone(), bbox.clone(), question(&device));
        assert_eq!(a.dims(), [1, 5]);
        let b = net.forward(frcn, grid, bbox, question(&device));

        let a: Vec<f32> = a.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.into_data().to_vec().unwrap();
        assert!(a.iter().all(|x| x.is_finite()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_parameters_same_output() {
        let device = Default::default();
        let frcn   = Tensor::<TestBackend, 3>::random([2, 3, 10], Distribution::Normal(0.0, 1.0), &device);
        let ques   = Tensor::cat(vec![question(&device), question(&device)], 0);

        // Two independently initialised nets, then copy a's weights into b
        let net_a = small_config().init::<TestBackend>(20, 5, None, &device).unwrap();
        let net_b = small_config()
            .init::<TestBackend>(20, 5, None, &device)
            .unwrap()
            .load_record(net_a.clone().into_record());

        let run = |net: &Net<TestBackend>| {
            net.forward(
                frcn.clone(),
                Tensor::zeros([2, 1, 1], &device),
                Tensor::zeros([2, 3, 5], &device),
                ques.clone(),
            )
            .into_data()
            .to_vec::<f32>()
            .unwrap()
        };
        assert_eq!(run(&net_a), run(&net_b));
    }

    #[test]
    fn test_backward_through_full_net() {
        type TestAutodiff = burn::backend::Autodiff<TestBackend>;

        let device = Default::default();
        let net    = small_config().init::<TestAutodiff>(20, 5, None, &device).unwrap();

        let frcn = Tensor::<TestAutodiff, 3>::random([2, 3, 10], Distribution::Normal(0.0, 1.0), &device);
        let ques = Tensor::<TestAutodiff, 1, Int>::from_ints([4, 9, 2, 0, 7, 1, 0, 0], &device)
            .reshape([2, 4]);
        let logits = net.forward(
            frcn,
            Tensor::zeros([2, 1, 1], &device),
            Tensor::zeros([2, 3, 5], &device),
            ques,
        );

        let grads = logits.sum().backward();
        let grad  = net.embedding.weight.grad(&grads).expect("embedding gradient");
        assert_eq!(grad.dims(), [20, 6]);
        assert!(net.classifier.output.magnitude.grad(&grads).is_some());
    }

    #[test]
    fn test_grid_and_spatial_features_are_ignored() {
        let device = Default::default();
        let net    = small_config().init::<TestBackend>(20, 3, None, &device).unwrap();
        let frcn   = Tensor::<TestBackend, 3>::ones([1, 2, 10], &device);

        let a = net.forward(
            frcn.clone(),
            Tensor::zeros([1, 2, 4], &device),
            Tensor::zeros([1, 2, 5], &device),
            question(&device),
        );
        let b = net.forward(
            frcn,
            Tensor::ones([1, 2, 4], &device),
            Tensor::ones([1, 2, 5], &device),
            question(&device),
        );
        assert_eq!(
            a.into_data().to_vec::<f32>().unwrap(),
            b.into_data().to_vec::<f32>().unwrap(),
        );
    }

    #[test]
    fn test_pretrained_embedding_is_copied() {
        let device     = Default::default();
        let pretrained = Tensor::<TestBackend, 2>::ones([20, 6], &device) * 0.5;
        let net = small_config()
            .with_use_glove(true)
            .init::<TestBackend>(20, 5, Some(pretrained), &device)
            .unwrap();
        let weight: Vec<f32> = net.embedding.weight.val().into_data().to_vec().unwrap();
        assert!(weight.iter().all(|w| *w == 0.5));
    }

    #[test]
    fn test_glove_requires_matching_matrix() {
        let device = Default::default();
        let cfg    = small_config().with_use_glove(true);
        assert!(cfg.init::<TestBackend>(20, 5, None, &device).is_err());

        let wrong = Tensor::<TestBackend, 2>::zeros([19, 6], &device);
        assert!(cfg.init::<TestBackend>(20, 5, Some(wrong), &device).is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let cfg  = small_config();
        cfg.save(&path).unwrap();

        let loaded = NetConfig::load(&path).unwrap();
        assert_eq!(loaded.hidden_size, 8);
        assert_eq!(loaded.flat_glimpses, 2);
        assert_eq!(loaded.backbone().ba_hidden_size(), 16);
    }
}
