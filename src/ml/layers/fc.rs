// ============================================================
// Layer 5 - Fully Connected Building Blocks
// ============================================================
//   Fc     - Linear -> ReLU (optional) -> Dropout
//   Mlp    - Fc -> Linear, used to score AttFlat glimpses
//   FcNet  - [Dropout -> WeightNormLinear -> ReLU (optional)] per
//            pair of consecutive dims, used inside the BAN backbone

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use super::weight_norm::{WeightNormLinear, WeightNormLinearConfig};

// ─── Fc ───────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct FcConfig {
    pub in_size:  usize,
    pub out_size: usize,
    #[config(default = 0.0)]
    pub dropout_r: f64,
    #[config(default = true)]
    pub use_relu: bool,
}

impl FcConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Fc<B> {
        Fc {
            linear:   LinearConfig::new(self.in_size, self.out_size).init(device),
            dropout:  DropoutConfig::new(self.dropout_r).init(),
            use_relu: self.use_relu,
        }
    }
}

#[derive(Module, Debug)]
pub struct Fc<B: Backend> {
    linear:   Linear<B>,
    dropout:  Dropout,
    use_relu: bool,
}

impl<B: Backend> Fc<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let x = self.linear.forward(x);
        let x = if self.use_relu { relu(x) } else { x };
        self.dropout.forward(x)
    }
}

// ─── Mlp ──────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct MlpConfig {
    pub in_size:  usize,
    pub mid_size: usize,
    pub out_size: usize,
    #[config(default = 0.0)]
    pub dropout_r: f64,
    #[config(default = true)]
    pub use_relu: bool,
}

impl MlpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let fc = FcConfig::new(self.in_size, self.mid_size)
            .with_dropout_r(self.dropout_r)
            .with_use_relu(self.use_relu)
            .init(device);
        let linear = LinearConfig::new(self.mid_size, self.out_size).init(device);
        Mlp { fc, linear }
    }
}

#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    fc:     Fc<B>,
    linear: Linear<B>,
}

impl<B: Backend> Mlp<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.linear.forward(self.fc.forward(x))
    }
}

// ─── FcNet ────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct FcNetConfig {
    /// Layer widths, e.g. [in, out] for a single layer.
    pub dims: Vec<usize>,
    #[config(default = true)]
    pub activate: bool,
    #[config(default = 0.0)]
    pub dropout_r: f64,
}

impl FcNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FcNet<B> {
        let layers = self
            .dims
            .windows(2)
            .map(|pair| WeightNormLinearConfig::new(pair[0], pair[1]).init(device))
            .collect();
        FcNet {
            layers,
            dropout:  DropoutConfig::new(self.dropout_r).init(),
            activate: self.activate,
        }
    }
}

#[derive(Module, Debug)]
pub struct FcNet<B: Backend> {
    layers:   Vec<WeightNormLinear<B>>,
    dropout:  Dropout,
    activate: bool,
}

impl<B: Backend> FcNet<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.layers.iter().fold(x, |x, layer| {
            let x = layer.forward(self.dropout.forward(x));
            if self.activate { relu(x) } else { x }
        })
    }
}
