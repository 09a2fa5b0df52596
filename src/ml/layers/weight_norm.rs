// ============================================================
// Layer 5 - Weight-Normalised Linear
// ============================================================
// W = g * V / ||V||_F with a single scalar magnitude g for the
// whole matrix (the `dim=None` flavour of weight normalisation).
//
// Shapes follow burn's Linear: weight is [d_input, d_output] and
// the layer accepts any input rank, projecting the last dimension.

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
};

#[derive(Config, Debug)]
pub struct WeightNormLinearConfig {
    pub d_input:  usize,
    pub d_output: usize,
    #[config(default = true)]
    pub bias: bool,
}

impl WeightNormLinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> WeightNormLinear<B> {
        // Same default initialisation as burn's Linear.
        let initializer = Initializer::KaimingUniform {
            gain:          1.0 / 3.0f64.sqrt(),
            fan_out_only:  false,
        };
        let direction: Tensor<B, 2> = initializer
            .init_with(
                [self.d_input, self.d_output],
                Some(self.d_input),
                Some(self.d_output),
                device,
            )
            .val()
            .detach();

        // g starts at ||V|| so the layer initially behaves as V itself.
        // Both must be leaves before they become tracked params.
        let magnitude = frobenius_norm(direction.clone());

        let bias = self.bias.then(|| {
            initializer.init_with(
                [self.d_output],
                Some(self.d_input),
                Some(self.d_output),
                device,
            )
        });

        WeightNormLinear {
            direction: Param::from_tensor(direction),
            magnitude: Param::from_tensor(magnitude),
            bias,
        }
    }
}

#[derive(Module, Debug)]
pub struct WeightNormLinear<B: Backend> {
    pub direction: Param<Tensor<B, 2>>,
    pub magnitude: Param<Tensor<B, 1>>,
    pub bias:      Option<Param<Tensor<B, 1>>>,
}

impl<B: Backend> WeightNormLinear<B> {
    /// Effective weight matrix `g * V / ||V||`, shape [d_input, d_output].
    pub fn weight(&self) -> Tensor<B, 2> {
        let direction      = self.direction.val();
        let [d_in, d_out]  = direction.dims();
        let scale = (self.magnitude.val() / frobenius_norm(direction.clone()))
            .reshape([1, 1])
            .expand([d_in, d_out]);
        direction * scale
    }

    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let dims  = input.dims();
        let d_in  = dims[D - 1];
        let rows: usize = dims[..D - 1].iter().product();

        let weight    = self.weight();
        let d_out     = weight.dims()[1];
        let mut out   = input.reshape([rows, d_in]).matmul(weight);
        if let Some(bias) = &self.bias {
            out = out + bias.val().unsqueeze::<2>().expand([rows, d_out]);
        }

        let mut out_dims = dims;
        out_dims[D - 1]  = d_out;
        out.reshape(out_dims)
    }
}

/// Frobenius norm of a tensor of any rank, as a single-element tensor.
pub fn frobenius_norm<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Tensor<B, 1> {
    (tensor.clone() * tensor).sum().sqrt()
}
