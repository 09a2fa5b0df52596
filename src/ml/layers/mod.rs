/// Linear / MLP blocks and the weight-normalised FcNet stack
pub mod fc;

/// Linear layer with scalar weight normalisation
pub mod weight_norm;
